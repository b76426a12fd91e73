use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use otsparse::api::{run_on, sweep, CloudPair, Comparison, ExperimentCfg};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::SubscriberBuilder;

mod provenance;
mod reporter;
mod table;

#[derive(Parser)]
#[command(name = "cli")]
#[command(about = "Dense Sinkhorn vs. sparse exact transport on point clouds")]
struct Cmd {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Run one comparison and print the cost report
    Run {
        #[command(flatten)]
        exp: ExpArgs,
        /// Write the comparison as JSON (plus a provenance sidecar)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Reuse one dense solve for several k and write a table (.csv or .parquet)
    Sweep {
        #[command(flatten)]
        exp: ExpArgs,
        #[arg(long, value_delimiter = ',', default_values_t = [5, 10, 20])]
        ks: Vec<usize>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Print a small provenance JSON block for the default configuration
    Report,
}

/// Experiment knobs; each flag overrides the config file or the defaults.
#[derive(Args, Debug, Default)]
struct ExpArgs {
    /// JSON file with an `ExperimentCfg`
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    n: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    /// Target shift, applied to both coordinates
    #[arg(long)]
    offset: Option<f64>,
    #[arg(long)]
    reg: Option<f64>,
    #[arg(long)]
    scaling: Option<f64>,
    #[arg(long)]
    polish_iters: Option<usize>,
    #[arg(long)]
    k: Option<usize>,
    #[arg(long)]
    max_iter: Option<usize>,
    /// Read the plan from the potentials instead of materializing n² entries
    #[arg(long)]
    lazy_plan: bool,
}

impl ExpArgs {
    fn resolve(&self) -> Result<ExperimentCfg> {
        let mut cfg = match &self.config {
            Some(path) => {
                let bytes =
                    std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_slice(&bytes)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => ExperimentCfg::default(),
        };
        if let Some(n) = self.n {
            cfg.cloud.n = n;
        }
        if let Some(seed) = self.seed {
            cfg.cloud.seed = seed;
        }
        if let Some(offset) = self.offset {
            cfg.cloud.offset = [offset, offset];
        }
        if let Some(reg) = self.reg {
            cfg.sinkhorn.reg = reg;
        }
        if let Some(scaling) = self.scaling {
            cfg.sinkhorn.scaling = scaling;
        }
        if let Some(polish) = self.polish_iters {
            cfg.sinkhorn.polish_iters = polish;
        }
        if let Some(k) = self.k {
            cfg.k = k;
        }
        if let Some(max_iter) = self.max_iter {
            cfg.simplex.max_iter = max_iter;
        }
        if self.lazy_plan {
            cfg.materialize_plan = false;
        }
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    SubscriberBuilder::default()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::Run { exp, out } => run(exp.resolve()?, out.as_deref()),
        Action::Sweep { exp, ks, out } => run_sweep(exp.resolve()?, &ks, &out),
        Action::Report => report(),
    }
}

fn run(cfg: ExperimentCfg, out: Option<&Path>) -> Result<()> {
    tracing::info!(n = cfg.cloud.n, k = cfg.k, reg = cfg.sinkhorn.reg, "run");
    let stdout = std::io::stdout();
    let mut console = stdout.lock();
    reporter::write_header(&mut console)?;
    console.flush()?;

    let pair = CloudPair::generate(&cfg.cloud);
    let cmp = run_on(&pair, &cfg).context("comparison failed")?;
    reporter::write_report(&mut console, &cmp)?;
    console.flush()?;

    if let Some(path) = out {
        write_json(path, &cfg, &cmp)?;
    }
    if reporter::is_fatal(cmp.exact.status) {
        bail!("sparse EMD ended {} on k = {}", cmp.exact.status, cmp.k);
    }
    Ok(())
}

fn write_json(path: &Path, cfg: &ExperimentCfg, cmp: &Comparison) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    std::fs::write(path, serde_json::to_vec_pretty(cmp)?)
        .with_context(|| format!("writing {}", path.display()))?;
    let payload = provenance::Payload::new("run", serde_json::to_value(cfg)?);
    let prov = provenance::write_sidecar(path, payload)?;
    tracing::info!(out = %path.display(), provenance = %prov.display(), "wrote comparison");
    Ok(())
}

fn run_sweep(cfg: ExperimentCfg, ks: &[usize], out: &Path) -> Result<()> {
    tracing::info!(n = cfg.cloud.n, ks = ?ks, "sweep");
    let pair = CloudPair::generate(&cfg.cloud);
    let rows = sweep(&pair, &cfg, ks).context("sweep failed")?;
    for r in rows.iter().filter(|r| r.is_flagged()) {
        tracing::warn!(k = r.k, status = %r.exact.status, "flagged sweep row");
    }
    let mut df = table::sweep_frame(&rows)?;
    table::write_table(out, &mut df)?;
    let params = serde_json::to_value(SweepParams { cfg: &cfg, ks })?;
    provenance::write_sidecar(out, provenance::Payload::new("sweep", params))?;
    tracing::info!(rows = df.height(), out = %out.display(), "wrote sweep");
    Ok(())
}

#[derive(Serialize)]
struct SweepParams<'a> {
    cfg: &'a ExperimentCfg,
    ks: &'a [usize],
}

fn report() -> Result<()> {
    let payload = provenance::Payload::new(
        "report",
        serde_json::to_value(ExperimentCfg::default())?,
    );
    let obj = provenance::document(&payload, &[]);
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}
