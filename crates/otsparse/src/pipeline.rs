//! Dense-vs-sparse comparison: Sinkhorn plan → top-k support → exact EMD.
//!
//! Steps
//! 1. `sinkhorn::solve` on the full clouds (regularized cost, potentials).
//! 2. `sparsify` the plan (materialized or lazy) with true ground costs.
//! 3. `simplex::solve_sparse` on the kept support.
//!
//! A support that misses a loaded row or column is logged and carried
//! through as `SolveStatus::Infeasible`; `Comparison::is_flagged` reports it.

use std::time::Instant;

use serde::Serialize;

use crate::cfg::ExperimentCfg;
use crate::cloud::CloudPair;
use crate::cost::cost_fn;
use crate::error::TransportError;
use crate::plan::PlanView;
use crate::simplex::{self, ExactSolution, SimplexCfg, SolveStatus};
use crate::sinkhorn::{self, SinkhornSolution};
use crate::sparsify::{sparsify, Coverage, SparseSupport};

/// Dense solve diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DenseSummary {
    pub cost: f64,
    pub steps: usize,
    pub polish_steps: usize,
    pub marginal_error: f64,
}

impl From<&SinkhornSolution> for DenseSummary {
    fn from(sol: &SinkhornSolution) -> Self {
        Self {
            cost: sol.cost,
            steps: sol.steps,
            polish_steps: sol.polish_steps,
            marginal_error: sol.marginal_error,
        }
    }
}

/// Exact solve diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExactSummary {
    pub status: SolveStatus,
    pub cost: f64,
    pub iterations: usize,
}

impl From<&ExactSolution> for ExactSummary {
    fn from(sol: &ExactSolution) -> Self {
        Self {
            status: sol.status,
            cost: sol.cost,
            iterations: sol.iterations,
        }
    }
}

/// Wall-clock per step, milliseconds.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Timings {
    pub sinkhorn_ms: f64,
    /// Materializing the dense plan; shared by every `k` of a sweep, 0 when lazy.
    pub plan_ms: f64,
    pub sparsify_ms: f64,
    pub simplex_ms: f64,
}

/// Outcome of one comparison at a fixed `k`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Comparison {
    pub k: usize,
    pub dense: DenseSummary,
    pub sparse_edges: usize,
    pub candidates: usize,
    pub coverage: Coverage,
    /// Some uncovered row/column carries mass.
    pub support_infeasible: bool,
    pub exact: ExactSummary,
    pub timings: Timings,
}

impl Comparison {
    /// `|dense − sparse|`.
    pub fn abs_diff(&self) -> f64 {
        (self.dense.cost - self.exact.cost).abs()
    }

    /// `100 · |dense − sparse| / dense`, `None` when the dense cost is 0.
    pub fn rel_diff_pct(&self) -> Option<f64> {
        (self.dense.cost != 0.0).then(|| self.abs_diff() / self.dense.cost * 100.0)
    }

    /// The sparse cost is not a trustworthy exact cost on this support.
    pub fn is_flagged(&self) -> bool {
        self.support_infeasible || self.exact.status != SolveStatus::Optimal
    }
}

/// Generate the clouds from `cfg.cloud` and compare at `cfg.k`.
pub fn run(cfg: &ExperimentCfg) -> Result<Comparison, TransportError> {
    let pair = CloudPair::generate(&cfg.cloud);
    run_on(&pair, cfg)
}

/// Compare on given clouds at `cfg.k`.
pub fn run_on(pair: &CloudPair, cfg: &ExperimentCfg) -> Result<Comparison, TransportError> {
    sweep(pair, cfg, std::slice::from_ref(&cfg.k))?
        .pop()
        .ok_or(TransportError::EmptyInput { what: "k values" })
}

/// One dense solve and at most one plan materialization, then one sparse
/// comparison per `k`.
pub fn sweep(
    pair: &CloudPair,
    cfg: &ExperimentCfg,
    ks: &[usize],
) -> Result<Vec<Comparison>, TransportError> {
    let (dense, sinkhorn_ms) = dense_step(pair, cfg)?;
    let summary = DenseSummary::from(&dense);
    let lazy = dense.plan(&pair.source, &pair.target, &pair.a, &pair.b);
    if cfg.materialize_plan {
        let t0 = Instant::now();
        let plan = lazy.materialize();
        let base = Timings {
            sinkhorn_ms,
            plan_ms: elapsed_ms(t0),
            ..Timings::default()
        };
        compare_ks(pair, &summary, &plan, ks, &cfg.simplex, &base)
    } else {
        let base = Timings {
            sinkhorn_ms,
            ..Timings::default()
        };
        compare_ks(pair, &summary, &lazy, ks, &cfg.simplex, &base)
    }
}

fn dense_step(
    pair: &CloudPair,
    cfg: &ExperimentCfg,
) -> Result<(SinkhornSolution, f64), TransportError> {
    tracing::info!(
        n = pair.source.len(),
        m = pair.target.len(),
        reg = cfg.sinkhorn.reg,
        "sinkhorn"
    );
    let t0 = Instant::now();
    let dense = sinkhorn::solve(&pair.source, &pair.target, &pair.a, &pair.b, &cfg.sinkhorn)?;
    Ok((dense, elapsed_ms(t0)))
}

fn compare_ks<P: PlanView>(
    pair: &CloudPair,
    dense: &DenseSummary,
    plan: &P,
    ks: &[usize],
    simplex_cfg: &SimplexCfg,
    base: &Timings,
) -> Result<Vec<Comparison>, TransportError> {
    ks.iter()
        .map(|&k| compare_plan(pair, dense.clone(), plan, k, simplex_cfg, base))
        .collect()
}

fn compare_plan<P: PlanView>(
    pair: &CloudPair,
    dense: DenseSummary,
    plan: &P,
    k: usize,
    simplex_cfg: &SimplexCfg,
    base: &Timings,
) -> Result<Comparison, TransportError> {
    let t0 = Instant::now();
    let support = sparsify(plan, k, cost_fn(&pair.source, &pair.target));
    let sparsify_ms = elapsed_ms(t0);
    let support_infeasible = support.coverage.rules_out(&pair.a, &pair.b);
    if support_infeasible {
        tracing::warn!(
            k,
            empty_rows = support.coverage.empty_rows.len(),
            empty_cols = support.coverage.empty_cols.len(),
            "sparse support leaves loaded nodes uncovered; exact solve will be infeasible"
        );
    }

    let t1 = Instant::now();
    let exact = exact_step(pair, &support, simplex_cfg)?;
    let simplex_ms = elapsed_ms(t1);
    if exact.status != SolveStatus::Optimal {
        tracing::warn!(k, status = %exact.status, "sparse EMD did not reach optimality");
    }

    let SparseSupport {
        candidates,
        coverage,
        ..
    } = support;
    Ok(Comparison {
        k,
        dense,
        sparse_edges: exact.rows.len(),
        candidates,
        coverage,
        support_infeasible,
        exact: ExactSummary::from(&exact),
        timings: Timings {
            sparsify_ms,
            simplex_ms,
            ..base.clone()
        },
    })
}

fn exact_step(
    pair: &CloudPair,
    support: &SparseSupport,
    cfg: &SimplexCfg,
) -> Result<ExactSolution, TransportError> {
    tracing::info!(edges = support.edges(), "sparse emd");
    simplex::solve_sparse(&pair.a, &pair.b, &support.cost, cfg)
}

fn elapsed_ms(t0: Instant) -> f64 {
    t0.elapsed().as_secs_f64() * 1e3
}
