//! End-to-end timing run on a small instance.
//!
//! Runs the dense step once, then the sparse comparison for a few `k`, and
//! prints one `key=value` line per row so the output can be grepped.

use otsparse::api::sweep;
use otsparse::prelude::*;

fn main() {
    let cfg = ExperimentCfg {
        cloud: CloudCfg {
            n: 500,
            ..CloudCfg::default()
        },
        ..ExperimentCfg::default()
    };
    let pair = CloudPair::generate(&cfg.cloud);
    let rows = sweep(&pair, &cfg, &[2, 5, 10, 20]).expect("sweep on default cfg");

    println!("n={} reg={}", cfg.cloud.n, cfg.sinkhorn.reg);
    for r in &rows {
        let rel = r
            .rel_diff_pct()
            .map_or_else(|| "n/a".to_string(), |p| format!("{p:.3}"));
        println!(
            "k={} edges={} status={} dense={:.6} sparse={:.6} rel_pct={rel} simplex_ms={:.3}",
            r.k, r.sparse_edges, r.exact.status, r.dense.cost, r.exact.cost, r.timings.simplex_ms
        );
    }
    let flagged = rows.iter().filter(|r| r.exact.status != SolveStatus::Optimal).count();
    println!(
        "sinkhorn_ms={:.3} plan_ms={:.3} flagged={flagged}",
        rows[0].timings.sinkhorn_ms, rows[0].timings.plan_ms
    );
}
