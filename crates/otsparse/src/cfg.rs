//! Tolerance defaults and the experiment configuration.
//!
//! Policy
//! - Tolerances are fixed constants; the experiment knobs (sizes, seeds,
//!   regularization, k, iteration caps) live in `ExperimentCfg` whose
//!   `Default` is the reference benchmark run.

use serde::{Deserialize, Serialize};

use crate::cloud::CloudCfg;
use crate::simplex::SimplexCfg;
use crate::sinkhorn::SinkhornCfg;

/// Relative tolerance for `|Σa − Σb|` before the exact solver rejects the marginals.
pub(crate) const MASS_BALANCE_TOL: f64 = 1e-7;
/// Flow left on an artificial arc above this (relative to total mass) means infeasible.
pub(crate) const ARTIFICIAL_FLOW_TOL: f64 = 1e-9;
/// Reduced-cost slack, in units of machine epsilon times the artificial arc cost.
pub(crate) const REDUCED_COST_ULPS: f64 = 256.0;
/// Smallest pivot block for the network simplex entering-arc search.
pub(crate) const MIN_BLOCK_SIZE: usize = 10;

/// Full configuration of one dense-vs-sparse comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentCfg {
    pub cloud: CloudCfg,
    pub sinkhorn: SinkhornCfg,
    /// Entries kept per row and per column of the dense plan.
    pub k: usize,
    pub simplex: SimplexCfg,
    /// Materialize the dense plan before sparsifying (n² memory) or read it lazily.
    pub materialize_plan: bool,
}

impl Default for ExperimentCfg {
    fn default() -> Self {
        Self {
            cloud: CloudCfg::default(),
            sinkhorn: SinkhornCfg::default(),
            k: 20,
            simplex: SimplexCfg::default(),
            materialize_plan: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let cfg = ExperimentCfg::default();
        assert_eq!(cfg.cloud.n, 10_000);
        assert_eq!(cfg.cloud.seed, 42);
        assert_eq!(cfg.cloud.offset, [2.0, 2.0]);
        assert_eq!(cfg.sinkhorn.reg, 0.1);
        assert_eq!(cfg.sinkhorn.scaling, 0.9);
        assert_eq!(cfg.k, 20);
        assert_eq!(cfg.simplex.max_iter, 500_000);
        assert!(cfg.materialize_plan);
    }
}
