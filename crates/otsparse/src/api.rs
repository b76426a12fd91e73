//! Curated internal API (UNSTABLE).
//!
//! Important
//! - This is not a public API. It is a convenience surface for the CLI,
//!   benches and experiments. Breaking changes are allowed.

// Inputs
pub use crate::cloud::{
    bounding_diameter, gaussian_cloud, uniform_weights, CloudCfg, CloudPair, PointCloud,
};
pub use crate::cost::{cost_fn, cost_matrix, sq_dist};
// Dense step
pub use crate::plan::{LazyPlan, PlanView};
pub use crate::sinkhorn::{
    epsilon_schedule, solve as sinkhorn, SinkhornCfg, SinkhornSolution,
};
// Sparse step
pub use crate::simplex::{solve_dense as emd_dense, solve_sparse as emd_sparse};
pub use crate::simplex::{ExactSolution, SimplexCfg, SolveStatus};
pub use crate::sparsify::{sparsify, top_k_positive, Coverage, SparseSupport};
// End to end
pub use crate::cfg::ExperimentCfg;
pub use crate::error::TransportError;
pub use crate::pipeline::{run, run_on, sweep, Comparison, DenseSummary, ExactSummary, Timings};
