//! Dense entropic transport vs. sparse exact transport on 2D point clouds.
//!
//! Pipeline
//! - `cloud`: seeded Gaussian clouds with uniform marginals.
//! - `sinkhorn`: log-domain Sinkhorn with ε-annealing (regularized cost + plan).
//! - `sparsify`: top-k support of the plan per row and per column.
//! - `simplex`: network simplex EMD restricted to that support.
//! - `pipeline`: the three steps end to end, with diagnostics.
//!
//! API Policy
//! - This crate is project-internal. There is no stable public API; `api`
//!   collects the names callers are expected to use.

pub mod api;
pub mod cfg;
pub mod cloud;
pub mod cost;
pub mod error;
pub mod pipeline;
pub mod plan;
pub mod simplex;
pub mod sinkhorn;
pub mod sparsify;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::TransportError;
pub use nalgebra::Vector2 as Vec2;

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::cfg::ExperimentCfg;
    pub use crate::cloud::{CloudCfg, CloudPair, PointCloud};
    pub use crate::error::TransportError;
    pub use crate::pipeline::Comparison;
    pub use crate::plan::PlanView;
    pub use crate::simplex::{SimplexCfg, SolveStatus};
    pub use crate::sinkhorn::SinkhornCfg;
    pub use nalgebra::Vector2 as Vec2;
}
