//! Exact transport (EMD) on a sparse support via network simplex.
//!
//! Purpose
//! - Solve `min Σ πᵢⱼ cᵢⱼ` subject to `π1 = a`, `πᵀ1 = b`, `π ≥ 0`, where
//!   `πᵢⱼ` may be positive only on the stored entries of a sparse cost matrix.
//! - Report infeasibility of the restricted support as a status, not an
//!   error: a support that misses a loaded row or column is an expected
//!   outcome of aggressive sparsification.
//!
//! Model
//! - Bipartite, uncapacitated min-cost flow with an artificial root; see
//!   `network` for the tree representation and pivot rule.
//! - The target marginal is rescaled to the source mass after the balance
//!   check, so tiny round-off in `Σb` does not leak into feasibility.
//! - Duplicate entries of the COO input are summed (CSR conversion).
//!
//! Code cross-refs: `Network`, `ExactSolution`, `SolveStatus`.

mod network;

use std::fmt;

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use serde::{Deserialize, Serialize};

use crate::cfg::{ARTIFICIAL_FLOW_TOL, MASS_BALANCE_TOL};
use crate::error::{check_weights, TransportError};
use network::{Network, PivotOutcome};

/// Iteration cap for the pivot loop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplexCfg {
    pub max_iter: usize,
}

impl Default for SimplexCfg {
    fn default() -> Self {
        Self { max_iter: 500_000 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    /// The support cannot carry both marginals.
    Infeasible,
    Unbounded,
    /// Stopped at `max_iter` pivots; flows are feasible for the augmented
    /// network but not necessarily optimal.
    MaxIterReached,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Optimal => "Optimal",
            Self::Infeasible => "Infeasible",
            Self::Unbounded => "Unbounded",
            Self::MaxIterReached => "MaxIterReached",
        };
        f.write_str(s)
    }
}

/// Flows on the support plus dual potentials.
#[derive(Clone, Debug)]
pub struct ExactSolution {
    pub status: SolveStatus,
    /// `Σ flow·cost` over the support.
    pub cost: f64,
    /// Support entries (row, col), after summing duplicates; `flows` is aligned.
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
    pub flows: Vec<f64>,
    /// Duals with `αᵢ + βⱼ ≤ cᵢⱼ` on the support (tight where flow > 0) when optimal.
    pub alpha: Vec<f64>,
    pub beta: Vec<f64>,
    /// Pivots performed.
    pub iterations: usize,
    pub shape: (usize, usize),
}

impl ExactSolution {
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Positive flows as a sparse plan.
    pub fn plan(&self) -> CooMatrix<f64> {
        let mut coo = CooMatrix::new(self.shape.0, self.shape.1);
        for ((&i, &j), &f) in self.rows.iter().zip(&self.cols).zip(&self.flows) {
            if f > 0.0 {
                coo.push(i, j, f);
            }
        }
        coo
    }
}

/// Exact transport restricted to the stored entries of `cost`.
pub fn solve_sparse(
    a: &[f64],
    b: &[f64],
    cost: &CooMatrix<f64>,
    cfg: &SimplexCfg,
) -> Result<ExactSolution, TransportError> {
    check_shape(a, b, cost.nrows(), cost.ncols())?;
    let csr = CsrMatrix::from(cost);
    let arcs: Vec<(usize, usize, f64)> = csr.triplet_iter().map(|(i, j, c)| (i, j, *c)).collect();
    solve_arcs(a, b, (cost.nrows(), cost.ncols()), arcs, cfg)
}

/// Exact transport on the full support of a dense cost matrix.
pub fn solve_dense(
    a: &[f64],
    b: &[f64],
    cost: &DMatrix<f64>,
    cfg: &SimplexCfg,
) -> Result<ExactSolution, TransportError> {
    let (nrows, ncols) = cost.shape();
    check_shape(a, b, nrows, ncols)?;
    let arcs = (0..nrows)
        .flat_map(|i| (0..ncols).map(move |j| (i, j)))
        .map(|(i, j)| (i, j, cost[(i, j)]))
        .collect();
    solve_arcs(a, b, (nrows, ncols), arcs, cfg)
}

fn check_shape(a: &[f64], b: &[f64], nrows: usize, ncols: usize) -> Result<(), TransportError> {
    if a.len() != nrows {
        return Err(TransportError::shape("source weights", nrows, a.len()));
    }
    if b.len() != ncols {
        return Err(TransportError::shape("target weights", ncols, b.len()));
    }
    Ok(())
}

fn solve_arcs(
    a: &[f64],
    b: &[f64],
    shape: (usize, usize),
    arcs: Vec<(usize, usize, f64)>,
    cfg: &SimplexCfg,
) -> Result<ExactSolution, TransportError> {
    let source_mass = check_weights(a, "source weights")?;
    let target_mass = check_weights(b, "target weights")?;
    if (source_mass - target_mass).abs() > MASS_BALANCE_TOL * source_mass.max(target_mass) {
        return Err(TransportError::MassImbalance {
            source_mass,
            target_mass,
        });
    }
    if arcs.iter().any(|(_, _, c)| !c.is_finite()) {
        return Err(TransportError::NonFinite { what: "cost matrix" });
    }
    if let Some(&(row, col, value)) = arcs.iter().find(|(_, _, c)| *c < 0.0) {
        return Err(TransportError::NegativeCost { row, col, value });
    }
    let ratio = source_mass / target_mass;
    let b_scaled: Vec<f64> = b.iter().map(|w| w * ratio).collect();

    let mut net = Network::new(a, &b_scaled, &arcs);
    let outcome = net.run(cfg.max_iter);
    let status = match outcome {
        PivotOutcome::IterationCap => SolveStatus::MaxIterReached,
        PivotOutcome::Unbounded => SolveStatus::Unbounded,
        PivotOutcome::Optimal if net.artificial_flow() > ARTIFICIAL_FLOW_TOL * source_mass => {
            SolveStatus::Infeasible
        }
        PivotOutcome::Optimal => SolveStatus::Optimal,
    };
    let (alpha, beta) = net.duals();
    let cost = net.cost();
    tracing::debug!(
        arcs = arcs.len(),
        pivots = net.pivots,
        %status,
        cost,
        "network simplex finished"
    );

    let flows = net.real_flows().to_vec();
    let (rows, cols) = arcs.iter().map(|&(i, j, _)| (i, j)).unzip();
    Ok(ExactSolution {
        status,
        cost,
        rows,
        cols,
        flows,
        alpha,
        beta,
        iterations: net.pivots,
        shape,
    })
}

#[cfg(test)]
mod tests;
