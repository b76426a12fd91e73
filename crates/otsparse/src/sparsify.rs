//! Top-k support extraction from a transport plan.
//!
//! For every row, keep the `k` largest columns; for every column, the `k`
//! largest rows; only strictly positive plan entries survive. The union is
//! deduplicated and each kept pair is re-weighted with the true ground cost:
//! the plan contributes its support, never its magnitude.
//!
//! Selection uses `select_nth_unstable_by`, so among equal values the kept
//! indices depend on the pivot order of the selection algorithm. Callers must
//! not rely on a particular tie-break.

use nalgebra_sparse::CooMatrix;
use serde::Serialize;

use crate::plan::PlanView;

/// Rows and columns that kept no edge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub empty_rows: Vec<usize>,
    pub empty_cols: Vec<usize>,
}

impl Coverage {
    pub fn is_complete(&self) -> bool {
        self.empty_rows.is_empty() && self.empty_cols.is_empty()
    }

    /// True if an uncovered row/column carries mass, which rules out any
    /// feasible plan on the support.
    pub fn rules_out(&self, a: &[f64], b: &[f64]) -> bool {
        self.empty_rows.iter().any(|&i| a.get(i).is_some_and(|w| *w > 0.0))
            || self.empty_cols.iter().any(|&j| b.get(j).is_some_and(|w| *w > 0.0))
    }

    fn from_edges(nrows: usize, ncols: usize, edges: &[(usize, usize)]) -> Self {
        let mut row_hit = vec![false; nrows];
        let mut col_hit = vec![false; ncols];
        for &(i, j) in edges {
            row_hit[i] = true;
            col_hit[j] = true;
        }
        let missing = |hit: Vec<bool>| -> Vec<usize> {
            hit.into_iter()
                .enumerate()
                .filter_map(|(i, h)| (!h).then_some(i))
                .collect()
        };
        Self {
            empty_rows: missing(row_hit),
            empty_cols: missing(col_hit),
        }
    }
}

/// Sparse cost graph kept from a plan.
#[derive(Clone, Debug)]
pub struct SparseSupport {
    /// True costs on the kept pairs, sorted by (row, col), no duplicates.
    pub cost: CooMatrix<f64>,
    /// Pairs collected before deduplication (≤ rows·k + cols·k).
    pub candidates: usize,
    pub coverage: Coverage,
}

impl SparseSupport {
    pub fn edges(&self) -> usize {
        self.cost.nnz()
    }
}

/// Indices of the `k` largest entries of `values` that are strictly positive.
///
/// `out` is overwritten; its order is unspecified.
pub fn top_k_positive(values: &[f64], k: usize, out: &mut Vec<usize>) {
    out.clear();
    if k == 0 {
        return;
    }
    out.extend(0..values.len());
    let len = values.len();
    if k < len {
        out.select_nth_unstable_by(len - k, |&p, &q| values[p].total_cmp(&values[q]));
        out.drain(..len - k);
    }
    out.retain(|&j| values[j] > 0.0);
}

/// Keep the top-`k` positive entries per row and per column of `plan` and
/// attach `cost(i, j)` to each kept pair.
pub fn sparsify<P, C>(plan: &P, k: usize, cost: C) -> SparseSupport
where
    P: PlanView,
    C: Fn(usize, usize) -> f64,
{
    let (nrows, ncols) = (plan.nrows(), plan.ncols());
    let mut edges: Vec<(usize, usize)> =
        Vec::with_capacity(nrows * k.min(ncols) + ncols * k.min(nrows));
    let mut keep = Vec::with_capacity(k.min(nrows.max(ncols)));

    let mut row = vec![0.0; ncols];
    for i in 0..nrows {
        plan.row_into(i, &mut row);
        top_k_positive(&row, k, &mut keep);
        edges.extend(keep.iter().map(|&j| (i, j)));
    }
    let mut col = vec![0.0; nrows];
    for j in 0..ncols {
        plan.col_into(j, &mut col);
        top_k_positive(&col, k, &mut keep);
        edges.extend(keep.iter().map(|&i| (i, j)));
    }

    let candidates = edges.len();
    edges.sort_unstable();
    edges.dedup();

    let coverage = Coverage::from_edges(nrows, ncols, &edges);
    let mut coo = CooMatrix::new(nrows, ncols);
    for &(i, j) in &edges {
        coo.push(i, j, cost(i, j));
    }
    tracing::debug!(
        candidates,
        edges = edges.len(),
        empty_rows = coverage.empty_rows.len(),
        empty_cols = coverage.empty_cols.len(),
        "sparsified plan"
    );
    SparseSupport {
        cost: coo,
        candidates,
        coverage,
    }
}
