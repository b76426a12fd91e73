//! Read access to a transport plan, dense or lazily evaluated.
//!
//! The sparsifier only needs whole rows and whole columns, so it is written
//! against `PlanView`. `DMatrix<f64>` is the materialized form; `LazyPlan`
//! recomputes `πᵢⱼ = aᵢ bⱼ exp((fᵢ + gⱼ − Cᵢⱼ)/ε)` from Sinkhorn potentials.

use nalgebra::DMatrix;

use crate::cloud::PointCloud;
use crate::cost::sq_dist;

/// Row/column access to an `nrows × ncols` non-negative plan.
pub trait PlanView {
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;
    fn entry(&self, i: usize, j: usize) -> f64;

    /// Write row `i` into `out` (length `ncols`).
    fn row_into(&self, i: usize, out: &mut [f64]) {
        for (j, o) in out.iter_mut().enumerate() {
            *o = self.entry(i, j);
        }
    }

    /// Write column `j` into `out` (length `nrows`).
    fn col_into(&self, j: usize, out: &mut [f64]) {
        for (i, o) in out.iter_mut().enumerate() {
            *o = self.entry(i, j);
        }
    }

    fn row_sums(&self) -> Vec<f64> {
        let mut buf = vec![0.0; self.ncols()];
        (0..self.nrows())
            .map(|i| {
                self.row_into(i, &mut buf);
                buf.iter().sum()
            })
            .collect()
    }

    fn col_sums(&self) -> Vec<f64> {
        let mut buf = vec![0.0; self.nrows()];
        (0..self.ncols())
            .map(|j| {
                self.col_into(j, &mut buf);
                buf.iter().sum()
            })
            .collect()
    }

    /// `‖π1 − a‖₁ + ‖πᵀ1 − b‖₁`.
    fn marginal_error(&self, a: &[f64], b: &[f64]) -> f64 {
        let rows: f64 = self
            .row_sums()
            .iter()
            .zip(a)
            .map(|(s, w)| (s - w).abs())
            .sum();
        let cols: f64 = self
            .col_sums()
            .iter()
            .zip(b)
            .map(|(s, w)| (s - w).abs())
            .sum();
        rows + cols
    }

    /// Primal transport cost `⟨π, C⟩` for a cost lookup `C`.
    fn transport_cost<C: Fn(usize, usize) -> f64>(&self, cost: C) -> f64
    where
        Self: Sized,
    {
        let mut buf = vec![0.0; self.ncols()];
        let mut total = 0.0;
        for i in 0..self.nrows() {
            self.row_into(i, &mut buf);
            for (j, &p) in buf.iter().enumerate() {
                if p > 0.0 {
                    total += p * cost(i, j);
                }
            }
        }
        total
    }
}

impl PlanView for DMatrix<f64> {
    #[inline]
    fn nrows(&self) -> usize {
        self.shape().0
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.shape().1
    }

    #[inline]
    fn entry(&self, i: usize, j: usize) -> f64 {
        self[(i, j)]
    }

    fn col_into(&self, j: usize, out: &mut [f64]) {
        // Column-major storage: a column is contiguous.
        for (o, v) in out.iter_mut().zip(self.column(j).iter()) {
            *o = *v;
        }
    }
}

/// Plan evaluated on demand from Sinkhorn potentials; O(n + m) memory.
#[derive(Clone, Copy, Debug)]
pub struct LazyPlan<'a> {
    pub(crate) source: &'a PointCloud,
    pub(crate) target: &'a PointCloud,
    pub(crate) a: &'a [f64],
    pub(crate) b: &'a [f64],
    pub(crate) f: &'a [f64],
    pub(crate) g: &'a [f64],
    pub(crate) eps: f64,
}

impl LazyPlan<'_> {
    /// Evaluate every entry into a dense matrix (n·m doubles).
    pub fn materialize(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.nrows(), self.ncols(), |i, j| self.entry(i, j))
    }
}

impl PlanView for LazyPlan<'_> {
    #[inline]
    fn nrows(&self) -> usize {
        self.source.len()
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.target.len()
    }

    #[inline]
    fn entry(&self, i: usize, j: usize) -> f64 {
        let (ai, bj) = (self.a[i], self.b[j]);
        if ai == 0.0 || bj == 0.0 {
            return 0.0;
        }
        let c = sq_dist(&self.source.points()[i], &self.target.points()[j]);
        ai * bj * ((self.f[i] + self.g[j] - c) / self.eps).exp()
    }

    fn row_into(&self, i: usize, out: &mut [f64]) {
        let (x, ai, fi) = (self.source.points()[i], self.a[i], self.f[i]);
        for (j, (o, y)) in out.iter_mut().zip(self.target.points()).enumerate() {
            let bj = self.b[j];
            *o = if ai == 0.0 || bj == 0.0 {
                0.0
            } else {
                ai * bj * ((fi + self.g[j] - sq_dist(&x, y)) / self.eps).exp()
            };
        }
    }
}
