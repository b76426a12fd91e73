//! Squared Euclidean ground cost.

use nalgebra::{DMatrix, Vector2};

use crate::cloud::PointCloud;

/// `|x − y|²`.
#[inline]
pub fn sq_dist(x: &Vector2<f64>, y: &Vector2<f64>) -> f64 {
    (x - y).norm_squared()
}

/// Dense `n × m` cost matrix. Only sensible for small clouds (n·m doubles).
pub fn cost_matrix(source: &PointCloud, target: &PointCloud) -> DMatrix<f64> {
    let (xs, ys) = (source.points(), target.points());
    DMatrix::from_fn(xs.len(), ys.len(), |i, j| sq_dist(&xs[i], &ys[j]))
}

/// On-demand cost lookup `(i, j) ↦ |xᵢ − yⱼ|²` without storing the matrix.
///
/// Panics on out-of-range indices, like indexing a dense matrix would.
pub fn cost_fn<'a>(
    source: &'a PointCloud,
    target: &'a PointCloud,
) -> impl Fn(usize, usize) -> f64 + 'a {
    let (xs, ys) = (source.points(), target.points());
    move |i, j| sq_dist(&xs[i], &ys[j])
}
