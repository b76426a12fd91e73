//! Synthetic 2D point clouds and uniform marginals.
//!
//! Purpose
//! - Produce the source/target clouds of the benchmark: i.i.d. standard normal
//!   samples, the target shifted by a constant offset.
//! - Determinism comes from an explicitly seeded `StdRng` passed by `&mut`;
//!   there is no global generator. Source is drawn before target from the
//!   same stream, x before y for every point.

use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Ordered sequence of 2D points.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloud {
    pts: Vec<Vector2<f64>>,
}

impl PointCloud {
    pub fn new(pts: Vec<Vector2<f64>>) -> Self {
        Self { pts }
    }

    pub fn from_xy(xy: &[[f64; 2]]) -> Self {
        xy.iter().map(|&[x, y]| Vector2::new(x, y)).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pts.is_empty()
    }

    #[inline]
    pub fn points(&self) -> &[Vector2<f64>] {
        &self.pts
    }

    pub fn translated(&self, offset: Vector2<f64>) -> Self {
        self.pts.iter().map(|p| p + offset).collect()
    }

    /// Axis-aligned bounding box `(min, max)`; `None` when empty.
    pub fn bounds(&self) -> Option<(Vector2<f64>, Vector2<f64>)> {
        let first = *self.pts.first()?;
        Some(self.pts.iter().fold((first, first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        }))
    }

    pub fn mean(&self) -> Option<Vector2<f64>> {
        if self.pts.is_empty() {
            return None;
        }
        let sum = self.pts.iter().fold(Vector2::zeros(), |acc, p| acc + p);
        Some(sum / self.pts.len() as f64)
    }
}

impl FromIterator<Vector2<f64>> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Vector2<f64>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Diagonal of the joint bounding box of two clouds (0 if both are empty).
pub fn bounding_diameter(a: &PointCloud, b: &PointCloud) -> f64 {
    let boxes = [a.bounds(), b.bounds()];
    let mut joint: Option<(Vector2<f64>, Vector2<f64>)> = None;
    for (lo, hi) in boxes.into_iter().flatten() {
        joint = Some(match joint {
            Some((jlo, jhi)) => (jlo.inf(&lo), jhi.sup(&hi)),
            None => (lo, hi),
        });
    }
    joint.map_or(0.0, |(lo, hi)| (hi - lo).norm())
}

/// Uniform marginal of length `n` (each entry `1/n`); empty for `n = 0`.
pub fn uniform_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Draw `n` points from N(0, I₂) and shift them by `offset`.
pub fn gaussian_cloud<R: Rng + ?Sized>(n: usize, offset: Vector2<f64>, rng: &mut R) -> PointCloud {
    (0..n)
        .map(|_| {
            let x: f64 = rng.sample(StandardNormal);
            let y: f64 = rng.sample(StandardNormal);
            Vector2::new(x, y) + offset
        })
        .collect()
}

/// Generator configuration for a source/target pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudCfg {
    /// Points per cloud.
    pub n: usize,
    pub seed: u64,
    /// Constant shift applied to the target cloud.
    pub offset: [f64; 2],
}

impl Default for CloudCfg {
    fn default() -> Self {
        Self {
            n: 10_000,
            seed: 42,
            offset: [2.0, 2.0],
        }
    }
}

/// Source and target clouds with their marginals.
#[derive(Clone, Debug)]
pub struct CloudPair {
    pub source: PointCloud,
    pub target: PointCloud,
    pub a: Vec<f64>,
    pub b: Vec<f64>,
}

impl CloudPair {
    /// Seed a fresh `StdRng` from `cfg.seed` and draw both clouds.
    pub fn generate(cfg: &CloudCfg) -> Self {
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        Self::draw(cfg, &mut rng)
    }

    /// Draw both clouds from a caller-owned generator.
    pub fn draw<R: Rng + ?Sized>(cfg: &CloudCfg, rng: &mut R) -> Self {
        let source = gaussian_cloud(cfg.n, Vector2::zeros(), rng);
        let [ox, oy] = cfg.offset;
        let target = gaussian_cloud(cfg.n, Vector2::new(ox, oy), rng);
        Self::from_clouds(source, target)
    }

    /// Pair two given clouds under uniform marginals.
    pub fn from_clouds(source: PointCloud, target: PointCloud) -> Self {
        let a = uniform_weights(source.len());
        let b = uniform_weights(target.len());
        Self {
            source,
            target,
            a,
            b,
        }
    }
}
