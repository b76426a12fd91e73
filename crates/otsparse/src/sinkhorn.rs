//! Log-domain Sinkhorn with ε-annealing on point clouds.
//!
//! Model
//! - Ground cost `c(x, y) = |x − y|²`, target regularization `ε = reg`.
//! - Potentials are annealed along a geometric ε schedule from the squared
//!   diameter of the clouds down to `reg` (ratio `scaling²` per step), using
//!   symmetric averaged updates, then one extrapolation step at `ε = reg`.
//! - `softmin` is evaluated on the fly from the two clouds, so memory stays
//!   O(n + m); every update costs O(n·m) exponentials.
//! - The reported cost is the dual value `⟨a, f⟩ + ⟨b, g⟩`.
//!
//! The plan is never stored here: `SinkhornSolution::plan` returns a
//! `LazyPlan` over the potentials.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::cloud::{bounding_diameter, PointCloud};
use crate::cost::sq_dist;
use crate::error::{check_weights, TransportError};
use crate::plan::{LazyPlan, PlanView};

/// Solver configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkhornCfg {
    /// Final entropic regularization ε (same units as the squared distance).
    pub reg: f64,
    /// Annealing ratio in (0, 1); ε shrinks by `scaling²` per step.
    pub scaling: f64,
    /// Extra alternating updates at the final ε, 0 disables.
    pub polish_iters: usize,
    /// Stop polishing once the L1 marginal error is below this.
    pub tol: f64,
}

impl Default for SinkhornCfg {
    fn default() -> Self {
        Self {
            reg: 0.1,
            scaling: 0.9,
            polish_iters: 0,
            tol: 1e-9,
        }
    }
}

impl SinkhornCfg {
    fn validate(&self) -> Result<(), TransportError> {
        if !(self.reg.is_finite() && self.reg > 0.0) {
            return Err(TransportError::invalid("reg", "must be finite and > 0"));
        }
        if !(self.scaling > 0.0 && self.scaling < 1.0) {
            return Err(TransportError::invalid("scaling", "must lie in (0, 1)"));
        }
        if !(self.tol >= 0.0) {
            return Err(TransportError::invalid("tol", "must be >= 0"));
        }
        Ok(())
    }
}

/// Dual potentials and diagnostics of one solve.
#[derive(Clone, Debug)]
pub struct SinkhornSolution {
    /// Regularized transport cost `⟨a, f⟩ + ⟨b, g⟩`.
    pub cost: f64,
    pub f: Vec<f64>,
    pub g: Vec<f64>,
    /// Regularization the potentials belong to (= `cfg.reg`).
    pub eps: f64,
    /// Annealing steps including the final extrapolation.
    pub steps: usize,
    pub polish_steps: usize,
    /// `‖π1 − a‖₁ + ‖πᵀ1 − b‖₁` of the returned plan.
    pub marginal_error: f64,
}

impl SinkhornSolution {
    /// Lazily evaluated plan; the clouds and marginals must be the ones solved for.
    pub fn plan<'a>(
        &'a self,
        source: &'a PointCloud,
        target: &'a PointCloud,
        a: &'a [f64],
        b: &'a [f64],
    ) -> LazyPlan<'a> {
        LazyPlan {
            source,
            target,
            a,
            b,
            f: &self.f,
            g: &self.g,
            eps: self.eps,
        }
    }
}

/// ε values for annealing, non-increasing, last entry exactly `reg`.
///
/// Built in half-cost units (`c/2`, blur² = reg/2) as geomloss does, then
/// rescaled to full units:
/// `[max(d², r)] ++ exp(arange(ln d², ln r, 2 ln s)) ++ [r]` with `r = reg/2`.
///
/// Unlike geomloss, the first entry is clamped to `r`: clouds with
/// `d² < r` (including a zero diameter) start at `reg` instead of below it.
/// For `d² ≥ r` the step count matches geomloss.
pub fn epsilon_schedule(diameter: f64, reg: f64, scaling: f64) -> Vec<f64> {
    let end = reg / 2.0;
    let start = (diameter * diameter).max(end);
    let (lo, hi, step) = (end.ln(), start.ln(), 2.0 * scaling.ln());
    let count = ((lo - hi) / step).ceil().max(0.0) as usize;
    let mut out = Vec::with_capacity(count + 2);
    out.push(start);
    out.extend((0..count).map(|i| (hi + i as f64 * step).exp()));
    out.push(end);
    out.iter().map(|e| 2.0 * e).collect()
}

/// Solve the entropic problem between two weighted clouds.
pub fn solve(
    source: &PointCloud,
    target: &PointCloud,
    a: &[f64],
    b: &[f64],
    cfg: &SinkhornCfg,
) -> Result<SinkhornSolution, TransportError> {
    cfg.validate()?;
    if source.is_empty() {
        return Err(TransportError::EmptyInput {
            what: "source cloud",
        });
    }
    if target.is_empty() {
        return Err(TransportError::EmptyInput {
            what: "target cloud",
        });
    }
    if a.len() != source.len() {
        return Err(TransportError::shape("source weights", source.len(), a.len()));
    }
    if b.len() != target.len() {
        return Err(TransportError::shape("target weights", target.len(), b.len()));
    }
    check_weights(a, "source weights")?;
    check_weights(b, "target weights")?;

    let xs = source.points();
    let ys = target.points();
    let log_a: Vec<f64> = a.iter().map(|w| w.ln()).collect();
    let log_b: Vec<f64> = b.iter().map(|w| w.ln()).collect();
    let schedule = epsilon_schedule(bounding_diameter(source, target), cfg.reg, cfg.scaling);

    let mut sm = Softmin::new(xs.len(), ys.len());
    let mut f = vec![0.0; xs.len()];
    let mut g = vec![0.0; ys.len()];
    let mut ft = vec![0.0; xs.len()];
    let mut gt = vec![0.0; ys.len()];

    let eps0 = schedule[0];
    sm.eval(eps0, xs, ys, &log_b, None, &mut f);
    sm.eval(eps0, ys, xs, &log_a, None, &mut g);

    for &eps in &schedule {
        sm.eval(eps, xs, ys, &log_b, Some(g.as_slice()), &mut ft);
        sm.eval(eps, ys, xs, &log_a, Some(f.as_slice()), &mut gt);
        average_into(&mut f, &ft);
        average_into(&mut g, &gt);
        ensure_finite(&f, &g)?;
    }

    let eps = cfg.reg;
    sm.eval(eps, xs, ys, &log_b, Some(g.as_slice()), &mut ft);
    sm.eval(eps, ys, xs, &log_a, Some(f.as_slice()), &mut gt);
    std::mem::swap(&mut f, &mut ft);
    std::mem::swap(&mut g, &mut gt);
    ensure_finite(&f, &g)?;

    let mut marginal_error = lazy(source, target, a, b, &f, &g, eps).marginal_error(a, b);
    let mut polish_steps = 0;
    while polish_steps < cfg.polish_iters && marginal_error > cfg.tol {
        sm.eval(eps, xs, ys, &log_b, Some(g.as_slice()), &mut f);
        sm.eval(eps, ys, xs, &log_a, Some(f.as_slice()), &mut g);
        ensure_finite(&f, &g)?;
        polish_steps += 1;
        marginal_error = lazy(source, target, a, b, &f, &g, eps).marginal_error(a, b);
    }

    let cost = dot_skip_zero(a, &f) + dot_skip_zero(b, &g);
    tracing::debug!(
        steps = schedule.len() + 1,
        polish_steps,
        marginal_error,
        cost,
        "sinkhorn done"
    );
    Ok(SinkhornSolution {
        cost,
        f,
        g,
        eps,
        steps: schedule.len() + 1,
        polish_steps,
        marginal_error,
    })
}

fn lazy<'a>(
    source: &'a PointCloud,
    target: &'a PointCloud,
    a: &'a [f64],
    b: &'a [f64],
    f: &'a [f64],
    g: &'a [f64],
    eps: f64,
) -> LazyPlan<'a> {
    LazyPlan {
        source,
        target,
        a,
        b,
        f,
        g,
        eps,
    }
}

/// Scratch for `softmin_ε(C, h)ᵢ = −ε · logsumexp_j(hⱼ − Cᵢⱼ/ε)`.
struct Softmin {
    h: Vec<f64>,
}

impl Softmin {
    fn new(n: usize, m: usize) -> Self {
        Self {
            h: Vec::with_capacity(n.max(m)),
        }
    }

    /// `out[i] = softmin over ys` with `h = log_w + pot/ε` (or just `log_w`).
    fn eval(
        &mut self,
        eps: f64,
        xs: &[Vector2<f64>],
        ys: &[Vector2<f64>],
        log_w: &[f64],
        pot: Option<&[f64]>,
        out: &mut [f64],
    ) {
        self.h.clear();
        match pot {
            Some(p) => self
                .h
                .extend(log_w.iter().zip(p).map(|(lw, pj)| lw + pj / eps)),
            None => self.h.extend_from_slice(log_w),
        }
        let inv = 1.0 / eps;
        for (x, o) in xs.iter().zip(out.iter_mut()) {
            let terms = ys
                .iter()
                .zip(&self.h)
                .map(|(y, hj)| hj - sq_dist(x, y) * inv);
            *o = -eps * log_sum_exp(terms);
        }
    }
}

/// Single-pass stabilized log-sum-exp; `−∞` terms are skipped.
pub(crate) fn log_sum_exp(terms: impl Iterator<Item = f64>) -> f64 {
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for v in terms {
        if v == f64::NEG_INFINITY {
            continue;
        }
        if v > max {
            sum = sum * (max - v).exp() + 1.0;
            max = v;
        } else {
            sum += (v - max).exp();
        }
    }
    if max == f64::NEG_INFINITY {
        max
    } else {
        max + sum.ln()
    }
}

fn average_into(p: &mut [f64], q: &[f64]) {
    for (x, y) in p.iter_mut().zip(q) {
        *x = 0.5 * (*x + y);
    }
}

fn ensure_finite(f: &[f64], g: &[f64]) -> Result<(), TransportError> {
    if f.iter().chain(g).all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(TransportError::NonFinite {
            what: "sinkhorn potentials",
        })
    }
}

fn dot_skip_zero(w: &[f64], pot: &[f64]) -> f64 {
    w.iter()
        .zip(pot)
        .filter(|(wi, _)| **wi > 0.0)
        .map(|(wi, pi)| wi * pi)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::uniform_weights;
    use crate::cost::cost_fn;

    fn unit_square() -> PointCloud {
        PointCloud::from_xy(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]])
    }

    fn polished(reg: f64) -> SinkhornCfg {
        SinkhornCfg {
            reg,
            scaling: 0.9,
            polish_iters: 5000,
            tol: 1e-11,
        }
    }

    #[test]
    fn schedule_is_monotone_and_ends_at_reg() {
        let s = epsilon_schedule(10.0, 0.1, 0.9);
        assert!(s.len() > 3);
        assert!((s[0] - 200.0).abs() < 1e-9);
        assert!((s.last().unwrap() - 0.1).abs() < 1e-15);
        for w in s.windows(2) {
            assert!(w[1] <= w[0] * (1.0 + 1e-12), "{} then {}", w[0], w[1]);
        }
        // Diameter below blur: nothing to anneal.
        let t = epsilon_schedule(0.01, 0.1, 0.9);
        assert_eq!(t.len(), 2);
        assert!(t.iter().all(|e| (e - 0.1).abs() < 1e-15));
        // Coincident points: ε never drops to 0.
        let z = epsilon_schedule(0.0, 0.1, 0.9);
        assert_eq!(z, vec![0.1, 0.1]);
    }

    #[test]
    fn log_sum_exp_is_stable() {
        let v = log_sum_exp([1000.0, 1000.0].into_iter());
        assert!((v - (1000.0 + 2f64.ln())).abs() < 1e-9);
        assert_eq!(
            log_sum_exp([f64::NEG_INFINITY].into_iter()),
            f64::NEG_INFINITY
        );
        let w = log_sum_exp([f64::NEG_INFINITY, 0.0].into_iter());
        assert!(w.abs() < 1e-15);
    }

    #[test]
    fn polished_plan_matches_marginals() {
        let s = unit_square();
        let t = s.translated(nalgebra::Vector2::new(0.5, 0.5));
        let a = uniform_weights(4);
        let b = [0.1, 0.2, 0.3, 0.4];
        let sol = solve(&s, &t, &a, &b, &polished(0.5)).unwrap();
        let plan = sol.plan(&s, &t, &a, &b);
        for (r, w) in plan.row_sums().iter().zip(&a) {
            assert!((r - w).abs() < 1e-6, "row sum {r} vs {w}");
        }
        for (c, w) in plan.col_sums().iter().zip(&b) {
            assert!((c - w).abs() < 1e-6, "col sum {c} vs {w}");
        }
        assert!(sol.marginal_error < 1e-6);
        assert!(sol.polish_steps > 0);
    }

    #[test]
    fn translation_cost_is_close_to_exact() {
        // For a rigid shift the exact W2² equals |shift|²; small ε adds little bias.
        let s = PointCloud::from_xy(&[[0.0, 0.0], [3.0, 0.0], [0.0, 3.0], [3.0, 3.0]]);
        let t = s.translated(nalgebra::Vector2::new(1.0, 0.0));
        let w = uniform_weights(4);
        let sol = solve(&s, &t, &w, &w, &polished(0.01)).unwrap();
        assert!((sol.cost - 1.0).abs() < 0.05, "cost {}", sol.cost);
        let plan = sol.plan(&s, &t, &w, &w).materialize();
        for i in 0..4 {
            assert!(plan[(i, i)] > 0.24, "diag {i}: {}", plan[(i, i)]);
        }
        let primal = plan.transport_cost(cost_fn(&s, &t));
        assert!((primal - 1.0).abs() < 0.05);
    }

    #[test]
    fn deterministic_and_lazy_matches_dense() {
        let s = unit_square();
        let t = PointCloud::from_xy(&[[2.0, 2.0], [2.5, 1.0], [1.0, 3.0]]);
        let a = uniform_weights(4);
        let b = uniform_weights(3);
        let cfg = SinkhornCfg::default();
        let one = solve(&s, &t, &a, &b, &cfg).unwrap();
        let two = solve(&s, &t, &a, &b, &cfg).unwrap();
        assert_eq!(one.cost, two.cost);
        assert_eq!(one.f, two.f);
        assert_eq!(one.steps, epsilon_schedule(bounding_diameter(&s, &t), 0.1, 0.9).len() + 1);
        let lazy = one.plan(&s, &t, &a, &b);
        let dense = lazy.materialize();
        let mut row = vec![0.0; 3];
        for i in 0..4 {
            lazy.row_into(i, &mut row);
            for j in 0..3 {
                assert_eq!(row[j], dense[(i, j)]);
                assert!(row[j] >= 0.0);
            }
        }
    }

    #[test]
    fn rejects_bad_input() {
        let s = unit_square();
        let w = uniform_weights(4);
        let bad_reg = SinkhornCfg {
            reg: 0.0,
            ..SinkhornCfg::default()
        };
        assert!(matches!(
            solve(&s, &s, &w, &w, &bad_reg),
            Err(TransportError::InvalidParam { name: "reg", .. })
        ));
        let bad_scaling = SinkhornCfg {
            scaling: 1.0,
            ..SinkhornCfg::default()
        };
        assert!(solve(&s, &s, &w, &w, &bad_scaling).is_err());
        assert!(matches!(
            solve(&s, &s, &w[..3], &w, &SinkhornCfg::default()),
            Err(TransportError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            solve(&PointCloud::default(), &s, &[], &w, &SinkhornCfg::default()),
            Err(TransportError::EmptyInput { .. })
        ));
    }
}
