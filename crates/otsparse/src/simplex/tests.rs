use super::*;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_cost(rng: &mut StdRng, nrows: usize, ncols: usize) -> DMatrix<f64> {
    DMatrix::from_fn(nrows, ncols, |_, _| rng.gen_range(0.0..10.0))
}

fn random_weights(rng: &mut StdRng, n: usize) -> Vec<f64> {
    let w: Vec<f64> = (0..n).map(|_| rng.gen_range(0.1..1.0)).collect();
    let s: f64 = w.iter().sum();
    w.into_iter().map(|x| x / s).collect()
}

fn permutations(n: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    let mut out = Vec::new();
    for p in permutations(n - 1) {
        for pos in 0..=p.len() {
            let mut q = p.clone();
            q.insert(pos, n - 1);
            out.push(q);
        }
    }
    out
}

fn assert_marginals(sol: &ExactSolution, a: &[f64], b: &[f64], tol: f64) {
    let mut rows = vec![0.0; a.len()];
    let mut cols = vec![0.0; b.len()];
    for ((&i, &j), &f) in sol.rows.iter().zip(&sol.cols).zip(&sol.flows) {
        assert!(f >= -1e-12, "negative flow {f}");
        rows[i] += f;
        cols[j] += f;
    }
    for (s, w) in rows.iter().zip(a) {
        assert!((s - w).abs() < tol, "row sum {s} vs {w}");
    }
    for (s, w) in cols.iter().zip(b) {
        assert!((s - w).abs() < tol, "col sum {s} vs {w}");
    }
}

#[test]
fn zero_cost_diagonal() {
    let cost = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
    let sol = solve_dense(&[0.5, 0.5], &[0.5, 0.5], &cost, &SimplexCfg::default()).unwrap();
    assert!(sol.is_optimal());
    assert!(sol.cost.abs() < 1e-15);
    let plan = sol.plan();
    let mut kept: Vec<(usize, usize)> = plan.triplet_iter().map(|(i, j, _)| (i, j)).collect();
    kept.sort_unstable();
    assert_eq!(kept, vec![(0, 0), (1, 1)]);
}

#[test]
fn matches_brute_force_assignment() {
    let n = 4;
    let w = vec![1.0 / n as f64; n];
    let perms = permutations(n);
    assert_eq!(perms.len(), 24);
    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let cost = random_cost(&mut rng, n, n);
        let best = perms
            .iter()
            .map(|p| p.iter().enumerate().map(|(i, &j)| cost[(i, j)]).sum::<f64>())
            .fold(f64::INFINITY, f64::min)
            / n as f64;
        let sol = solve_dense(&w, &w, &cost, &SimplexCfg::default()).unwrap();
        assert!(sol.is_optimal(), "seed {seed}: {}", sol.status);
        assert!((sol.cost - best).abs() < 1e-9, "seed {seed}: {} vs {best}", sol.cost);
        assert_marginals(&sol, &w, &w, 1e-12);
    }
}

#[test]
fn duals_certify_optimality() {
    for seed in 0..10u64 {
        let mut rng = StdRng::seed_from_u64(100 + seed);
        let (nrows, ncols) = (5, 7);
        let a = random_weights(&mut rng, nrows);
        let b = random_weights(&mut rng, ncols);
        let cost = random_cost(&mut rng, nrows, ncols);
        let sol = solve_dense(&a, &b, &cost, &SimplexCfg::default()).unwrap();
        assert!(sol.is_optimal());
        assert_marginals(&sol, &a, &b, 1e-9);

        for ((&i, &j), &f) in sol.rows.iter().zip(&sol.cols).zip(&sol.flows) {
            let slack = cost[(i, j)] - sol.alpha[i] - sol.beta[j];
            assert!(slack >= -1e-9, "dual infeasible at ({i},{j}): {slack}");
            if f > 1e-12 {
                assert!(slack.abs() < 1e-9, "slackness violated at ({i},{j}): {slack}");
            }
        }
        let dual: f64 = a.iter().zip(&sol.alpha).map(|(w, x)| w * x).sum::<f64>()
            + b.iter().zip(&sol.beta).map(|(w, x)| w * x).sum::<f64>();
        assert!((dual - sol.cost).abs() < 1e-9, "gap {}", dual - sol.cost);
    }
}

#[test]
fn tree_stays_consistent_after_pivots() {
    let mut rng = StdRng::seed_from_u64(7);
    let a = random_weights(&mut rng, 6);
    let b = random_weights(&mut rng, 4);
    let cost = random_cost(&mut rng, 6, 4);
    let arcs: Vec<(usize, usize, f64)> = (0..6)
        .flat_map(|i| (0..4).map(move |j| (i, j)))
        .map(|(i, j)| (i, j, cost[(i, j)]))
        .collect();
    let mut net = Network::new(&a, &b, &arcs);
    net.check_tree();
    for cap in [1, 3, 10] {
        net.run(cap);
        net.check_tree();
    }
    assert_eq!(net.run(usize::MAX), PivotOutcome::Optimal);
    net.check_tree();
}

#[test]
fn sparse_support_and_duplicates() {
    // Duplicates are summed: (0, 1) carries cost 1 + 2.
    let mut coo = CooMatrix::new(2, 2);
    coo.push(0, 0, 1.0);
    coo.push(0, 1, 1.0);
    coo.push(0, 1, 2.0);
    coo.push(1, 1, 0.5);
    let sol = solve_sparse(&[0.5, 0.5], &[0.5, 0.5], &coo, &SimplexCfg::default()).unwrap();
    assert!(sol.is_optimal());
    assert_eq!(sol.flows.len(), 3);
    assert!((sol.cost - 0.75).abs() < 1e-12);
}

#[test]
fn missing_column_is_infeasible() {
    let mut coo = CooMatrix::new(2, 2);
    coo.push(0, 0, 1.0);
    coo.push(1, 0, 1.0);
    let sol = solve_sparse(&[0.5, 0.5], &[0.5, 0.5], &coo, &SimplexCfg::default()).unwrap();
    assert_eq!(sol.status, SolveStatus::Infeasible);
}

#[test]
fn mismatched_diagonal_is_infeasible() {
    let mut coo = CooMatrix::new(2, 2);
    coo.push(0, 0, 0.0);
    coo.push(1, 1, 0.0);
    let sol = solve_sparse(&[0.9, 0.1], &[0.5, 0.5], &coo, &SimplexCfg::default()).unwrap();
    assert_eq!(sol.status, SolveStatus::Infeasible);
    assert_eq!(sol.status.to_string(), "Infeasible");
}

#[test]
fn restricted_support_never_beats_full_support() {
    for seed in 0..10u64 {
        let mut rng = StdRng::seed_from_u64(200 + seed);
        let n = 6;
        let w = vec![1.0 / n as f64; n];
        let cost = random_cost(&mut rng, n, n);
        let full = solve_dense(&w, &w, &cost, &SimplexCfg::default()).unwrap();
        // Diagonal keeps the restricted problem feasible.
        let mut coo = CooMatrix::new(n, n);
        for i in 0..n {
            for j in 0..n {
                if i == j || rng.gen_bool(0.4) {
                    coo.push(i, j, cost[(i, j)]);
                }
            }
        }
        let sparse = solve_sparse(&w, &w, &coo, &SimplexCfg::default()).unwrap();
        assert!(sparse.is_optimal());
        assert!(sparse.cost >= full.cost - 1e-12);
    }
}

#[test]
fn iteration_cap_is_reported() {
    let mut rng = StdRng::seed_from_u64(3);
    let w = vec![0.25; 4];
    let cost = random_cost(&mut rng, 4, 4);
    let cfg = SimplexCfg { max_iter: 0 };
    let sol = solve_dense(&w, &w, &cost, &cfg).unwrap();
    assert_eq!(sol.status, SolveStatus::MaxIterReached);
    assert_eq!(sol.iterations, 0);
}

#[test]
fn marginal_rescaling_absorbs_round_off() {
    let cost = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
    let b = [0.5 + 1e-9, 0.5];
    let sol = solve_dense(&[0.5, 0.5], &b, &cost, &SimplexCfg::default()).unwrap();
    assert!(sol.is_optimal());
}

#[test]
fn input_validation() {
    let cost = DMatrix::from_element(2, 3, 1.0);
    let cfg = SimplexCfg::default();
    assert!(matches!(
        solve_dense(&[0.5, 0.5], &[0.5, 0.5], &cost, &cfg),
        Err(TransportError::ShapeMismatch { expected: 3, got: 2, .. })
    ));
    let cost = DMatrix::from_element(2, 2, 1.0);
    assert!(matches!(
        solve_dense(&[0.5, 0.5], &[0.3, 0.3], &cost, &cfg),
        Err(TransportError::MassImbalance { .. })
    ));
    assert!(matches!(
        solve_dense(&[1.5, -0.5], &[0.5, 0.5], &cost, &cfg),
        Err(TransportError::InvalidWeights { .. })
    ));
    let signed = DMatrix::from_row_slice(2, 2, &[-1.0, 1.0, 1.0, -1.0]);
    assert!(matches!(
        solve_dense(&[0.5, 0.5], &[0.5, 0.5], &signed, &cfg),
        Err(TransportError::NegativeCost { row: 0, col: 0, .. })
    ));
    let mut coo = CooMatrix::new(2, 2);
    coo.push(0, 0, 0.0);
    coo.push(1, 1, -0.5);
    assert!(matches!(
        solve_sparse(&[0.5, 0.5], &[0.5, 0.5], &coo, &cfg),
        Err(TransportError::NegativeCost { row: 1, col: 1, .. })
    ));
    let mut bad = cost.clone();
    bad[(1, 0)] = f64::NAN;
    assert!(matches!(
        solve_dense(&[0.5, 0.5], &[0.5, 0.5], &bad, &cfg),
        Err(TransportError::NonFinite { .. })
    ));
}
