//! Primal network simplex on an uncapacitated transportation network.
//!
//! Layout
//! - Nodes `0..n1` supply `a`, nodes `n1..n1+n2` demand `b`, node `root`
//!   closes the spanning tree. Real arcs `0..m` go supply → demand.
//! - Arc `m + u` is the artificial arc between `u` and `root`, oriented so the
//!   initial tree carries `|supply(u)|` on it; demand-side artificial arcs cost
//!   `art`, large enough that real arcs are always preferred.
//! - The tree is kept as parent pointers plus child/sibling lists; a pivot
//!   re-hangs one subtree and shifts its potentials by a constant.
//!
//! Reduced cost of arc `e = (s, t)` is `c(e) + π(s) − π(t)`; tree arcs sit at 0.

use crate::cfg::{MIN_BLOCK_SIZE, REDUCED_COST_ULPS};

const NONE: usize = usize::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArcState {
    Tree,
    Lower,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    First,
    Second,
}

/// Result of the pivot loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum PivotOutcome {
    Optimal,
    Unbounded,
    IterationCap,
}

pub(super) struct Network {
    n1: usize,
    n2: usize,
    m: usize,
    // arcs (real then artificial)
    source: Vec<usize>,
    target: Vec<usize>,
    cost: Vec<f64>,
    flow: Vec<f64>,
    state: Vec<ArcState>,
    // nodes (including root)
    pi: Vec<f64>,
    parent: Vec<usize>,
    pred: Vec<usize>,
    /// `pred` arc is oriented node → parent.
    pred_up: Vec<bool>,
    depth: Vec<usize>,
    first_child: Vec<usize>,
    next_sib: Vec<usize>,
    prev_sib: Vec<usize>,
    // pivot rule
    block: usize,
    next_arc: usize,
    rc_slack: f64,
    pub(super) pivots: usize,
}

impl Network {
    /// Build the network and its artificial starting tree.
    ///
    /// `arcs` are `(row, col, cost)` triplets; `a`/`b` must already be balanced.
    pub(super) fn new(a: &[f64], b: &[f64], arcs: &[(usize, usize, f64)]) -> Self {
        let (n1, n2, m) = (a.len(), b.len(), arcs.len());
        let nodes = n1 + n2;
        let root = nodes;
        let max_cost = arcs.iter().fold(0.0f64, |acc, &(_, _, c)| acc.max(c.abs()));
        let art = (max_cost + 1.0) * (nodes + 1) as f64;

        let mut net = Self {
            n1,
            n2,
            m,
            source: Vec::with_capacity(m + nodes),
            target: Vec::with_capacity(m + nodes),
            cost: Vec::with_capacity(m + nodes),
            flow: vec![0.0; m + nodes],
            state: vec![ArcState::Lower; m + nodes],
            pi: vec![0.0; nodes + 1],
            parent: vec![NONE; nodes + 1],
            pred: vec![NONE; nodes + 1],
            pred_up: vec![false; nodes + 1],
            depth: vec![0; nodes + 1],
            first_child: vec![NONE; nodes + 1],
            next_sib: vec![NONE; nodes + 1],
            prev_sib: vec![NONE; nodes + 1],
            block: ((m as f64).sqrt() as usize).max(MIN_BLOCK_SIZE),
            next_arc: 0,
            rc_slack: f64::EPSILON * REDUCED_COST_ULPS * art,
            pivots: 0,
        };
        for &(i, j, c) in arcs {
            net.source.push(i);
            net.target.push(n1 + j);
            net.cost.push(c);
        }

        let supply = a.iter().copied().chain(b.iter().map(|w| -w));
        for (u, s) in supply.enumerate() {
            let e = m + u;
            if s >= 0.0 {
                net.source.push(u);
                net.target.push(root);
                net.cost.push(0.0);
                net.flow[e] = s;
                net.pred_up[u] = true;
                net.pi[u] = 0.0;
            } else {
                net.source.push(root);
                net.target.push(u);
                net.cost.push(art);
                net.flow[e] = -s;
                net.pred_up[u] = false;
                net.pi[u] = art;
            }
            net.state[e] = ArcState::Tree;
            net.pred[u] = e;
            net.depth[u] = 1;
            net.attach(u, root);
        }
        net
    }

    /// Pivot until optimal, unbounded, or `max_iter` pivots.
    pub(super) fn run(&mut self, max_iter: usize) -> PivotOutcome {
        loop {
            let Some(in_arc) = self.find_entering() else {
                return PivotOutcome::Optimal;
            };
            if self.pivots >= max_iter {
                return PivotOutcome::IterationCap;
            }
            self.pivots += 1;
            let (first, second) = (self.source[in_arc], self.target[in_arc]);
            let join = self.find_join(first, second);
            let Some((u_out, side, delta)) = self.find_leaving(first, second, join) else {
                return PivotOutcome::Unbounded;
            };
            self.change_flow(in_arc, first, second, join, u_out, delta);
            let (u_in, v_in) = match side {
                Side::First => (first, second),
                Side::Second => (second, first),
            };
            self.rehang(in_arc, u_in, v_in, u_out);
        }
    }

    /// Block search: scan arcs cyclically, return the most negative reduced
    /// cost of the first block that contains any.
    fn find_entering(&mut self) -> Option<usize> {
        let m = self.m;
        if m == 0 {
            return None;
        }
        let mut best = -self.rc_slack;
        let mut best_arc = None;
        let mut cnt = self.block;
        let mut e = self.next_arc;
        for _ in 0..m {
            if self.state[e] == ArcState::Lower {
                let rc = self.cost[e] + self.pi[self.source[e]] - self.pi[self.target[e]];
                if rc < best {
                    best = rc;
                    best_arc = Some(e);
                }
            }
            e += 1;
            if e == m {
                e = 0;
            }
            cnt -= 1;
            if cnt == 0 {
                if best_arc.is_some() {
                    break;
                }
                cnt = self.block;
            }
        }
        self.next_arc = e;
        best_arc
    }

    fn find_join(&self, mut u: usize, mut v: usize) -> usize {
        while u != v {
            let (du, dv) = (self.depth[u], self.depth[v]);
            if du >= dv {
                u = self.parent[u];
            }
            if dv >= du {
                v = self.parent[v];
            }
        }
        u
    }

    /// Blocking tree arc on the cycle `first → second → join → first`.
    ///
    /// Ties: the first-side arc nearest `first` (strict `<`), overridden by a
    /// second-side arc nearest `join` (`<=`), which keeps the tree strongly
    /// feasible.
    fn find_leaving(&self, first: usize, second: usize, join: usize) -> Option<(usize, Side, f64)> {
        let mut delta = f64::INFINITY;
        let mut out = None;
        let mut u = first;
        while u != join {
            if self.pred_up[u] {
                let d = self.flow[self.pred[u]];
                if d < delta {
                    delta = d;
                    out = Some((u, Side::First));
                }
            }
            u = self.parent[u];
        }
        u = second;
        while u != join {
            if !self.pred_up[u] {
                let d = self.flow[self.pred[u]];
                if d <= delta {
                    delta = d;
                    out = Some((u, Side::Second));
                }
            }
            u = self.parent[u];
        }
        out.map(|(u, side)| (u, side, delta))
    }

    fn change_flow(
        &mut self,
        in_arc: usize,
        first: usize,
        second: usize,
        join: usize,
        u_out: usize,
        delta: f64,
    ) {
        if delta > 0.0 {
            self.flow[in_arc] += delta;
            let mut u = first;
            while u != join {
                let e = self.pred[u];
                if self.pred_up[u] {
                    self.flow[e] -= delta;
                } else {
                    self.flow[e] += delta;
                }
                u = self.parent[u];
            }
            u = second;
            while u != join {
                let e = self.pred[u];
                if self.pred_up[u] {
                    self.flow[e] += delta;
                } else {
                    self.flow[e] -= delta;
                }
                u = self.parent[u];
            }
        }
        let out_arc = self.pred[u_out];
        self.flow[out_arc] = 0.0;
        self.state[out_arc] = ArcState::Lower;
        self.state[in_arc] = ArcState::Tree;
    }

    /// Cut the subtree at `u_out`, re-root it at `u_in`, hang it below `v_in`
    /// through `in_arc`, then shift its potentials and depths.
    fn rehang(&mut self, in_arc: usize, u_in: usize, v_in: usize, u_out: usize) {
        let mut path = vec![u_in];
        let mut w = u_in;
        while w != u_out {
            w = self.parent[w];
            path.push(w);
        }
        self.detach(u_out);
        for &w in &path[..path.len() - 1] {
            self.detach(w);
        }
        for idx in (1..path.len()).rev() {
            let (child, below) = (path[idx], path[idx - 1]);
            self.pred[child] = self.pred[below];
            self.pred_up[child] = !self.pred_up[below];
            self.attach(child, below);
        }
        self.pred[u_in] = in_arc;
        self.pred_up[u_in] = self.source[in_arc] == u_in;
        self.attach(u_in, v_in);

        let dir = if self.pred_up[u_in] { 1.0 } else { -1.0 };
        let sigma = self.pi[v_in] - self.pi[u_in] - dir * self.cost[in_arc];
        let mut stack = vec![u_in];
        while let Some(u) = stack.pop() {
            self.pi[u] += sigma;
            self.depth[u] = self.depth[self.parent[u]] + 1;
            let mut c = self.first_child[u];
            while c != NONE {
                stack.push(c);
                c = self.next_sib[c];
            }
        }
    }

    fn detach(&mut self, v: usize) {
        let p = self.parent[v];
        let (prev, next) = (self.prev_sib[v], self.next_sib[v]);
        if prev != NONE {
            self.next_sib[prev] = next;
        } else if p != NONE {
            self.first_child[p] = next;
        }
        if next != NONE {
            self.prev_sib[next] = prev;
        }
        self.prev_sib[v] = NONE;
        self.next_sib[v] = NONE;
        self.parent[v] = NONE;
    }

    fn attach(&mut self, v: usize, p: usize) {
        self.parent[v] = p;
        let head = self.first_child[p];
        self.next_sib[v] = head;
        self.prev_sib[v] = NONE;
        if head != NONE {
            self.prev_sib[head] = v;
        }
        self.first_child[p] = v;
    }

    /// Largest flow left on an artificial arc.
    pub(super) fn artificial_flow(&self) -> f64 {
        self.flow[self.m..].iter().fold(0.0f64, |acc, f| acc.max(*f))
    }

    pub(super) fn real_flows(&self) -> &[f64] {
        &self.flow[..self.m]
    }

    pub(super) fn cost(&self) -> f64 {
        self.flow[..self.m]
            .iter()
            .zip(&self.cost[..self.m])
            .map(|(f, c)| f * c)
            .sum()
    }

    /// Dual pair with `αᵢ + βⱼ ≤ cᵢⱼ` on every real arc (equality on the tree).
    pub(super) fn duals(&self) -> (Vec<f64>, Vec<f64>) {
        let alpha = (0..self.n1).map(|i| -self.pi[i]).collect();
        let beta = (0..self.n2).map(|j| self.pi[self.n1 + j]).collect();
        (alpha, beta)
    }

    #[cfg(test)]
    pub(super) fn check_tree(&self) {
        let nodes = self.n1 + self.n2;
        let mut seen = 0usize;
        for u in 0..nodes {
            let p = self.parent[u];
            assert_ne!(p, NONE, "node {u} lost its parent");
            assert_eq!(self.depth[u], self.depth[p] + 1);
            let e = self.pred[u];
            assert_eq!(self.state[e], ArcState::Tree);
            let (s, t) = if self.pred_up[u] { (u, p) } else { (p, u) };
            assert_eq!((self.source[e], self.target[e]), (s, t));
            let rc = self.cost[e] + self.pi[s] - self.pi[t];
            assert!(rc.abs() <= 1e-6 * (1.0 + self.cost[e].abs()), "tree arc rc {rc}");
            seen += 1;
        }
        assert_eq!(self.parent[nodes], NONE);
        assert_eq!(seen, nodes);
    }
}
