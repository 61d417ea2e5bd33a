// SPDX-License-Identifier: Apache-2.0
//! Clock-bound tables for extrapolation.
//!
//! For every clock, `L` is the largest constant it is compared against as a
//! lower bound and `U` the largest as an upper bound ([`UNBOUNDED`] when the
//! clock is never compared). Tables exist per location — computed by a
//! backward fixpoint where a clock not reset by an edge inherits the bounds
//! of the edge's target — and globally as the pointwise maximum. All tables
//! are read-only after model load.

use crate::dbm::UNBOUNDED;
use crate::model::{Action, ClockConstraint, EdgeId, LocationId, System};

/// Per-location and global L/U clock-bound tables.
#[derive(Debug, Clone)]
pub struct ClockBounds {
    dim: usize,
    /// `local_l[loc][clock]`, [`UNBOUNDED`] when never bounded below.
    local_l: Vec<Vec<i64>>,
    local_u: Vec<Vec<i64>>,
    global_l: Vec<i64>,
    global_u: Vec<i64>,
}

impl ClockBounds {
    /// Computes the tables for `system` by backward propagation over edges.
    pub fn new(system: &System) -> Self {
        let dim = system.clock_count();
        let nlocs = system.location_count();
        let mut local_l = vec![vec![UNBOUNDED; dim]; nlocs];
        let mut local_u = vec![vec![UNBOUNDED; dim]; nlocs];

        // x - y ≺ v bounds x from above by v and y from below by -v; the
        // comparator does not change the integer tables.
        fn add(l: &mut [Vec<i64>], u: &mut [Vec<i64>], loc: usize, c: &ClockConstraint) {
            if c.x.index() != 0 {
                u[loc][c.x.index()] = u[loc][c.x.index()].max(c.value);
            }
            if c.y.index() != 0 {
                l[loc][c.y.index()] = l[loc][c.y.index()].max(-c.value);
            }
        }

        for loc in 0..nlocs {
            for c in &system.location(LocationId(loc as u32)).invariant {
                add(&mut local_l, &mut local_u, loc, c);
            }
        }
        for e in 0..system.edge_count() {
            let edge = system.edge(EdgeId(e as u32));
            for c in &edge.guard.clocks {
                add(&mut local_l, &mut local_u, edge.src.index(), c);
            }
        }

        // Backward fixpoint: a clock not reset on an edge carries the bounds
        // of the target location back to the source.
        let mut changed = true;
        while changed {
            changed = false;
            for e in 0..system.edge_count() {
                let edge = system.edge(EdgeId(e as u32));
                let src = edge.src.index();
                let tgt = edge.tgt.index();
                for x in 1..dim {
                    let reset = edge.actions.iter().any(|a| match a {
                        Action::ResetClock { clock } => clock.index() == x,
                        Action::SetInt { .. } => false,
                    });
                    if reset {
                        continue;
                    }
                    if local_l[tgt][x] > local_l[src][x] {
                        local_l[src][x] = local_l[tgt][x];
                        changed = true;
                    }
                    if local_u[tgt][x] > local_u[src][x] {
                        local_u[src][x] = local_u[tgt][x];
                        changed = true;
                    }
                }
            }
        }

        let mut global_l = vec![UNBOUNDED; dim];
        let mut global_u = vec![UNBOUNDED; dim];
        for loc in 0..nlocs {
            for x in 1..dim {
                global_l[x] = global_l[x].max(local_l[loc][x]);
                global_u[x] = global_u[x].max(local_u[loc][x]);
            }
        }

        Self {
            dim,
            local_l,
            local_u,
            global_l,
            global_u,
        }
    }

    /// DBM dimension the tables are sized for.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Global lower-bound table.
    pub fn global_l(&self) -> &[i64] {
        &self.global_l
    }

    /// Global upper-bound table.
    pub fn global_u(&self) -> &[i64] {
        &self.global_u
    }

    /// Global maximal-bound table `M = max(L, U)`.
    pub fn global_m(&self) -> Vec<i64> {
        max_tables(&self.global_l, &self.global_u)
    }

    /// Lower-bound table of location `loc`.
    pub fn location_l(&self, loc: LocationId) -> &[i64] {
        &self.local_l[loc.index()]
    }

    /// Upper-bound table of location `loc`.
    pub fn location_u(&self, loc: LocationId) -> &[i64] {
        &self.local_u[loc.index()]
    }

    /// Pointwise-maximum L/U tables over the locations of `vloc`.
    pub fn vloc_lu(&self, vloc: &[LocationId]) -> (Vec<i64>, Vec<i64>) {
        let mut l = vec![UNBOUNDED; self.dim];
        let mut u = vec![UNBOUNDED; self.dim];
        for &loc in vloc {
            for x in 1..self.dim {
                l[x] = l[x].max(self.local_l[loc.index()][x]);
                u[x] = u[x].max(self.local_u[loc.index()][x]);
            }
        }
        (l, u)
    }

    /// Pointwise-maximum M table over the locations of `vloc`.
    pub fn vloc_m(&self, vloc: &[LocationId]) -> Vec<i64> {
        let (l, u) = self.vloc_lu(vloc);
        max_tables(&l, &u)
    }
}

fn max_tables(l: &[i64], u: &[i64]) -> Vec<i64> {
    l.iter().zip(u.iter()).map(|(a, b)| *a.max(b)).collect()
}
