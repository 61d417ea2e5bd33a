// SPDX-License-Identifier: Apache-2.0
//! Covering reachability algorithm.
//!
//! Forward exploration of a symbolic transition system over a covering
//! graph: initial states seed the waiting store, each expansion tests the
//! accepting labels and adds successors under the covering discipline. The
//! expansion order is exactly the waiting policy's order; an empty accepting
//! set exhausts the reachable state space.

use std::time::{Duration, Instant};

use fixedbitset::FixedBitSet;

use crate::bound::BoundError;
use crate::graph::waiting::{Discipline, LinkedWaiting, Waiting};
use crate::graph::{CoveringGraph, Inserted, NodeId};
use crate::ts::{StateStatus, SymbolicTs};

pub use crate::graph::CoveringPolicy;

/// Search order of the exploration, mapped onto a fast-remove waiting store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrder {
    /// Depth-first (fast-remove stack).
    Dfs,
    /// Breadth-first (fast-remove queue).
    Bfs,
}

impl SearchOrder {
    fn discipline(self) -> Discipline {
        match self {
            Self::Dfs => Discipline::Lifo,
            Self::Bfs => Discipline::Fifo,
        }
    }
}

/// Statistics of one covering reachability run.
#[derive(Debug, Clone)]
pub struct Stats {
    start: Instant,
    end: Option<Instant>,
    /// Number of states expanded.
    pub visited: usize,
    /// Whether a state satisfying the accepting labels was reached.
    pub reachable: bool,
    /// Number of nodes detached by covering.
    pub covered: usize,
    /// Number of nodes stored in the graph.
    pub stored: usize,
    /// Number of actual transition edges.
    pub actual_edges: usize,
    /// Number of subsumption edges.
    pub subsumption_edges: usize,
}

impl Stats {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            end: None,
            visited: 0,
            reachable: false,
            covered: 0,
            stored: 0,
            actual_edges: 0,
            subsumption_edges: 0,
        }
    }

    /// Wall-clock time of the run.
    pub fn elapsed(&self) -> Duration {
        self.end.unwrap_or_else(Instant::now) - self.start
    }
}

/// Whether `labels` satisfies the accepting set: non-empty and included in
/// `labels`.
fn satisfies(labels: &FixedBitSet, target: &FixedBitSet) -> bool {
    target.count_ones(..) > 0 && target.is_subset(labels)
}

/// Runs covering reachability for `target` over `ts`, building `graph`.
///
/// # Errors
/// [`BoundError`] on arithmetic overflow in zone computations; semantic step
/// failures are filtered, not raised.
pub fn covreach<TS: SymbolicTs>(
    ts: &mut TS,
    graph: &mut CoveringGraph<TS>,
    target: &FixedBitSet,
    order: SearchOrder,
) -> Result<Stats, BoundError> {
    let mut waiting: LinkedWaiting<NodeId> = LinkedWaiting::new(order.discipline());
    let mut stats = Stats::new();

    for (_, state, _) in ts.initial(StateStatus::OK)? {
        let is_final = satisfies(&ts.labels(&state), target);
        if let Inserted::New(node) = graph.add_node(ts, state, is_final, &mut waiting) {
            waiting.insert(node);
        }
    }

    while let Some(node) = waiting.remove_first() {
        stats.visited += 1;
        if graph.node(node).is_final {
            stats.reachable = true;
            break;
        }
        let state = std::sync::Arc::clone(&graph.node(node).state);
        for (_, next, transition) in ts.next(&state, StateStatus::OK)? {
            let is_final = satisfies(&ts.labels(&next), target);
            match graph.add_node(ts, next, is_final, &mut waiting) {
                Inserted::New(tgt) => {
                    waiting.insert(tgt);
                    graph.add_edge(node, tgt, Some(transition));
                }
                Inserted::Existing(tgt) => {
                    graph.add_edge(node, tgt, Some(transition));
                }
                Inserted::CoveredBy(tgt) => {
                    graph.add_edge(node, tgt, None);
                }
            }
        }
    }

    stats.end = Some(Instant::now());
    stats.covered = graph.covered_count();
    stats.stored = graph.node_count();
    let (actual, subsumption) = graph.edge_counts();
    stats.actual_edges = actual;
    stats.subsumption_edges = subsumption;
    Ok(stats)
}
