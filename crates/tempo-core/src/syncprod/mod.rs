// SPDX-License-Identifier: Apache-2.0
//! Synchronized product of processes.
//!
//! Computes initial, final and outgoing/incoming transitions over vectors of
//! locations without consulting clocks. A transition is either a single
//! asynchronous edge (whose event takes part in no multi-process
//! synchronization) or a tuple of edges matching a synchronization vector:
//! every `STRONG` participant must have a locally enabled edge, enabled
//! `WEAK` participants join, disabled `WEAK` participants do not block.
//!
//! Committed locations restrict both directions: an outgoing tuple must
//! involve some committed process when one exists; an incoming tuple must
//! move a process out of a committed source location or involve every
//! committed process of the target vector.

mod iterators;

use std::sync::Arc;

use fixedbitset::FixedBitSet;

pub use iterators::{EdgeTuple, IncomingEdges, OutgoingEdges, VlocProduct};

use crate::model::{EdgeId, EventId, LocationId, ProcessId, System};

/// A shared vector of locations indexed by process id.
pub type Vloc = Arc<[LocationId]>;

/// A shared vector of fired edges indexed by process id; `None` marks a
/// process that did not move.
pub type Vedge = Arc<[Option<EdgeId>]>;

/// The synchronized product transition relation over a [`System`].
#[derive(Debug)]
pub struct SyncProd {
    system: Arc<System>,
    /// Per-location outgoing edges whose event synchronizes with no other
    /// process.
    async_outgoing: Vec<Vec<EdgeId>>,
    async_incoming: Vec<Vec<EdgeId>>,
}

impl SyncProd {
    /// Builds the product over `system`, extracting asynchronous edges.
    pub fn new(system: Arc<System>) -> Self {
        let mut multi_process: Vec<(ProcessId, EventId)> = Vec::new();
        for (_, sync) in system.syncs() {
            if sync.size() > 1 {
                for c in &sync.constraints {
                    multi_process.push((c.pid, c.event));
                }
            }
        }
        let nlocs = system.location_count();
        let mut async_outgoing = vec![Vec::new(); nlocs];
        let mut async_incoming = vec![Vec::new(); nlocs];
        for i in 0..system.edge_count() {
            let id = EdgeId(i as u32);
            let edge = system.edge(id);
            if !multi_process.contains(&(edge.pid, edge.event)) {
                async_outgoing[edge.src.index()].push(id);
                async_incoming[edge.tgt.index()].push(id);
            }
        }
        Self {
            system,
            async_outgoing,
            async_incoming,
        }
    }

    /// The underlying system.
    pub fn system(&self) -> &Arc<System> {
        &self.system
    }

    /// Whether edge `e` is asynchronous.
    pub fn is_asynchronous(&self, e: EdgeId) -> bool {
        let edge = self.system.edge(e);
        self.async_outgoing[edge.src.index()].contains(&e)
    }

    /// Iterator over all initial location vectors (Cartesian product of the
    /// per-process initial locations), in process-id-ascending order.
    pub fn initial_vlocs(&self) -> VlocProduct {
        let lists = (0..self.system.process_count())
            .map(|pid| self.system.initial_locations(ProcessId(pid as u32)).to_vec())
            .collect();
        VlocProduct::new(lists)
    }

    /// Iterator over location vectors whose combined label set covers
    /// `labels`, for backward search seeds.
    ///
    /// Enumerates the full Cartesian product of locations, so its cost is
    /// exponential in the number of processes.
    pub fn final_vlocs<'a>(
        &'a self,
        labels: &'a FixedBitSet,
    ) -> impl Iterator<Item = Vec<LocationId>> + 'a {
        let lists = (0..self.system.process_count())
            .map(|pid| self.system.locations_of(ProcessId(pid as u32)).to_vec())
            .collect();
        VlocProduct::new(lists).filter(move |vloc| self.labels(vloc).is_superset(labels))
    }

    /// Iterator over outgoing edge tuples of `vloc`: synchronized tuples
    /// first (synchronization-id order, participants in process-id order),
    /// then asynchronous edges in process-id order. Committed filtering is
    /// applied.
    pub fn outgoing_edges(&self, vloc: &[LocationId]) -> OutgoingEdges<'_> {
        OutgoingEdges::new(self, vloc.to_vec(), self.committed_processes(vloc))
    }

    /// Iterator over incoming edge tuples of `vloc`, with the reversed
    /// committed rule.
    pub fn incoming_edges(&self, vloc: &[LocationId]) -> IncomingEdges<'_> {
        IncomingEdges::new(self, vloc.to_vec(), self.committed_processes(vloc))
    }

    /// Applies `tuple` forward to `vloc`.
    ///
    /// Returns `None` when some edge of the tuple does not start in the
    /// process's current location (incompatible edge); otherwise the updated
    /// location vector and the fired-edge vector.
    pub fn apply(
        &self,
        vloc: &[LocationId],
        tuple: &EdgeTuple,
    ) -> Option<(Vec<LocationId>, Vec<Option<EdgeId>>)> {
        let mut next = vloc.to_vec();
        let mut vedge = vec![None; vloc.len()];
        for &e in &tuple.edges {
            let edge = self.system.edge(e);
            if vloc[edge.pid.index()] != edge.src {
                return None;
            }
            next[edge.pid.index()] = edge.tgt;
            vedge[edge.pid.index()] = Some(e);
        }
        Some((next, vedge))
    }

    /// Applies `tuple` backward to `vloc` (targets must match).
    pub fn apply_reverse(
        &self,
        vloc: &[LocationId],
        tuple: &EdgeTuple,
    ) -> Option<(Vec<LocationId>, Vec<Option<EdgeId>>)> {
        let mut prev = vloc.to_vec();
        let mut vedge = vec![None; vloc.len()];
        for &e in &tuple.edges {
            let edge = self.system.edge(e);
            if vloc[edge.pid.index()] != edge.tgt {
                return None;
            }
            prev[edge.pid.index()] = edge.src;
            vedge[edge.pid.index()] = Some(e);
        }
        Some((prev, vedge))
    }

    /// Union of the location labels over `vloc`.
    pub fn labels(&self, vloc: &[LocationId]) -> FixedBitSet {
        let mut labels = FixedBitSet::with_capacity(self.system.label_count());
        for &loc in vloc {
            labels.union_with(self.system.location_labels(loc));
        }
        labels
    }

    /// Processes currently in a committed location, as a bitset over
    /// process ids.
    pub fn committed_processes(&self, vloc: &[LocationId]) -> FixedBitSet {
        let mut committed = FixedBitSet::with_capacity(vloc.len());
        for (pid, &loc) in vloc.iter().enumerate() {
            if self.system.is_committed(loc) {
                committed.insert(pid);
            }
        }
        committed
    }

    /// Processes allowed to let time elapse: neither urgent nor committed.
    pub fn delay_allowed(&self, vloc: &[LocationId]) -> FixedBitSet {
        let mut allowed = FixedBitSet::with_capacity(vloc.len());
        for (pid, &loc) in vloc.iter().enumerate() {
            if !self.system.is_urgent(loc) && !self.system.is_committed(loc) {
                allowed.insert(pid);
            }
        }
        allowed
    }

    /// Whether every location of `vloc` is initial.
    pub fn is_initial(&self, vloc: &[LocationId]) -> bool {
        vloc.iter().all(|&loc| self.system.location(loc).initial)
    }
}
