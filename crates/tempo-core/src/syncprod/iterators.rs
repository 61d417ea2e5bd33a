// SPDX-License-Identifier: Apache-2.0
//! Edge-tuple iterators of the synchronized product.
//!
//! Explicit iterator structs, no recursion: a Cartesian product over the
//! enabled edges of synchronization participants, chained with the
//! asynchronous edges, wrapped by the committed-location filters.

use fixedbitset::FixedBitSet;

use crate::model::{EdgeId, EventId, LocationId, SyncId, SyncStrength};

use super::SyncProd;

/// A tuple of edges fired jointly, tagged with the synchronization vector
/// that produced it (`None` for asynchronous transitions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeTuple {
    /// Participating edges in process-id-ascending order.
    pub edges: Vec<EdgeId>,
    /// Originating synchronization, or `None` for an asynchronous edge.
    pub sync: Option<SyncId>,
}

/// Cartesian product over lists of edges, rightmost list varying fastest.
#[derive(Debug)]
struct EdgeProduct {
    lists: Vec<Vec<EdgeId>>,
    idx: Vec<usize>,
    exhausted: bool,
}

impl EdgeProduct {
    fn new(lists: Vec<Vec<EdgeId>>) -> Self {
        let exhausted = lists.is_empty() || lists.iter().any(Vec::is_empty);
        let idx = vec![0; lists.len()];
        Self {
            lists,
            idx,
            exhausted,
        }
    }

    fn next(&mut self) -> Option<Vec<EdgeId>> {
        if self.exhausted {
            return None;
        }
        let tuple = self
            .lists
            .iter()
            .zip(self.idx.iter())
            .map(|(list, &i)| list[i])
            .collect();
        // advance odometer, rightmost fastest
        let mut pos = self.lists.len();
        loop {
            if pos == 0 {
                self.exhausted = true;
                break;
            }
            pos -= 1;
            self.idx[pos] += 1;
            if self.idx[pos] < self.lists[pos].len() {
                break;
            }
            self.idx[pos] = 0;
        }
        Some(tuple)
    }
}

/// Cartesian product over per-process location lists, yielding location
/// vectors in process-id order.
#[derive(Debug)]
pub struct VlocProduct {
    lists: Vec<Vec<LocationId>>,
    idx: Vec<usize>,
    exhausted: bool,
}

impl VlocProduct {
    /// Builds the product of `lists`; an empty list yields nothing.
    pub fn new(lists: Vec<Vec<LocationId>>) -> Self {
        let exhausted = lists.iter().any(Vec::is_empty);
        let idx = vec![0; lists.len()];
        Self {
            lists,
            idx,
            exhausted,
        }
    }
}

impl Iterator for VlocProduct {
    type Item = Vec<LocationId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let vloc = self
            .lists
            .iter()
            .zip(self.idx.iter())
            .map(|(list, &i)| list[i])
            .collect();
        let mut pos = self.lists.len();
        loop {
            if pos == 0 {
                self.exhausted = true;
                break;
            }
            pos -= 1;
            self.idx[pos] += 1;
            if self.idx[pos] < self.lists[pos].len() {
                break;
            }
            self.idx[pos] = 0;
        }
        Some(vloc)
    }
}

/// Direction of a tuple iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Shared machinery of the outgoing and incoming tuple iterators.
#[derive(Debug)]
struct TupleIter<'a> {
    prod: &'a SyncProd,
    vloc: Vec<LocationId>,
    direction: Direction,
    /// Next synchronization id to try.
    sync_idx: usize,
    /// Product over the current synchronization's participants.
    current: Option<EdgeProduct>,
    /// Asynchronous phase: process cursor and edge cursor.
    async_pid: usize,
    async_edge: usize,
    sync_phase_done: bool,
}

impl<'a> TupleIter<'a> {
    fn new(prod: &'a SyncProd, vloc: Vec<LocationId>, direction: Direction) -> Self {
        Self {
            prod,
            vloc,
            direction,
            sync_idx: 0,
            current: None,
            async_pid: 0,
            async_edge: 0,
            sync_phase_done: false,
        }
    }

    /// Edges of `loc` on `event` in the iteration direction.
    fn local_edges(&self, loc: LocationId, event: EventId) -> Vec<EdgeId> {
        let system = self.prod.system();
        match self.direction {
            Direction::Forward => system.outgoing_edges_by_event(loc, event).collect(),
            Direction::Backward => system.incoming_edges_by_event(loc, event).collect(),
        }
    }

    /// Builds the edge product of synchronization `sync_idx`, or `None` when
    /// it is disabled in `vloc`.
    fn build_product(&self, sync_idx: usize) -> Option<EdgeProduct> {
        let system = self.prod.system();
        let sync = system.sync(SyncId(sync_idx as u32));
        let mut lists = Vec::with_capacity(sync.size());
        for c in &sync.constraints {
            let edges = self.local_edges(self.vloc[c.pid.index()], c.event);
            if edges.is_empty() {
                match c.strength {
                    SyncStrength::Strong => return None,
                    SyncStrength::Weak => continue,
                }
            } else {
                lists.push(edges);
            }
        }
        if lists.is_empty() {
            return None;
        }
        Some(EdgeProduct::new(lists))
    }

    fn next_unfiltered(&mut self) -> Option<EdgeTuple> {
        let system = self.prod.system();
        while !self.sync_phase_done {
            if self.current.is_none() {
                if self.sync_idx >= system.syncs.len() {
                    self.sync_phase_done = true;
                    break;
                }
                self.current = self.build_product(self.sync_idx);
                if self.current.is_none() {
                    self.sync_idx += 1;
                    continue;
                }
            }
            if let Some(product) = self.current.as_mut() {
                if let Some(edges) = product.next() {
                    return Some(EdgeTuple {
                        edges,
                        sync: Some(SyncId(self.sync_idx as u32)),
                    });
                }
                self.current = None;
                self.sync_idx += 1;
            }
        }
        // asynchronous phase
        loop {
            if self.async_pid >= self.vloc.len() {
                return None;
            }
            let loc = self.vloc[self.async_pid];
            let edges = match self.direction {
                Direction::Forward => &self.prod.async_outgoing[loc.index()],
                Direction::Backward => &self.prod.async_incoming[loc.index()],
            };
            if self.async_edge < edges.len() {
                let e = edges[self.async_edge];
                self.async_edge += 1;
                return Some(EdgeTuple {
                    edges: vec![e],
                    sync: None,
                });
            }
            self.async_pid += 1;
            self.async_edge = 0;
        }
    }
}

/// Iterator over outgoing edge tuples of a location vector, committed
/// filtering included.
#[derive(Debug)]
pub struct OutgoingEdges<'a> {
    inner: TupleIter<'a>,
    committed: FixedBitSet,
    any_committed: bool,
}

impl<'a> OutgoingEdges<'a> {
    pub(super) fn new(prod: &'a SyncProd, vloc: Vec<LocationId>, committed: FixedBitSet) -> Self {
        let any_committed = committed.count_ones(..) > 0;
        Self {
            inner: TupleIter::new(prod, vloc, Direction::Forward),
            committed,
            any_committed,
        }
    }
}

impl Iterator for OutgoingEdges<'_> {
    type Item = EdgeTuple;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let tuple = self.inner.next_unfiltered()?;
            if !self.any_committed {
                return Some(tuple);
            }
            let system = self.inner.prod.system();
            let involves_committed = tuple
                .edges
                .iter()
                .any(|&e| self.committed.contains(system.edge(e).pid.index()));
            if involves_committed {
                return Some(tuple);
            }
        }
    }
}

/// Iterator over incoming edge tuples of a location vector.
///
/// A tuple is kept when it moves some process out of a committed source
/// location, or when every committed process of the target vector is
/// involved in the tuple.
#[derive(Debug)]
pub struct IncomingEdges<'a> {
    inner: TupleIter<'a>,
    committed_tgt: FixedBitSet,
}

impl<'a> IncomingEdges<'a> {
    pub(super) fn new(prod: &'a SyncProd, vloc: Vec<LocationId>, committed_tgt: FixedBitSet) -> Self {
        Self {
            inner: TupleIter::new(prod, vloc, Direction::Backward),
            committed_tgt,
        }
    }
}

impl Iterator for IncomingEdges<'_> {
    type Item = EdgeTuple;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let tuple = self.inner.next_unfiltered()?;
            let system = self.inner.prod.system();
            let mut uninvolved = self.committed_tgt.clone();
            let mut committed_src = false;
            for &e in &tuple.edges {
                let edge = system.edge(e);
                if system.is_committed(edge.src) {
                    committed_src = true;
                }
                uninvolved.set(edge.pid.index(), false);
            }
            if committed_src || uninvolved.count_ones(..) == 0 {
                return Some(tuple);
            }
        }
    }
}
