// SPDX-License-Identifier: Apache-2.0
//! Covering reachability graph.
//!
//! Nodes own shared symbolic states and are clustered by the hash of their
//! *discrete* part — the zone is deliberately left out of the hash so all
//! zone-comparable nodes land in one bucket. Inserting a candidate first
//! looks for a node covering it (the candidate is dropped and reached by a
//! *subsumption* edge instead); under full covering, nodes covered *by* the
//! candidate are detached eagerly: pulled out of the waiting store, their
//! incoming edges redirected to the candidate as subsumption edges.
//!
//! Edges live in adjacency arrays indexed by node id; they never own their
//! endpoints, so cycles (including subsumption back-edges) are harmless.

pub mod waiting;

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::ts::SymbolicTs;

pub use waiting::{Discipline, LinkedWaiting, PriorityWaiting, Waiting};

/// Identifier of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Index form.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub u32);

impl EdgeId {
    /// Index form.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of a graph edge.
#[derive(Debug, Clone)]
pub enum EdgeKind<T> {
    /// A concrete transition of the symbolic transition system.
    Actual(T),
    /// The target covers the state the transition actually reached.
    Subsumption,
}

impl<T> EdgeKind<T> {
    /// Whether this is an actual transition edge.
    pub fn is_actual(&self) -> bool {
        matches!(self, Self::Actual(_))
    }
}

/// A graph node.
#[derive(Debug)]
pub struct Node<S> {
    /// The shared symbolic state.
    pub state: Arc<S>,
    /// Whether every location of the state is initial.
    pub initial: bool,
    /// Whether the state satisfies the accepting labels.
    pub is_final: bool,
    /// Whether the node has been detached by a covering node.
    pub covered: bool,
}

#[derive(Debug)]
struct EdgeEntry<T> {
    src: NodeId,
    tgt: NodeId,
    kind: EdgeKind<T>,
    /// Set when the source node was detached; the edge no longer belongs to
    /// the active graph.
    detached: bool,
}

/// Outcome of [`CoveringGraph::add_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    /// The state was new and stored under this fresh node.
    New(NodeId),
    /// A structurally equal state already exists.
    Existing(NodeId),
    /// The state is covered by an existing node; it was not stored.
    CoveredBy(NodeId),
}

impl Inserted {
    /// The canonical node for the inserted state.
    pub fn node(self) -> NodeId {
        match self {
            Self::New(n) | Self::Existing(n) | Self::CoveredBy(n) => n,
        }
    }
}

/// Covering policy of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoveringPolicy {
    /// Covering applies in both directions: candidates are dropped when
    /// covered, and stored nodes are detached when the candidate covers
    /// them.
    Full,
    /// Candidates are dropped when covered; stored nodes are never
    /// detached.
    LeafNodes,
}

/// The covering graph over states of a symbolic transition system `TS`.
#[derive(Debug)]
pub struct CoveringGraph<TS: SymbolicTs> {
    nodes: Vec<Node<TS::State>>,
    edges: Vec<EdgeEntry<TS::Transition>>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
    table: FxHashMap<u64, Vec<NodeId>>,
    policy: CoveringPolicy,
    covered_count: usize,
}

impl<TS: SymbolicTs> CoveringGraph<TS> {
    /// An empty graph with the given covering policy.
    pub fn new(policy: CoveringPolicy) -> Self {
        Self::with_capacity(policy, 0)
    }

    /// An empty graph with `table_size` node-table buckets reserved.
    pub fn with_capacity(policy: CoveringPolicy, table_size: usize) -> Self {
        let mut table = FxHashMap::default();
        table.reserve(table_size);
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            table,
            policy,
            covered_count: 0,
        }
    }

    /// Number of stored nodes, detached ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of detached (covered) nodes.
    pub fn covered_count(&self) -> usize {
        self.covered_count
    }

    /// Node `id`.
    pub fn node(&self, id: NodeId) -> &Node<TS::State> {
        &self.nodes[id.index()]
    }

    /// Iterator over the active (non-covered) nodes.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len())
            .map(|i| NodeId(i as u32))
            .filter(move |n| !self.nodes[n.index()].covered)
    }

    /// Source node of edge `e`.
    pub fn edge_src(&self, e: EdgeId) -> NodeId {
        self.edges[e.index()].src
    }

    /// Target node of edge `e`.
    pub fn edge_tgt(&self, e: EdgeId) -> NodeId {
        self.edges[e.index()].tgt
    }

    /// Kind of edge `e`.
    pub fn edge_kind(&self, e: EdgeId) -> &EdgeKind<TS::Transition> {
        &self.edges[e.index()].kind
    }

    /// Outgoing edges of `n` that belong to the active graph.
    pub fn outgoing_edges(&self, n: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.outgoing[n.index()]
            .iter()
            .copied()
            .filter(move |e| !self.edges[e.index()].detached)
    }

    /// Incoming edges of `n` that belong to the active graph.
    pub fn incoming_edges(&self, n: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.incoming[n.index()]
            .iter()
            .copied()
            .filter(move |e| !self.edges[e.index()].detached)
    }

    /// All active edges.
    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len())
            .map(|i| EdgeId(i as u32))
            .filter(move |e| !self.edges[e.index()].detached)
    }

    /// Count of active actual and subsumption edges.
    pub fn edge_counts(&self) -> (usize, usize) {
        let mut actual = 0;
        let mut subsumption = 0;
        for e in self.edges() {
            if self.edge_kind(e).is_actual() {
                actual += 1;
            } else {
                subsumption += 1;
            }
        }
        (actual, subsumption)
    }

    /// Looks up the node holding a state structurally equal to `state`.
    pub fn find(&self, ts: &TS, state: &TS::State) -> Option<NodeId> {
        let bucket = self.table.get(&ts.discrete_hash(state))?;
        bucket
            .iter()
            .copied()
            .find(|&m| !self.nodes[m.index()].covered && *self.nodes[m.index()].state == *state)
    }

    /// Inserts `state` under the covering discipline.
    ///
    /// Waiting-store bookkeeping for detached nodes happens here: every node
    /// the candidate covers is removed from `waiting`.
    pub fn add_node(
        &mut self,
        ts: &TS,
        state: Arc<TS::State>,
        is_final: bool,
        waiting: &mut impl Waiting<NodeId>,
    ) -> Inserted {
        let hash = ts.discrete_hash(&state);
        if let Some(bucket) = self.table.get(&hash) {
            for &m in bucket {
                if self.nodes[m.index()].covered {
                    continue;
                }
                if *self.nodes[m.index()].state == *state {
                    return Inserted::Existing(m);
                }
            }
            for &m in bucket {
                if self.nodes[m.index()].covered {
                    continue;
                }
                if ts.covered(&state, &self.nodes[m.index()].state) {
                    return Inserted::CoveredBy(m);
                }
            }
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            initial: ts.is_initial(&state),
            is_final,
            covered: false,
            state,
        });
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());

        if self.policy == CoveringPolicy::Full {
            let bucket: Vec<NodeId> = self
                .table
                .get(&hash)
                .map(|b| b.to_vec())
                .unwrap_or_default();
            for m in bucket {
                if m == id || self.nodes[m.index()].covered {
                    continue;
                }
                if ts.covered(&self.nodes[m.index()].state, &self.nodes[id.index()].state) {
                    self.detach_covered(m, id, waiting);
                }
            }
        }

        self.table.entry(hash).or_default().push(id);
        Inserted::New(id)
    }

    /// Detaches `m`, now covered by `by`: removes it from the waiting store,
    /// redirects its incoming edges to `by` as subsumption edges, and drops
    /// its outgoing edges from the active graph.
    fn detach_covered(&mut self, m: NodeId, by: NodeId, waiting: &mut impl Waiting<NodeId>) {
        self.nodes[m.index()].covered = true;
        self.covered_count += 1;
        waiting.remove(&m);

        let incoming = std::mem::take(&mut self.incoming[m.index()]);
        for e in &incoming {
            let entry = &mut self.edges[e.index()];
            entry.tgt = by;
            entry.kind = EdgeKind::Subsumption;
        }
        self.incoming[by.index()].extend(incoming);

        let outgoing = std::mem::take(&mut self.outgoing[m.index()]);
        for e in outgoing {
            self.edges[e.index()].detached = true;
        }
    }

    /// Adds an edge from `src` to `tgt`; `transition = None` records a
    /// subsumption edge.
    pub fn add_edge(&mut self, src: NodeId, tgt: NodeId, transition: Option<TS::Transition>) {
        let kind = match transition {
            Some(t) => EdgeKind::Actual(t),
            None => EdgeKind::Subsumption,
        };
        let e = EdgeId(self.edges.len() as u32);
        self.edges.push(EdgeEntry {
            src,
            tgt,
            kind,
            detached: false,
        });
        self.outgoing[src.index()].push(e);
        self.incoming[tgt.index()].push(e);
    }
}
