// SPDX-License-Identifier: Apache-2.0
//! System model: an immutable network of timed processes.
//!
//! A [`System`] is built once from a [`SystemDecl`] (the abstract structure
//! delivered by a front-end parser) and never mutated afterwards. It owns the
//! processes, locations, edges, events, clocks, bounded integer variables,
//! labels and synchronization vectors, plus the derived indices the symbolic
//! layers query on hot paths.

mod access;
mod build;
mod decl;
mod expr;

use std::fmt;

use fixedbitset::FixedBitSet;
use thiserror::Error;

pub use access::VariableAccessMap;
pub use decl::{
    ActionDecl, ClockDecl, ConstraintDecl, EdgeDecl, EventDecl, IntGuardDecl, IntVarDecl,
    LocationDecl, ProcessDecl, SyncConstraintDecl, SyncDecl, SystemDecl,
};
pub use expr::{Action, ClockConstraint, CmpOp, Guard, IntExpr, IntGuard};

/// Identifier of a process (index into declaration order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub u32);

/// Identifier of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub u32);

/// Identifier of a clock; id 0 is the reserved zero clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockId(pub u32);

/// Identifier of a bounded integer variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntVarId(pub u32);

/// Identifier of a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelId(pub u32);

/// Identifier of a location, unique across the whole system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocationId(pub u32);

/// Identifier of an edge, unique across the whole system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub u32);

/// Identifier of a synchronization vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyncId(pub u32);

macro_rules! id_index {
    ($($t:ty),*) => {
        $(impl $t {
            /// Index form of this identifier.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        })*
    };
}
id_index!(ProcessId, EventId, ClockId, IntVarId, LabelId, LocationId, EdgeId, SyncId);

/// The reserved zero clock.
pub const ZERO_CLOCK: ClockId = ClockId(0);

/// Strength of a synchronization constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStrength {
    /// The participant must have an enabled edge for the vector to fire.
    Strong,
    /// Broadcast participant: joins when enabled, never blocks.
    Weak,
}

/// Errors raised while building a [`System`] from its declaration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Two declarations share an identifier of the same kind.
    #[error("duplicate {kind} `{name}`")]
    Duplicate {
        /// Declaration kind (process, event, clock, …).
        kind: &'static str,
        /// Offending name.
        name: String,
    },
    /// A declaration references an unknown identifier.
    #[error("unknown {kind} `{name}`")]
    Unknown {
        /// Referenced kind.
        kind: &'static str,
        /// Offending name.
        name: String,
    },
    /// An array-typed variable was declared with size 0.
    #[error("non-positive array size for `{0}`")]
    NonPositiveSize(String),
    /// An integer variable domain is empty or its initial value escapes it.
    #[error("invalid domain for integer variable `{0}`")]
    BadDomain(String),
    /// A process has no initial location.
    #[error("process `{0}` has no initial location")]
    NoInitialLocation(String),
    /// An edge connects locations of two different processes.
    #[error("edge `{src}` -> `{tgt}` crosses process boundaries")]
    CrossProcessEdge {
        /// Source location name.
        src: String,
        /// Target location name.
        tgt: String,
    },
    /// A synchronization vector names the same process twice.
    #[error("synchronization constrains process `{0}` twice")]
    DuplicateSyncProcess(String),
    /// A synchronization vector has no constraints.
    #[error("empty synchronization vector")]
    EmptySync,
    /// A clock constraint compares the zero clock with itself.
    #[error("constraint compares the zero clock with itself")]
    DegenerateConstraint,
}

/// A location of some process.
#[derive(Debug, Clone)]
pub struct Location {
    /// Owning process.
    pub pid: ProcessId,
    /// Name, unique across the system.
    pub name: String,
    /// Whether exploration may start here.
    pub initial: bool,
    /// Committed locations force the next transition to involve them.
    pub committed: bool,
    /// Urgent locations forbid time elapse.
    pub urgent: bool,
    /// Labels carried by this location (bitset over the system labels).
    pub labels: FixedBitSet,
    /// Location invariant over clocks.
    pub invariant: Vec<ClockConstraint>,
}

/// An edge of some process.
#[derive(Debug, Clone)]
pub struct Edge {
    /// Owning process.
    pub pid: ProcessId,
    /// Source location.
    pub src: LocationId,
    /// Target location.
    pub tgt: LocationId,
    /// Triggering event.
    pub event: EventId,
    /// Guard over clocks and integer variables.
    pub guard: Guard,
    /// Assignment sequence (integer updates and clock resets, in order).
    pub actions: Vec<Action>,
}

/// One participant of a synchronization vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConstraint {
    /// Participating process.
    pub pid: ProcessId,
    /// Event the participant synchronizes on.
    pub event: EventId,
    /// Mandatory or broadcast participation.
    pub strength: SyncStrength,
}

/// A synchronization vector: a set of `(process, event, strength)` pins.
#[derive(Debug, Clone)]
pub struct Synchronization {
    /// Constraints in process-id ascending order.
    pub constraints: Vec<SyncConstraint>,
}

impl Synchronization {
    /// Number of participating processes.
    pub fn size(&self) -> usize {
        self.constraints.len()
    }
}

/// A bounded integer variable.
#[derive(Debug, Clone)]
pub struct IntVar {
    /// Name (flattened for arrays).
    pub name: String,
    /// Smallest admissible value.
    pub min: i64,
    /// Largest admissible value.
    pub max: i64,
    /// Initial value.
    pub init: i64,
}

/// An immutable system of timed processes.
#[derive(Debug, Clone)]
pub struct System {
    pub(crate) name: String,
    pub(crate) processes: Vec<String>,
    pub(crate) events: Vec<String>,
    /// Clock names; index 0 is the zero clock.
    pub(crate) clocks: Vec<String>,
    pub(crate) intvars: Vec<IntVar>,
    pub(crate) labels: Vec<String>,
    pub(crate) locations: Vec<Location>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) syncs: Vec<Synchronization>,
    // derived indices
    pub(crate) locations_per_process: Vec<Vec<LocationId>>,
    pub(crate) initial_per_process: Vec<Vec<LocationId>>,
    pub(crate) outgoing: Vec<Vec<EdgeId>>,
    pub(crate) incoming: Vec<Vec<EdgeId>>,
    /// `(location, event)` -> outgoing edges, keyed by location index.
    pub(crate) outgoing_by_event: Vec<Vec<(EventId, EdgeId)>>,
    pub(crate) incoming_by_event: Vec<Vec<(EventId, EdgeId)>>,
    pub(crate) committed: FixedBitSet,
    pub(crate) urgent: FixedBitSet,
    pub(crate) access: VariableAccessMap,
}

impl System {
    /// System name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of processes.
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Name of process `pid`.
    pub fn process_name(&self, pid: ProcessId) -> &str {
        &self.processes[pid.index()]
    }

    /// Number of events.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Name of event `e`.
    pub fn event_name(&self, e: EventId) -> &str {
        &self.events[e.index()]
    }

    /// Number of clocks including the zero clock; this is the DBM dimension.
    pub fn clock_count(&self) -> usize {
        self.clocks.len()
    }

    /// Name of clock `c`.
    pub fn clock_name(&self, c: ClockId) -> &str {
        &self.clocks[c.index()]
    }

    /// Number of integer variables.
    pub fn intvar_count(&self) -> usize {
        self.intvars.len()
    }

    /// Integer variable `v`.
    pub fn intvar(&self, v: IntVarId) -> &IntVar {
        &self.intvars[v.index()]
    }

    /// Initial valuation of the integer variables.
    pub fn initial_intvars(&self) -> Vec<i64> {
        self.intvars.iter().map(|v| v.init).collect()
    }

    /// Number of labels.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Name of label `l`.
    pub fn label_name(&self, l: LabelId) -> &str {
        &self.labels[l.index()]
    }

    /// Parses a comma-separated label list into a bitset.
    ///
    /// # Errors
    /// [`ModelError::Unknown`] for labels never attached to any location.
    pub fn labels_from_str(&self, labels: &str) -> Result<FixedBitSet, ModelError> {
        let mut set = FixedBitSet::with_capacity(self.labels.len());
        if labels.is_empty() {
            return Ok(set);
        }
        for name in labels.split(',') {
            let name = name.trim();
            let id = self
                .labels
                .iter()
                .position(|l| l == name)
                .ok_or_else(|| ModelError::Unknown {
                    kind: "label",
                    name: name.to_owned(),
                })?;
            set.insert(id);
        }
        Ok(set)
    }

    /// Location `id`.
    pub fn location(&self, id: LocationId) -> &Location {
        &self.locations[id.index()]
    }

    /// Number of locations across all processes.
    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    /// Edge `id`.
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    /// Number of edges across all processes.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Synchronization vector `id`.
    pub fn sync(&self, id: SyncId) -> &Synchronization {
        &self.syncs[id.index()]
    }

    /// All synchronization vectors in declaration order.
    pub fn syncs(&self) -> impl Iterator<Item = (SyncId, &Synchronization)> {
        self.syncs
            .iter()
            .enumerate()
            .map(|(i, s)| (SyncId(i as u32), s))
    }

    /// Locations of process `pid` in declaration order.
    pub fn locations_of(&self, pid: ProcessId) -> &[LocationId] {
        &self.locations_per_process[pid.index()]
    }

    /// Initial locations of process `pid`.
    pub fn initial_locations(&self, pid: ProcessId) -> &[LocationId] {
        &self.initial_per_process[pid.index()]
    }

    /// Outgoing edges of location `loc` in declaration order.
    pub fn outgoing_edges(&self, loc: LocationId) -> &[EdgeId] {
        &self.outgoing[loc.index()]
    }

    /// Incoming edges of location `loc` in declaration order.
    pub fn incoming_edges(&self, loc: LocationId) -> &[EdgeId] {
        &self.incoming[loc.index()]
    }

    /// Outgoing edges of `loc` triggered by `event`.
    pub fn outgoing_edges_by_event(
        &self,
        loc: LocationId,
        event: EventId,
    ) -> impl Iterator<Item = EdgeId> + '_ {
        self.outgoing_by_event[loc.index()]
            .iter()
            .filter(move |(e, _)| *e == event)
            .map(|(_, id)| *id)
    }

    /// Incoming edges of `loc` triggered by `event`.
    pub fn incoming_edges_by_event(
        &self,
        loc: LocationId,
        event: EventId,
    ) -> impl Iterator<Item = EdgeId> + '_ {
        self.incoming_by_event[loc.index()]
            .iter()
            .filter(move |(e, _)| *e == event)
            .map(|(_, id)| *id)
    }

    /// Whether location `id` is committed.
    pub fn is_committed(&self, id: LocationId) -> bool {
        self.committed.contains(id.index())
    }

    /// Whether location `id` is urgent.
    pub fn is_urgent(&self, id: LocationId) -> bool {
        self.urgent.contains(id.index())
    }

    /// Label bitset of location `id`.
    pub fn location_labels(&self, id: LocationId) -> &FixedBitSet {
        &self.locations[id.index()].labels
    }

    /// The variable access map.
    pub fn access(&self) -> &VariableAccessMap {
        &self.access
    }
}
