// SPDX-License-Identifier: Apache-2.0
//! tempo-core: symbolic reachability engine for networks of timed automata.
//!
//! The engine explores the zone graph of a network of finite-state processes
//! with real-valued clocks, synchronized through shared events. Zones are
//! represented canonically as difference-bound matrices ([`dbm::Dbm`]), the
//! discrete layer is the synchronized product of the processes
//! ([`syncprod::SyncProd`]), and forward exploration runs over a covering
//! graph that prunes states subsumed by zone inclusion
//! ([`covreach`]). Counter-example paths can be replayed symbolically and
//! lifted to exact rational clock valuations ([`path`]).

/// Extended difference bounds `(cmp, value)` with a `+∞` absorbing element.
pub mod bound;
/// Clock-bound tables (L/U/M) used by extrapolation operators.
pub mod clockbounds;
/// Covering reachability algorithm and statistics.
pub mod covreach;
/// Difference-bound matrices: canonical zone representation.
pub mod dbm;
/// DOT rendering of covering graphs.
pub mod dot;
/// Covering graph and waiting stores.
pub mod graph;
/// Hash-consing interner for shared state payloads.
pub mod interner;
/// System model: processes, locations, edges, variables, synchronizations.
pub mod model;
/// Offset DBMs with per-process reference clocks.
pub mod offset_dbm;
/// Counter-example extraction: finite paths, symbolic replay, concrete lift.
pub mod path;
/// Reference-clock layout derived from the variable access map.
pub mod refmap;
/// Zone graph over offset DBMs with asynchronous time elapse.
pub mod refzg;
/// End-to-end `run` entry point.
pub mod run;
/// Synchronized product of processes (discrete semantics).
pub mod syncprod;
/// Transition-system vocabulary shared by the symbolic layers.
pub mod ts;
/// Zone graph: syncprod composed with zone semantics.
pub mod zg;

pub use bound::{Bound, BoundError, Cmp};
pub use covreach::{CoveringPolicy, SearchOrder, Stats};
pub use dbm::{Dbm, ZoneStatus};
pub use model::{System, SystemDecl};
pub use run::{run, RunConfig, StateSpace};
pub use ts::StateStatus;
