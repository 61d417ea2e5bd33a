// SPDX-License-Identifier: Apache-2.0
//! Counter-example extraction.
//!
//! Three stages: a depth-first search over the covering graph returns a
//! finite edge sequence between predicate-satisfying endpoints; the sequence
//! is replayed on a fresh zone graph without extrapolation, recovering the
//! exact succession of zones; finally the symbolic path is lifted backwards
//! to exact rational clock valuations, scaling all bounds by a common factor
//! to stay in integer arithmetic.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::bound::{Bound, BoundError, Cmp};
use crate::dbm::{Dbm, ZoneStatus};
use crate::graph::{CoveringGraph, EdgeId, EdgeKind, Node, NodeId};
use crate::model::{ClockConstraint, LocationId, System};
use crate::syncprod::EdgeTuple;
use crate::ts::{StateStatus, SymbolicTs};
use crate::zg::{Extrapolation, Semantics, Zg, ZgState, ZgTransition};

/// Errors of path extraction and lifting.
#[derive(Debug, Error)]
pub enum PathError {
    /// Bound arithmetic overflowed while replaying or lifting.
    #[error("bound arithmetic overflow during path lifting")]
    Bound(#[from] BoundError),
    /// The scale factor of the concrete lift exceeded its budget; callers
    /// fall back to the symbolic path.
    #[error("scale factor exceeded the concrete-lift budget")]
    ScaleOverflow,
    /// Replaying the extracted edge sequence failed with the given status.
    #[error("symbolic replay failed with status {0}")]
    Replay(StateStatus),
    /// No initial state of the replay graph matches the path root.
    #[error("no initial state matches the path root")]
    MissingRoot,
}

/// Upper bound on the concrete-lift scale factor.
const MAX_FACTOR: i64 = 1_000_000_000_000;

/// Multiplier applied when a strict interval must be widened to pick an
/// integer point.
const SCALE_STEP: i64 = 2;

/// Finds a finite sequence of edges from a node satisfying `filter_first` to
/// a node satisfying `filter_last`, traversing only edges accepted by
/// `filter_edge`. Cycles are broken by a visited set. An empty sequence is a
/// valid answer when both predicates agree on one node.
pub fn extract_path<TS: SymbolicTs>(
    graph: &CoveringGraph<TS>,
    filter_first: &dyn Fn(&Node<TS::State>) -> bool,
    filter_last: &dyn Fn(&Node<TS::State>) -> bool,
    filter_edge: &dyn Fn(&EdgeKind<TS::Transition>) -> bool,
) -> Option<(NodeId, Vec<EdgeId>)> {
    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    let starts: Vec<NodeId> = graph
        .nodes()
        .filter(|&n| filter_first(graph.node(n)))
        .collect();
    for start in starts {
        if visited.contains(&start) {
            continue;
        }
        if let Some(seq) = dfs(graph, start, filter_last, filter_edge, &mut visited) {
            return Some((start, seq));
        }
    }
    None
}

fn dfs<TS: SymbolicTs>(
    graph: &CoveringGraph<TS>,
    start: NodeId,
    filter_last: &dyn Fn(&Node<TS::State>) -> bool,
    filter_edge: &dyn Fn(&EdgeKind<TS::Transition>) -> bool,
    visited: &mut FxHashSet<NodeId>,
) -> Option<Vec<EdgeId>> {
    if filter_last(graph.node(start)) {
        return Some(Vec::new());
    }
    visited.insert(start);
    // edges are popped from the back; reversing keeps declaration order
    let collect_edges = |n: NodeId| {
        let mut edges: Vec<EdgeId> = graph.outgoing_edges(n).collect();
        edges.reverse();
        edges
    };
    let mut stack: Vec<(NodeId, Vec<EdgeId>)> = vec![(start, collect_edges(start))];
    let mut seq: Vec<EdgeId> = Vec::new();
    while let Some((_, edges)) = stack.last_mut() {
        let Some(e) = edges.pop() else {
            stack.pop();
            seq.pop();
            continue;
        };
        if !filter_edge(graph.edge_kind(e)) {
            continue;
        }
        let next = graph.edge_tgt(e);
        if visited.contains(&next) {
            continue;
        }
        seq.push(e);
        if filter_last(graph.node(next)) {
            return Some(seq);
        }
        visited.insert(next);
        stack.push((next, collect_edges(next)));
    }
    None
}

/// A symbolic path: the exact zones along a replayed edge sequence.
#[derive(Debug)]
pub struct SymbolicPath {
    /// States along the path; `states[0]` is the root.
    pub states: Vec<Arc<ZgState>>,
    /// `transitions[i]` leads from `states[i]` to `states[i + 1]`.
    pub transitions: Vec<ZgTransition>,
}

/// Replays `tuples` from the initial state with location vector
/// `root_vloc`, on a fresh zone graph with the given semantics and no
/// extrapolation.
pub fn symbolic_run(
    system: Arc<System>,
    semantics: Semantics,
    root_vloc: &[LocationId],
    tuples: &[EdgeTuple],
) -> Result<SymbolicPath, PathError> {
    let mut zg = Zg::new(system, semantics, Extrapolation::None);
    let root = zg
        .initial(StateStatus::OK)?
        .into_iter()
        .map(|(_, s, _)| s)
        .find(|s| s.vloc.as_ref() == root_vloc)
        .ok_or(PathError::MissingRoot)?;

    let mut states = vec![root];
    let mut transitions = Vec::new();
    for tuple in tuples {
        let current = Arc::clone(&states[states.len() - 1]);
        let (status, result) = zg.step(&current, tuple)?;
        match result {
            Some((next, transition)) => {
                states.push(Arc::new(next));
                transitions.push(transition);
            }
            None => return Err(PathError::Replay(status)),
        }
    }
    Ok(SymbolicPath {
        states,
        transitions,
    })
}

/// Extracts the symbolic counter example of a finished covering run: the
/// first initial-to-final sequence over actual edges, replayed without
/// extrapolation.
pub fn symbolic_counter_example(
    graph: &CoveringGraph<Zg>,
    system: Arc<System>,
    semantics: Semantics,
) -> Result<Option<SymbolicPath>, PathError> {
    let Some((root, seq)) = extract_path(
        graph,
        &|n| n.initial,
        &|n| n.is_final,
        &|kind| kind.is_actual(),
    ) else {
        return Ok(None);
    };
    let root_vloc: Vec<LocationId> = graph.node(root).state.vloc.to_vec();
    // the edge filter admits actual edges only, so every edge carries a vedge
    let tuples: Vec<EdgeTuple> = seq
        .iter()
        .filter_map(|&e| match graph.edge_kind(e) {
            EdgeKind::Actual(t) => Some(EdgeTuple {
                edges: t.vedge.iter().flatten().copied().collect(),
                sync: t.sync,
            }),
            EdgeKind::Subsumption => None,
        })
        .collect();
    symbolic_run(system, semantics, &root_vloc, &tuples).map(Some)
}

/// An exact rational clock value `num / den`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockValue {
    /// Numerator.
    pub num: i64,
    /// Denominator (the scale factor of the lift, at least 1).
    pub den: i64,
}

/// A concrete path: one clock valuation per state of a symbolic path, each
/// the entry valuation of its state.
#[derive(Debug)]
pub struct ConcretePath {
    /// `valuations[i][c]` is the value of clock `c + 1` on entry of state
    /// `i`.
    pub valuations: Vec<Vec<ClockValue>>,
}

/// A DBM whose bounds are scaled by a common positive factor, giving exact
/// rational arithmetic over integer bounds.
#[derive(Debug, Clone)]
pub struct RationalDbm {
    dbm: Dbm,
    factor: i64,
}

impl RationalDbm {
    /// Wraps a tight, non-empty DBM with factor 1.
    pub fn new(dbm: Dbm) -> Self {
        debug_assert!(!dbm.is_empty());
        Self { dbm, factor: 1 }
    }

    /// Current scale factor.
    pub fn factor(&self) -> i64 {
        self.factor
    }

    /// The scaled matrix.
    pub fn dbm(&self) -> &Dbm {
        &self.dbm
    }

    /// Shrinks the zone to a single valuation, scaling up when only
    /// non-integer points remain.
    ///
    /// # Errors
    /// [`PathError::ScaleOverflow`] when the factor would exceed the budget.
    pub fn constrain_to_valuation(&mut self) -> Result<(), PathError> {
        let dim = self.dbm.dim();
        let mut c = 1;
        while c < dim {
            let low = self.dbm.at(0, c);
            let up = self.dbm.at(c, 0);
            if low.cmp_part() == Cmp::Le {
                // pin to the lower bound
                let b = Bound::le(-low.value())?;
                self.dbm.set(c, 0, b);
                self.dbm.tighten()?;
            } else if up.cmp_part() == Cmp::Le && !up.is_infinite() {
                let b = Bound::le(-up.value())?;
                self.dbm.set(0, c, b);
                self.dbm.tighten()?;
            } else if up.is_infinite() || up.value() > -low.value() + 1 {
                // strict bounds with room for an interior integer point
                let lo = Bound::le(low.value() - 1)?;
                self.dbm.set(0, c, lo);
                let hi = Bound::le(-(low.value() - 1))?;
                self.dbm.set(c, 0, hi);
                self.dbm.tighten()?;
            } else {
                // no integer point at this scale
                self.scale_up()?;
                continue;
            }
            c += 1;
        }
        debug_assert!(self.is_single_valuation());
        Ok(())
    }

    fn scale_up(&mut self) -> Result<(), PathError> {
        if self.factor > MAX_FACTOR / SCALE_STEP {
            return Err(PathError::ScaleOverflow);
        }
        self.dbm.scale(SCALE_STEP)?;
        self.factor *= SCALE_STEP;
        Ok(())
    }

    /// Divides the factor back down by every power of [`SCALE_STEP`] that
    /// divides all finite non-zero bounds.
    pub fn simplify(&mut self) {
        let dim = self.dbm.dim();
        let mut div = self.factor;
        for x in 0..dim {
            for y in 0..dim {
                if x == y {
                    continue;
                }
                let b = self.dbm.at(x, y);
                if b.is_infinite() || b.value() == 0 {
                    continue;
                }
                while div >= SCALE_STEP && b.value() % div != 0 {
                    div /= SCALE_STEP;
                }
            }
        }
        if div <= 1 {
            return;
        }
        for x in 0..dim {
            for y in 0..dim {
                if x == y {
                    continue;
                }
                let b = self.dbm.at(x, y);
                if b.is_infinite() || b.value() == 0 {
                    continue;
                }
                // division by a common divisor stays in range
                if let Ok(scaled) = Bound::new(b.cmp_part(), b.value() / div) {
                    self.dbm.set(x, y, scaled);
                }
            }
        }
        self.factor /= div;
    }

    /// Whether the zone is a single valuation: every clock pinned by
    /// matching non-strict bounds.
    pub fn is_single_valuation(&self) -> bool {
        let dim = self.dbm.dim();
        (1..dim).all(|x| {
            let up = self.dbm.at(x, 0);
            let low = self.dbm.at(0, x);
            up.cmp_part() == Cmp::Le
                && low.cmp_part() == Cmp::Le
                && !up.is_infinite()
                && low.value() == -up.value()
        })
    }

    /// The single valuation as exact rationals.
    pub fn valuation(&self) -> Vec<ClockValue> {
        debug_assert!(self.is_single_valuation());
        (1..self.dbm.dim())
            .map(|x| ClockValue {
                num: self.dbm.at(x, 0).value(),
                den: self.factor,
            })
            .collect()
    }
}

/// Scales the constants of a constraint container by `factor`.
fn scaled_constraints(
    constraints: &[ClockConstraint],
    factor: i64,
) -> Result<Vec<(usize, usize, Cmp, i64)>, BoundError> {
    constraints
        .iter()
        .map(|c| {
            let value = c
                .value
                .checked_mul(factor)
                .ok_or(BoundError::Overflow(c.value))?;
            Ok((c.x.index(), c.y.index(), c.cmp, value))
        })
        .collect()
}

fn constrain_scaled(
    dbm: &mut Dbm,
    constraints: &[(usize, usize, Cmp, i64)],
) -> Result<ZoneStatus, BoundError> {
    for &(x, y, cmp, value) in constraints {
        if dbm.constrain(x, y, cmp, value)? == ZoneStatus::Empty {
            return Ok(ZoneStatus::Empty);
        }
    }
    Ok(ZoneStatus::NonEmpty)
}

/// One backward step of the concrete lift: from a pinned valuation of the
/// transition's target state to the valuation at which the transition fired
/// in the source state.
///
/// Returns the entry valuation of the target state (the fired valuation with
/// the transition's resets applied).
fn concrete_predecessor(
    rdbm: &mut RationalDbm,
    transition: &ZgTransition,
    tgt_delay_allowed: bool,
    predecessor_zone: &Dbm,
) -> Result<Vec<ClockValue>, PathError> {
    debug_assert!(rdbm.is_single_valuation());
    let factor = rdbm.factor;
    let tgt_invariant = scaled_constraints(&transition.tgt_invariant, factor)?;
    let src_invariant = scaled_constraints(&transition.src_invariant, factor)?;
    let guard = scaled_constraints(&transition.guard, factor)?;

    let d = &mut rdbm.dbm;
    constrain_scaled(d, &tgt_invariant)?;
    if tgt_delay_allowed {
        d.open_down()?;
    }
    for &clock in &transition.resets {
        d.unreset_to_zero(clock.index())?;
    }
    constrain_scaled(d, &guard)?;
    constrain_scaled(d, &src_invariant)?;

    let mut pred = predecessor_zone.clone();
    pred.scale(factor)?;
    pred.open_up();
    constrain_scaled(&mut pred, &src_invariant)?;
    d.intersect(&pred)?;

    rdbm.simplify();
    rdbm.constrain_to_valuation()?;

    let mut entry = rdbm.clone();
    for &clock in &transition.resets {
        entry.dbm.reset_to_zero(clock.index())?;
    }
    Ok(entry.valuation())
}

/// Lifts a symbolic path to exact rational entry valuations, walking the
/// path backwards from an arbitrary valuation of the final zone.
///
/// # Errors
/// [`PathError::ScaleOverflow`] when rational refinement exceeds the scale
/// budget; callers then fall back to the symbolic path.
pub fn concrete_run(zg: &Zg, path: &SymbolicPath) -> Result<ConcretePath, PathError> {
    let n = path.states.len();
    let dim = path.states[0].zone.dim();
    let mut valuations = vec![Vec::new(); n];

    let mut rdbm = RationalDbm::new((*path.states[n - 1].zone).clone());
    rdbm.constrain_to_valuation()?;
    valuations[n - 1] = rdbm.valuation();

    for i in (1..n).rev() {
        let transition = &path.transitions[i - 1];
        let tgt_delay = zg.vloc_delay_allowed(&path.states[i].vloc);
        valuations[i] = concrete_predecessor(
            &mut rdbm,
            transition,
            tgt_delay,
            &path.states[i - 1].zone,
        )?;
    }

    // the path root is an initial state entered with all clocks at zero
    valuations[0] = vec![ClockValue { num: 0, den: 1 }; dim - 1];
    Ok(ConcretePath { valuations })
}

/// A counter example: the symbolic path, plus the concrete lift when it
/// stayed within the scale budget.
#[derive(Debug)]
pub struct CounterExample {
    /// The symbolic path.
    pub symbolic: SymbolicPath,
    /// The concrete lift, when it succeeded within the scale budget.
    pub concrete: Option<ConcretePath>,
}
