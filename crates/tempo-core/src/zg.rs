// SPDX-License-Identifier: Apache-2.0
//! Zone graph: the synchronized product composed with zone semantics.
//!
//! States are `(vloc, intvars, zone)` triples. A step applies an edge tuple
//! of the product: the discrete part moves through the tuple, integer guards
//! and assignments run sequentially, and the zone goes through source
//! invariant, (elapsed) delay, guard, resets, target invariant, (non-elapsed)
//! delay and extrapolation. Each stage that empties the zone or fails a
//! guard reports its own [`StateStatus`] bit; callers filter on a mask.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use fixedbitset::FixedBitSet;
use rustc_hash::FxHasher;

use crate::bound::BoundError;
use crate::clockbounds::ClockBounds;
use crate::dbm::{Dbm, ZoneStatus};
use crate::interner::SliceInterner;
use crate::model::{Action, ClockConstraint, ClockId, EdgeId, IntVarId, LocationId, SyncId, System};
use crate::syncprod::{EdgeTuple, SyncProd, Vedge, Vloc};
use crate::ts::{Sst, StateStatus, SymbolicTs};

/// When time elapse happens within a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semantics {
    /// Delay on the source zone, before the guard.
    Elapsed,
    /// Delay on the result zone, after the target invariant.
    NonElapsed,
}

/// Extrapolation operator configuration; `local` selects per-location clock
/// bounds instead of the global tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extrapolation {
    /// No extrapolation (exact zone graph, possibly infinite).
    None,
    /// ExtraM.
    M {
        /// Use per-location bounds.
        local: bool,
    },
    /// ExtraM+.
    MPlus {
        /// Use per-location bounds.
        local: bool,
    },
    /// ExtraLU.
    Lu {
        /// Use per-location bounds.
        local: bool,
    },
    /// ExtraLU+.
    LuPlus {
        /// Use per-location bounds.
        local: bool,
    },
}

/// A symbolic state of the zone graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZgState {
    /// Locations per process.
    pub vloc: Vloc,
    /// Integer variable valuation.
    pub intvars: Arc<[i64]>,
    /// Clock zone.
    pub zone: Arc<Dbm>,
}

/// A transition of the zone graph. Keeps the constraint containers of the
/// step so counter-example lifting can replay it exactly.
#[derive(Debug, Clone)]
pub struct ZgTransition {
    /// Fired edges per process.
    pub vedge: Vedge,
    /// Originating synchronization vector, `None` for asynchronous steps.
    pub sync: Option<SyncId>,
    /// Source invariant applied by the step.
    pub src_invariant: Vec<ClockConstraint>,
    /// Clock guard applied by the step.
    pub guard: Vec<ClockConstraint>,
    /// Clocks reset by the step, in application order.
    pub resets: Vec<ClockId>,
    /// Target invariant applied by the step.
    pub tgt_invariant: Vec<ClockConstraint>,
}

/// Intersects `dbm` with a conjunction of clock constraints.
pub(crate) fn constrain_all(
    dbm: &mut Dbm,
    constraints: &[ClockConstraint],
) -> Result<ZoneStatus, BoundError> {
    for c in constraints {
        if dbm.constrain(c.x.index(), c.y.index(), c.cmp, c.value)? == ZoneStatus::Empty {
            return Ok(ZoneStatus::Empty);
        }
    }
    Ok(ZoneStatus::NonEmpty)
}

/// The zone graph over a system.
#[derive(Debug)]
pub struct Zg {
    prod: SyncProd,
    semantics: Semantics,
    extrapolation: Extrapolation,
    bounds: ClockBounds,
    vlocs: SliceInterner<LocationId>,
    vedges: SliceInterner<Option<EdgeId>>,
    valuations: SliceInterner<i64>,
}

impl Zg {
    /// Builds the zone graph of `system` under the given semantics and
    /// extrapolation.
    pub fn new(system: Arc<System>, semantics: Semantics, extrapolation: Extrapolation) -> Self {
        let bounds = ClockBounds::new(&system);
        Self {
            prod: SyncProd::new(system),
            semantics,
            extrapolation,
            bounds,
            vlocs: SliceInterner::new(),
            vedges: SliceInterner::new(),
            valuations: SliceInterner::new(),
        }
    }

    /// The underlying synchronized product.
    pub fn prod(&self) -> &SyncProd {
        &self.prod
    }

    /// The underlying system.
    pub fn system(&self) -> &Arc<System> {
        self.prod.system()
    }

    /// Configured semantics.
    pub fn semantics(&self) -> Semantics {
        self.semantics
    }

    /// Concatenated invariant of the locations in `vloc`.
    pub fn invariant_of(&self, vloc: &[LocationId]) -> Vec<ClockConstraint> {
        let mut inv = Vec::new();
        for &loc in vloc {
            inv.extend_from_slice(&self.system().location(loc).invariant);
        }
        inv
    }

    /// Whether time may elapse in `vloc` (no urgent or committed location).
    pub fn vloc_delay_allowed(&self, vloc: &[LocationId]) -> bool {
        self.prod.delay_allowed(vloc).count_ones(..) == vloc.len()
    }

    fn extrapolate(&self, zone: &mut Dbm, vloc: &[LocationId]) -> Result<(), BoundError> {
        match self.extrapolation {
            Extrapolation::None => Ok(()),
            Extrapolation::M { local } => {
                let m = if local {
                    self.bounds.vloc_m(vloc)
                } else {
                    self.bounds.global_m()
                };
                zone.extra_m(&m)
            }
            Extrapolation::MPlus { local } => {
                let m = if local {
                    self.bounds.vloc_m(vloc)
                } else {
                    self.bounds.global_m()
                };
                zone.extra_m_plus(&m)
            }
            Extrapolation::Lu { local } => {
                let (l, u) = self.lu_tables(vloc, local);
                zone.extra_lu(&l, &u)
            }
            Extrapolation::LuPlus { local } => {
                let (l, u) = self.lu_tables(vloc, local);
                zone.extra_lu_plus(&l, &u)
            }
        }
    }

    fn lu_tables(&self, vloc: &[LocationId], local: bool) -> (Vec<i64>, Vec<i64>) {
        if local {
            self.bounds.vloc_lu(vloc)
        } else {
            (self.bounds.global_l().to_vec(), self.bounds.global_u().to_vec())
        }
    }

    fn make_state(&mut self, vloc: &[LocationId], intvars: &[i64], zone: Dbm) -> ZgState {
        ZgState {
            vloc: self.vlocs.intern(vloc),
            intvars: self.valuations.intern(intvars),
            zone: Arc::new(zone),
        }
    }

    /// One initial state per initial location vector.
    fn initial_state(
        &mut self,
        vloc: Vec<LocationId>,
    ) -> Result<(StateStatus, Option<(ZgState, ZgTransition)>), BoundError> {
        let dim = self.system().clock_count();
        let invariant = self.invariant_of(&vloc);
        let mut zone = Dbm::zero(dim);
        if constrain_all(&mut zone, &invariant)? == ZoneStatus::Empty {
            return Ok((StateStatus::CLOCKS_SRC_INVARIANT_VIOLATED, None));
        }
        if self.semantics == Semantics::Elapsed && self.vloc_delay_allowed(&vloc) {
            zone.open_up();
            if constrain_all(&mut zone, &invariant)? == ZoneStatus::Empty {
                return Ok((StateStatus::CLOCKS_SRC_INVARIANT_VIOLATED, None));
            }
        }
        self.extrapolate(&mut zone, &vloc)?;
        let intvars = self.system().initial_intvars();
        let no_edges = vec![None; vloc.len()];
        let state = self.make_state(&vloc, &intvars, zone);
        let transition = ZgTransition {
            vedge: self.vedges.intern(&no_edges),
            sync: None,
            src_invariant: Vec::new(),
            guard: Vec::new(),
            resets: Vec::new(),
            tgt_invariant: invariant,
        };
        Ok((StateStatus::OK, Some((state, transition))))
    }

    /// Applies one edge tuple to `state`.
    pub fn step(
        &mut self,
        state: &ZgState,
        tuple: &EdgeTuple,
    ) -> Result<(StateStatus, Option<(ZgState, ZgTransition)>), BoundError> {
        let Some((tgt_vloc, vedge)) = self.prod.apply(&state.vloc, tuple) else {
            return Ok((StateStatus::INCOMPATIBLE_EDGE, None));
        };

        // integer guards and assignments, sequentially per edge
        let mut intvars: Vec<i64> = state.intvars.to_vec();
        let mut resets: Vec<ClockId> = Vec::new();
        for &e in &tuple.edges {
            let edge = self.system().edge(e);
            for g in &edge.guard.ints {
                if !g.holds(&intvars) {
                    return Ok((StateStatus::INTVARS_GUARD_VIOLATED, None));
                }
            }
            for action in &edge.actions {
                match action {
                    Action::ResetClock { clock } => resets.push(*clock),
                    Action::SetInt { var, expr } => {
                        let Some(value) = expr.eval(&intvars) else {
                            return Ok((StateStatus::INTVARS_GUARD_VIOLATED, None));
                        };
                        if !self.intvar_in_domain(*var, value) {
                            return Ok((StateStatus::INTVARS_GUARD_VIOLATED, None));
                        }
                        intvars[var.index()] = value;
                    }
                }
            }
        }

        let src_invariant = self.invariant_of(&state.vloc);
        let tgt_invariant = self.invariant_of(&tgt_vloc);
        let mut guard = Vec::new();
        for &e in &tuple.edges {
            guard.extend_from_slice(&self.system().edge(e).guard.clocks);
        }

        let mut zone = (*state.zone).clone();
        if constrain_all(&mut zone, &src_invariant)? == ZoneStatus::Empty {
            return Ok((StateStatus::CLOCKS_SRC_INVARIANT_VIOLATED, None));
        }
        if self.semantics == Semantics::Elapsed && self.vloc_delay_allowed(&state.vloc) {
            zone.open_up();
            if constrain_all(&mut zone, &src_invariant)? == ZoneStatus::Empty {
                return Ok((StateStatus::CLOCKS_SRC_INVARIANT_VIOLATED, None));
            }
        }
        if constrain_all(&mut zone, &guard)? == ZoneStatus::Empty {
            return Ok((StateStatus::CLOCKS_GUARD_VIOLATED, None));
        }
        for &clock in &resets {
            zone.reset_to_zero(clock.index())?;
        }
        if constrain_all(&mut zone, &tgt_invariant)? == ZoneStatus::Empty {
            return Ok((StateStatus::CLOCKS_TGT_INVARIANT_VIOLATED, None));
        }
        if self.semantics == Semantics::NonElapsed && self.vloc_delay_allowed(&tgt_vloc) {
            zone.open_up();
            if constrain_all(&mut zone, &tgt_invariant)? == ZoneStatus::Empty {
                return Ok((StateStatus::CLOCKS_TGT_INVARIANT_VIOLATED, None));
            }
        }
        self.extrapolate(&mut zone, &tgt_vloc)?;

        let next = self.make_state(&tgt_vloc, &intvars, zone);
        let transition = ZgTransition {
            vedge: self.vedges.intern(&vedge),
            sync: tuple.sync,
            src_invariant,
            guard,
            resets,
            tgt_invariant,
        };
        Ok((StateStatus::OK, Some((next, transition))))
    }

    /// Applies one edge tuple backward to `state`: target invariant,
    /// unresets, guard, source invariant, then (elapsed) time predecessors.
    pub fn step_back(
        &mut self,
        state: &ZgState,
        tuple: &EdgeTuple,
    ) -> Result<(StateStatus, Option<(ZgState, ZgTransition)>), BoundError> {
        let Some((src_vloc, vedge)) = self.prod.apply_reverse(&state.vloc, tuple) else {
            return Ok((StateStatus::INCOMPATIBLE_EDGE, None));
        };

        let src_invariant = self.invariant_of(&src_vloc);
        let tgt_invariant = self.invariant_of(&state.vloc);
        let mut guard = Vec::new();
        let mut resets = Vec::new();
        for &e in &tuple.edges {
            let edge = self.system().edge(e);
            guard.extend_from_slice(&edge.guard.clocks);
            for action in &edge.actions {
                if let Action::ResetClock { clock } = action {
                    resets.push(*clock);
                }
            }
        }

        let mut zone = (*state.zone).clone();
        if constrain_all(&mut zone, &tgt_invariant)? == ZoneStatus::Empty {
            return Ok((StateStatus::CLOCKS_TGT_INVARIANT_VIOLATED, None));
        }
        for &clock in resets.iter().rev() {
            if zone.unreset_to_zero(clock.index())? == ZoneStatus::Empty {
                return Ok((StateStatus::EMPTY_ZONE, None));
            }
        }
        if constrain_all(&mut zone, &guard)? == ZoneStatus::Empty {
            return Ok((StateStatus::CLOCKS_GUARD_VIOLATED, None));
        }
        if constrain_all(&mut zone, &src_invariant)? == ZoneStatus::Empty {
            return Ok((StateStatus::CLOCKS_SRC_INVARIANT_VIOLATED, None));
        }
        if self.semantics == Semantics::Elapsed && self.vloc_delay_allowed(&src_vloc) {
            zone.open_down()?;
            if constrain_all(&mut zone, &src_invariant)? == ZoneStatus::Empty {
                return Ok((StateStatus::CLOCKS_SRC_INVARIANT_VIOLATED, None));
            }
        }

        // the backward step keeps the same integer valuation: assignments
        // are not inverted, so only identity updates are replayed exactly
        let intvars: Vec<i64> = state.intvars.to_vec();
        let prev = self.make_state(&src_vloc, &intvars, zone);
        let transition = ZgTransition {
            vedge: self.vedges.intern(&vedge),
            sync: tuple.sync,
            src_invariant,
            guard,
            resets,
            tgt_invariant,
        };
        Ok((StateStatus::OK, Some((prev, transition))))
    }

    /// Predecessors of `state` whose status intersects `mask`.
    pub fn prev(
        &mut self,
        state: &ZgState,
        mask: StateStatus,
    ) -> Result<Vec<Sst<ZgState, ZgTransition>>, BoundError> {
        let tuples: Vec<EdgeTuple> = self.prod.incoming_edges(&state.vloc).collect();
        let mut out = Vec::new();
        for tuple in tuples {
            let (status, result) = self.step_back(state, &tuple)?;
            if status.intersects(mask) {
                if let Some((prev, transition)) = result {
                    out.push((status, Arc::new(prev), transition));
                }
            }
        }
        Ok(out)
    }

    /// States whose labels cover `labels`, as seeds for backward search.
    ///
    /// Enumerates every matching location vector and every integer valuation
    /// in the variable domains; exponential in both.
    pub fn final_states(
        &mut self,
        labels: &FixedBitSet,
        mask: StateStatus,
    ) -> Result<Vec<Sst<ZgState, ZgTransition>>, BoundError> {
        let dim = self.system().clock_count();
        let vlocs: Vec<Vec<LocationId>> = self.prod.final_vlocs(labels).collect();
        let domains: Vec<(i64, i64)> = (0..self.system().intvar_count())
            .map(|v| {
                let var = self.system().intvar(IntVarId(v as u32));
                (var.min, var.max)
            })
            .collect();
        let mut out = Vec::new();
        for vloc in vlocs {
            let invariant = self.invariant_of(&vloc);
            let mut valuation: Vec<i64> = domains.iter().map(|(min, _)| *min).collect();
            loop {
                let mut zone = Dbm::universal_positive(dim);
                let status = if constrain_all(&mut zone, &invariant)? == ZoneStatus::Empty {
                    StateStatus::CLOCKS_SRC_INVARIANT_VIOLATED
                } else {
                    StateStatus::OK
                };
                if status.intersects(mask) && status == StateStatus::OK {
                    let no_edges = vec![None; vloc.len()];
                    let state = self.make_state(&vloc, &valuation, zone);
                    let transition = ZgTransition {
                        vedge: self.vedges.intern(&no_edges),
                        sync: None,
                        src_invariant: invariant.clone(),
                        guard: Vec::new(),
                        resets: Vec::new(),
                        tgt_invariant: invariant.clone(),
                    };
                    out.push((status, Arc::new(state), transition));
                }
                // odometer over the integer domains
                let mut pos = valuation.len();
                loop {
                    if pos == 0 {
                        break;
                    }
                    pos -= 1;
                    if valuation[pos] < domains[pos].1 {
                        valuation[pos] += 1;
                        break;
                    }
                    valuation[pos] = domains[pos].0;
                }
                if valuation.iter().zip(domains.iter()).all(|(v, (min, _))| v == min) {
                    break;
                }
            }
        }
        Ok(out)
    }

    fn intvar_in_domain(&self, var: IntVarId, value: i64) -> bool {
        let info = self.system().intvar(var);
        value >= info.min && value <= info.max
    }
}

impl SymbolicTs for Zg {
    type State = ZgState;
    type Transition = ZgTransition;

    fn initial(
        &mut self,
        mask: StateStatus,
    ) -> Result<Vec<Sst<ZgState, ZgTransition>>, BoundError> {
        let vlocs: Vec<Vec<LocationId>> = self.prod.initial_vlocs().collect();
        let mut out = Vec::new();
        for vloc in vlocs {
            let (status, result) = self.initial_state(vloc)?;
            if status.intersects(mask) {
                if let Some((state, transition)) = result {
                    out.push((status, Arc::new(state), transition));
                }
            }
        }
        Ok(out)
    }

    fn next(
        &mut self,
        state: &ZgState,
        mask: StateStatus,
    ) -> Result<Vec<Sst<ZgState, ZgTransition>>, BoundError> {
        let tuples: Vec<EdgeTuple> = self.prod.outgoing_edges(&state.vloc).collect();
        let mut out = Vec::new();
        for tuple in tuples {
            let (status, result) = self.step(state, &tuple)?;
            if status.intersects(mask) {
                if let Some((next, transition)) = result {
                    out.push((status, Arc::new(next), transition));
                }
            }
        }
        Ok(out)
    }

    fn labels(&self, state: &ZgState) -> FixedBitSet {
        self.prod.labels(&state.vloc)
    }

    fn is_initial(&self, state: &ZgState) -> bool {
        self.prod.is_initial(&state.vloc) && state.intvars.as_ref() == self.system().initial_intvars()
    }

    fn discrete_hash(&self, state: &ZgState) -> u64 {
        let mut hasher = FxHasher::default();
        state.vloc.hash(&mut hasher);
        state.intvars.hash(&mut hasher);
        hasher.finish()
    }

    fn covered(&self, lhs: &ZgState, rhs: &ZgState) -> bool {
        lhs.vloc == rhs.vloc && lhs.intvars == rhs.intvars && lhs.zone.is_le(&rhs.zone)
    }
}
