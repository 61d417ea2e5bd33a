// SPDX-License-Identifier: Apache-2.0
//! Zone graph over offset DBMs.
//!
//! The offset variant of the zone graph lets every process delay
//! independently through its reference clock. Guards and invariants are
//! translated onto offset variables at construction time; translation
//! refuses models whose clocks are shared between processes or reset to
//! anything but zero. States optionally carry the *synchronized projection*
//! of their offset zone, the standard DBM of valuations where all reference
//! clocks agree.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use fixedbitset::FixedBitSet;
use rustc_hash::FxHasher;

use crate::bound::{BoundError, Cmp};
use crate::clockbounds::ClockBounds;
use crate::dbm::{Dbm, ZoneStatus};
use crate::interner::SliceInterner;
use crate::model::{Action, ClockConstraint, ClockId, EdgeId, LocationId, SyncId, System};
use crate::offset_dbm::OffsetDbm;
use crate::refmap::{RefMap, RefMapError};
use crate::syncprod::{EdgeTuple, SyncProd, Vedge, Vloc};
use crate::ts::{Sst, StateStatus, SymbolicTs};
use crate::zg::{Extrapolation, Semantics};

/// A translated constraint over offset variables.
type OffsetConstraint = (usize, usize, Cmp, i64);

/// A symbolic state over offset zones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefZgState {
    /// Locations per process.
    pub vloc: Vloc,
    /// Integer variable valuation.
    pub intvars: Arc<[i64]>,
    /// Offset zone.
    pub zone: Arc<OffsetDbm>,
    /// Synchronized projection of `zone`, when requested at construction.
    pub sync_zone: Option<Arc<Dbm>>,
}

impl Hash for RefZgState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.vloc.hash(state);
        self.intvars.hash(state);
        self.zone.hash(state);
    }
}

/// A transition of the offset zone graph.
#[derive(Debug, Clone)]
pub struct RefZgTransition {
    /// Fired edges per process.
    pub vedge: Vedge,
    /// Originating synchronization vector.
    pub sync: Option<SyncId>,
}

/// The zone graph over offset DBMs.
#[derive(Debug)]
pub struct RefZg {
    prod: SyncProd,
    refmap: Arc<RefMap>,
    semantics: Semantics,
    extrapolation: Extrapolation,
    bounds: ClockBounds,
    compute_sync_zone: bool,
    /// Translated invariant per location.
    invariants: Vec<Vec<OffsetConstraint>>,
    /// Translated clock guard per edge.
    guards: Vec<Vec<OffsetConstraint>>,
    /// Translated resets (offset variables) per edge.
    resets: Vec<Vec<usize>>,
    vlocs: SliceInterner<LocationId>,
    vedges: SliceInterner<Option<EdgeId>>,
    valuations: SliceInterner<i64>,
}

impl RefZg {
    /// Builds the offset zone graph of `system`.
    ///
    /// # Errors
    /// [`RefMapError::SharedClock`] / [`RefMapError::UnusedClock`] when the
    /// per-process decomposition does not apply, and the translation errors
    /// of [`RefMap`] when a guard or reset has no offset form.
    pub fn new(
        system: Arc<System>,
        semantics: Semantics,
        extrapolation: Extrapolation,
        compute_sync_zone: bool,
    ) -> Result<Self, RefMapError> {
        let mut owner = vec![usize::MAX; system.clock_count()];
        for x in 1..system.clock_count() {
            let clock = ClockId(x as u32);
            match system.access().clock_owner(clock) {
                Some(pid) => owner[x] = pid.index(),
                None => {
                    let accessors = system.access().clock_accessors(clock);
                    let name = system.clock_name(clock).to_owned();
                    return Err(if accessors.count_ones(..) > 1 {
                        RefMapError::SharedClock(name)
                    } else {
                        RefMapError::UnusedClock(name)
                    });
                }
            }
        }
        let refmap = RefMap::new(system.process_count().max(1), &owner);

        let mut invariants = Vec::with_capacity(system.location_count());
        for i in 0..system.location_count() {
            let loc = system.location(LocationId(i as u32));
            invariants.push(translate_constraints(&refmap, &loc.invariant)?);
        }
        let mut guards = Vec::with_capacity(system.edge_count());
        let mut resets = Vec::with_capacity(system.edge_count());
        for i in 0..system.edge_count() {
            let edge = system.edge(EdgeId(i as u32));
            guards.push(translate_constraints(&refmap, &edge.guard.clocks)?);
            let mut edge_resets = Vec::new();
            for action in &edge.actions {
                if let Action::ResetClock { clock } = action {
                    edge_resets.push(refmap.translate_reset(clock.index(), 0, 0)?);
                }
            }
            resets.push(edge_resets);
        }

        let bounds = ClockBounds::new(&system);
        Ok(Self {
            prod: SyncProd::new(system),
            refmap: Arc::new(refmap),
            semantics,
            extrapolation,
            bounds,
            compute_sync_zone,
            invariants,
            guards,
            resets,
            vlocs: SliceInterner::new(),
            vedges: SliceInterner::new(),
            valuations: SliceInterner::new(),
        })
    }

    /// The reference-clock layout.
    pub fn refmap(&self) -> &Arc<RefMap> {
        &self.refmap
    }

    /// The underlying system.
    pub fn system(&self) -> &Arc<System> {
        self.prod.system()
    }

    fn invariant_of(&self, vloc: &[LocationId]) -> Vec<OffsetConstraint> {
        let mut inv = Vec::new();
        for &loc in vloc {
            inv.extend_from_slice(&self.invariants[loc.index()]);
        }
        inv
    }

    fn constrain_all(
        zone: &mut OffsetDbm,
        constraints: &[OffsetConstraint],
    ) -> Result<ZoneStatus, BoundError> {
        for &(x, y, cmp, value) in constraints {
            if zone.constrain(x, y, cmp, value)? == ZoneStatus::Empty {
                return Ok(ZoneStatus::Empty);
            }
        }
        Ok(ZoneStatus::NonEmpty)
    }

    /// Computes the synchronized projection, extrapolated over the standard
    /// clock axes. Returns `None` when synchronization is infeasible.
    fn project(
        &self,
        zone: &OffsetDbm,
        vloc: &[LocationId],
    ) -> Result<Option<Dbm>, BoundError> {
        let mut synced = zone.clone();
        if synced.synchronize()? == ZoneStatus::Empty {
            return Ok(None);
        }
        let mut dbm = synced.to_dbm(&self.refmap);
        match self.extrapolation {
            Extrapolation::None => {}
            Extrapolation::M { local } => {
                let m = if local {
                    self.bounds.vloc_m(vloc)
                } else {
                    self.bounds.global_m()
                };
                dbm.extra_m(&m)?;
            }
            Extrapolation::MPlus { local } => {
                let m = if local {
                    self.bounds.vloc_m(vloc)
                } else {
                    self.bounds.global_m()
                };
                dbm.extra_m_plus(&m)?;
            }
            Extrapolation::Lu { local } => {
                let (l, u) = self.lu_tables(vloc, local);
                dbm.extra_lu(&l, &u)?;
            }
            Extrapolation::LuPlus { local } => {
                let (l, u) = self.lu_tables(vloc, local);
                dbm.extra_lu_plus(&l, &u)?;
            }
        }
        Ok(Some(dbm))
    }

    fn lu_tables(&self, vloc: &[LocationId], local: bool) -> (Vec<i64>, Vec<i64>) {
        if local {
            self.bounds.vloc_lu(vloc)
        } else {
            (self.bounds.global_l().to_vec(), self.bounds.global_u().to_vec())
        }
    }

    fn make_state(
        &mut self,
        vloc: &[LocationId],
        intvars: &[i64],
        zone: OffsetDbm,
        sync_zone: Option<Dbm>,
    ) -> RefZgState {
        RefZgState {
            vloc: self.vlocs.intern(vloc),
            intvars: self.valuations.intern(intvars),
            zone: Arc::new(zone),
            sync_zone: sync_zone.map(Arc::new),
        }
    }

    /// Applies one edge tuple to `state`.
    pub fn step(
        &mut self,
        state: &RefZgState,
        tuple: &EdgeTuple,
    ) -> Result<(StateStatus, Option<(RefZgState, RefZgTransition)>), BoundError> {
        let Some((tgt_vloc, vedge)) = self.prod.apply(&state.vloc, tuple) else {
            return Ok((StateStatus::INCOMPATIBLE_EDGE, None));
        };

        let mut intvars: Vec<i64> = state.intvars.to_vec();
        for &e in &tuple.edges {
            let edge = self.system().edge(e);
            for g in &edge.guard.ints {
                if !g.holds(&intvars) {
                    return Ok((StateStatus::INTVARS_GUARD_VIOLATED, None));
                }
            }
            for action in &edge.actions {
                if let Action::SetInt { var, expr } = action {
                    let Some(value) = expr.eval(&intvars) else {
                        return Ok((StateStatus::INTVARS_GUARD_VIOLATED, None));
                    };
                    let info = self.system().intvar(*var);
                    if value < info.min || value > info.max {
                        return Ok((StateStatus::INTVARS_GUARD_VIOLATED, None));
                    }
                    intvars[var.index()] = value;
                }
            }
        }

        let src_invariant = self.invariant_of(&state.vloc);
        let tgt_invariant = self.invariant_of(&tgt_vloc);
        let mut guard = Vec::new();
        let mut resets = Vec::new();
        for &e in &tuple.edges {
            guard.extend_from_slice(&self.guards[e.index()]);
            resets.extend_from_slice(&self.resets[e.index()]);
        }

        let mut zone = (*state.zone).clone();
        if Self::constrain_all(&mut zone, &src_invariant)? == ZoneStatus::Empty {
            return Ok((StateStatus::CLOCKS_SRC_INVARIANT_VIOLATED, None));
        }
        if self.semantics == Semantics::Elapsed {
            zone.asynchronous_open_up_partial(&self.prod.delay_allowed(&state.vloc));
            if Self::constrain_all(&mut zone, &src_invariant)? == ZoneStatus::Empty {
                return Ok((StateStatus::CLOCKS_SRC_INVARIANT_VIOLATED, None));
            }
        }
        if Self::constrain_all(&mut zone, &guard)? == ZoneStatus::Empty {
            return Ok((StateStatus::CLOCKS_GUARD_VIOLATED, None));
        }
        for &var in &resets {
            zone.reset_to_refclock(var, &self.refmap)?;
        }
        if Self::constrain_all(&mut zone, &tgt_invariant)? == ZoneStatus::Empty {
            return Ok((StateStatus::CLOCKS_TGT_INVARIANT_VIOLATED, None));
        }
        if self.semantics == Semantics::NonElapsed {
            zone.asynchronous_open_up_partial(&self.prod.delay_allowed(&tgt_vloc));
            if Self::constrain_all(&mut zone, &tgt_invariant)? == ZoneStatus::Empty {
                return Ok((StateStatus::CLOCKS_TGT_INVARIANT_VIOLATED, None));
            }
        }

        let sync_zone = if self.compute_sync_zone {
            match self.project(&zone, &tgt_vloc)? {
                Some(dbm) => Some(dbm),
                None => return Ok((StateStatus::EMPTY_SYNC_ZONE, None)),
            }
        } else {
            None
        };

        let next = self.make_state(&tgt_vloc, &intvars, zone, sync_zone);
        let transition = RefZgTransition {
            vedge: self.vedges.intern(&vedge),
            sync: tuple.sync,
        };
        Ok((StateStatus::OK, Some((next, transition))))
    }
}

fn translate_constraints(
    refmap: &RefMap,
    constraints: &[ClockConstraint],
) -> Result<Vec<OffsetConstraint>, RefMapError> {
    constraints
        .iter()
        .map(|c| refmap.translate_constraint(c.x.index(), c.y.index(), c.cmp, c.value))
        .collect()
}

impl SymbolicTs for RefZg {
    type State = RefZgState;
    type Transition = RefZgTransition;

    fn initial(
        &mut self,
        mask: StateStatus,
    ) -> Result<Vec<Sst<RefZgState, RefZgTransition>>, BoundError> {
        let vlocs: Vec<Vec<LocationId>> = self.prod.initial_vlocs().collect();
        let mut out = Vec::new();
        for vloc in vlocs {
            let invariant = self.invariant_of(&vloc);
            let mut zone = OffsetDbm::zero(&self.refmap);
            let mut status = StateStatus::OK;
            if Self::constrain_all(&mut zone, &invariant)? == ZoneStatus::Empty {
                status = StateStatus::CLOCKS_SRC_INVARIANT_VIOLATED;
            } else if self.semantics == Semantics::Elapsed {
                zone.asynchronous_open_up_partial(&self.prod.delay_allowed(&vloc));
                if Self::constrain_all(&mut zone, &invariant)? == ZoneStatus::Empty {
                    status = StateStatus::CLOCKS_SRC_INVARIANT_VIOLATED;
                }
            }
            if status != StateStatus::OK {
                continue;
            }
            let sync_zone = if self.compute_sync_zone {
                match self.project(&zone, &vloc)? {
                    Some(dbm) => Some(dbm),
                    None => continue,
                }
            } else {
                None
            };
            if status.intersects(mask) {
                let intvars = self.system().initial_intvars();
                let no_edges = vec![None; vloc.len()];
                let state = self.make_state(&vloc, &intvars, zone, sync_zone);
                let transition = RefZgTransition {
                    vedge: self.vedges.intern(&no_edges),
                    sync: None,
                };
                out.push((status, Arc::new(state), transition));
            }
        }
        Ok(out)
    }

    fn next(
        &mut self,
        state: &RefZgState,
        mask: StateStatus,
    ) -> Result<Vec<Sst<RefZgState, RefZgTransition>>, BoundError> {
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

    fn labels(&self, state: &RefZgState) -> FixedBitSet {
        self.prod.labels(&state.vloc)
    }

    fn is_initial(&self, state: &RefZgState) -> bool {
        self.prod.is_initial(&state.vloc)
            && state.intvars.as_ref() == self.system().initial_intvars()
    }

    fn discrete_hash(&self, state: &RefZgState) -> u64 {
        let mut hasher = FxHasher::default();
        state.vloc.hash(&mut hasher);
        state.intvars.hash(&mut hasher);
        hasher.finish()
    }

    fn covered(&self, lhs: &RefZgState, rhs: &RefZgState) -> bool {
        lhs.vloc == rhs.vloc && lhs.intvars == rhs.intvars && lhs.zone.is_le(&rhs.zone)
    }
}
