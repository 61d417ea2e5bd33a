// SPDX-License-Identifier: Apache-2.0
//! Transition-system vocabulary shared by the symbolic layers.
//!
//! Every step of a symbolic transition system reports a [`StateStatus`] bit.
//! Exploration passes a *mask* of acceptable bits; only steps whose status
//! intersects the mask are surfaced, everything else is dropped locally and
//! exploration continues. Statuses are not errors: they encode the semantic
//! reason a step produced no state.

use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::sync::Arc;

use fixedbitset::FixedBitSet;

use crate::bound::BoundError;

/// Status bits of a symbolic step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateStatus(u32);

impl StateStatus {
    /// The step produced a state.
    pub const OK: Self = Self(1);
    /// The integer guard failed or an assignment left the variable domain.
    pub const INTVARS_GUARD_VIOLATED: Self = Self(1 << 1);
    /// The source invariant emptied the zone.
    pub const CLOCKS_SRC_INVARIANT_VIOLATED: Self = Self(1 << 2);
    /// The clock guard emptied the zone.
    pub const CLOCKS_GUARD_VIOLATED: Self = Self(1 << 3);
    /// The target invariant emptied the zone.
    pub const CLOCKS_TGT_INVARIANT_VIOLATED: Self = Self(1 << 4);
    /// The zone became empty outside any guard or invariant.
    pub const EMPTY_ZONE: Self = Self(1 << 5);
    /// The synchronized projection of an offset zone is empty.
    pub const EMPTY_SYNC_ZONE: Self = Self(1 << 6);
    /// An edge of the tuple does not start in the current location.
    pub const INCOMPATIBLE_EDGE: Self = Self(1 << 7);

    /// Mask accepting every status.
    pub const ANY: Self = Self(u32::MAX);

    /// Whether this status shares a bit with `mask`.
    pub fn intersects(self, mask: Self) -> bool {
        self.0 & mask.0 != 0
    }

    /// Whether no bit is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for StateStatus {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for StateStatus {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for StateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::OK, "ok"),
            (Self::INTVARS_GUARD_VIOLATED, "intvars-guard"),
            (Self::CLOCKS_SRC_INVARIANT_VIOLATED, "src-invariant"),
            (Self::CLOCKS_GUARD_VIOLATED, "clocks-guard"),
            (Self::CLOCKS_TGT_INVARIANT_VIOLATED, "tgt-invariant"),
            (Self::EMPTY_ZONE, "empty-zone"),
            (Self::EMPTY_SYNC_ZONE, "empty-sync-zone"),
            (Self::INCOMPATIBLE_EDGE, "incompatible-edge"),
        ];
        let mut first = true;
        for (bit, name) in names {
            if self.intersects(bit) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

/// A status–state–transition triple produced by a symbolic step.
pub type Sst<S, T> = (StateStatus, Arc<S>, T);

/// Capability set of a forward-explorable symbolic transition system.
///
/// Implementations are instantiated concretely (zone graph, offset zone
/// graph); the covering reachability algorithm is generic over this trait
/// only.
pub trait SymbolicTs {
    /// Symbolic state type.
    type State: Clone + std::hash::Hash + Eq + fmt::Debug;
    /// Transition decoration type.
    type Transition: fmt::Debug;

    /// Initial states whose status intersects `mask`.
    fn initial(&mut self, mask: StateStatus)
        -> Result<Vec<Sst<Self::State, Self::Transition>>, BoundError>;

    /// Successors of `state` whose status intersects `mask`, in the
    /// iteration order of the underlying discrete structure.
    fn next(
        &mut self,
        state: &Self::State,
        mask: StateStatus,
    ) -> Result<Vec<Sst<Self::State, Self::Transition>>, BoundError>;

    /// Labels of `state` as a bitset over the system labels.
    fn labels(&self, state: &Self::State) -> FixedBitSet;

    /// Whether every location of `state` is initial.
    fn is_initial(&self, state: &Self::State) -> bool;

    /// Hash of the discrete part of `state` (locations and integer
    /// variables, never the zone), used to cluster zone-comparable states.
    fn discrete_hash(&self, state: &Self::State) -> u64;

    /// Covering relation: same discrete part and the zone of `lhs` included
    /// in the zone of `rhs` under the configured abstraction.
    fn covered(&self, lhs: &Self::State, rhs: &Self::State) -> bool;
}
