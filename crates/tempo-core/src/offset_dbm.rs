// SPDX-License-Identifier: Apache-2.0
//! Offset DBMs.
//!
//! An offset DBM constrains `refcount` reference clocks and one offset
//! variable per system clock (see [`crate::refmap::RefMap`]). Time elapses
//! asynchronously: each process delays by letting its reference clock
//! decrease, which grows every difference pointing at it. A *synchronized*
//! offset DBM equates all reference clocks and projects onto a standard DBM
//! through [`OffsetDbm::to_dbm`].

use std::hash::{Hash, Hasher};

use fixedbitset::FixedBitSet;

use crate::bound::{Bound, BoundError, Cmp};
use crate::dbm::{Dbm, ZoneStatus};
use crate::refmap::RefMap;

/// A DBM over reference clocks and offset variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetDbm {
    matrix: Dbm,
    refcount: usize,
}

impl OffsetDbm {
    /// The universal offset zone. Tight.
    pub fn universal(refmap: &RefMap) -> Self {
        Self {
            matrix: Dbm::universal(refmap.offset_dim()),
            refcount: refmap.refcount(),
        }
    }

    /// The universal positive offset zone: every offset variable is at least
    /// its reference clock (`RX - X ≤ 0`). Tight.
    pub fn universal_positive(refmap: &RefMap) -> Self {
        let mut odbm = Self::universal(refmap);
        for v in refmap.refcount()..refmap.offset_dim() {
            odbm.matrix.set(refmap.reference_of(v), v, Bound::LE_ZERO);
        }
        odbm
    }

    /// The offset zone where every variable equals 0. Tight.
    pub fn zero(refmap: &RefMap) -> Self {
        Self {
            matrix: Dbm::zero(refmap.offset_dim()),
            refcount: refmap.refcount(),
        }
    }

    /// Number of reference clocks.
    pub fn refcount(&self) -> usize {
        self.refcount
    }

    /// The underlying matrix.
    pub fn matrix(&self) -> &Dbm {
        &self.matrix
    }

    /// Mutable access to the underlying matrix; callers must maintain the
    /// offset invariants.
    pub fn matrix_mut(&mut self) -> &mut Dbm {
        &mut self.matrix
    }

    /// Emptiness sentinel test, as for standard DBMs.
    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }

    /// Whether all reference clocks are pairwise equal. Assumes consistency
    /// and tightness.
    pub fn is_synchronized(&self) -> bool {
        for r1 in 0..self.refcount {
            for r2 in 0..self.refcount {
                if r1 != r2 && self.matrix.at(r1, r2) != Bound::LE_ZERO {
                    return false;
                }
            }
        }
        true
    }

    /// Whether every offset variable is at least its reference clock.
    pub fn is_positive(&self, refmap: &RefMap) -> bool {
        (self.refcount..self.matrix.dim())
            .all(|v| self.matrix.at(refmap.reference_of(v), v) <= Bound::LE_ZERO)
    }

    /// Whether this is the universal positive offset zone.
    pub fn is_universal_positive(&self, refmap: &RefMap) -> bool {
        let dim = self.matrix.dim();
        for i in 0..dim {
            for j in 0..dim {
                if i == j {
                    continue;
                }
                let expected = if j >= self.refcount && refmap.reference_of(j) == i {
                    Bound::LE_ZERO
                } else {
                    Bound::LT_INFINITY
                };
                if self.matrix.at(i, j) != expected {
                    return false;
                }
            }
        }
        true
    }

    /// Entrywise inclusion of tight offset DBMs.
    pub fn is_le(&self, other: &Self) -> bool {
        self.matrix.is_le(&other.matrix)
    }

    /// Floyd–Warshall closure; see [`Dbm::tighten`].
    pub fn tighten(&mut self) -> Result<ZoneStatus, BoundError> {
        self.matrix.tighten()
    }

    /// Intersects with `v_x - v_y ≺ value` over offset variables and
    /// reference clocks. Preserves tightness.
    pub fn constrain(
        &mut self,
        x: usize,
        y: usize,
        cmp: Cmp,
        value: i64,
    ) -> Result<ZoneStatus, BoundError> {
        self.matrix.constrain(x, y, cmp, value)
    }

    /// Intersects with `∀ r1, r2: r1 - r2 = 0`. Returns
    /// [`ZoneStatus::Empty`] when no synchronized valuation exists.
    pub fn synchronize(&mut self) -> Result<ZoneStatus, BoundError> {
        let mut changed = false;
        for r1 in 0..self.refcount {
            for r2 in 0..self.refcount {
                if r1 != r2 && self.matrix.at(r1, r2) > Bound::LE_ZERO {
                    self.matrix.set(r1, r2, Bound::LE_ZERO);
                    changed = true;
                }
            }
        }
        if changed {
            self.matrix.tighten()
        } else {
            Ok(ZoneStatus::NonEmpty)
        }
    }

    /// Asynchronous time elapse: clears the column of every reference clock,
    /// letting every process delay independently. Preserves tightness.
    pub fn asynchronous_open_up(&mut self) {
        for r in 0..self.refcount {
            self.clear_reference_column(r);
        }
    }

    /// Asynchronous time elapse restricted to the processes whose bit is set
    /// in `delay_allowed` (indexed by reference clock). An all-clear bitmap
    /// is a no-op.
    pub fn asynchronous_open_up_partial(&mut self, delay_allowed: &FixedBitSet) {
        debug_assert_eq!(delay_allowed.len(), self.refcount);
        for r in delay_allowed.ones() {
            self.clear_reference_column(r);
        }
    }

    fn clear_reference_column(&mut self, r: usize) {
        for i in 0..self.matrix.dim() {
            if i != r {
                self.matrix.set(i, r, Bound::LT_INFINITY);
            }
        }
    }

    /// Resets offset variable `x` to its reference clock (`X := RX`).
    /// Preserves tightness.
    pub fn reset_to_refclock(&mut self, x: usize, refmap: &RefMap) -> Result<(), BoundError> {
        debug_assert!(x >= self.refcount);
        self.matrix.reset(x, refmap.reference_of(x), 0)
    }

    /// Projects a synchronized, non-empty, tight offset DBM onto the
    /// standard DBM over `(0, x_1, …)` obtained by identifying every
    /// reference clock with the zero clock. The result is tight.
    pub fn to_dbm(&self, refmap: &RefMap) -> Dbm {
        debug_assert!(!self.is_empty());
        debug_assert!(self.is_synchronized());
        let dim = refmap.clock_dim();
        let mut dbm = Dbm::universal(dim);
        for i in 1..dim {
            let vi = refmap.offset_of(i);
            dbm.set(i, 0, self.matrix.at(vi, refmap.reference_of(vi)));
            dbm.set(0, i, self.matrix.at(refmap.reference_of(vi), vi));
            for j in 1..dim {
                if i != j {
                    dbm.set(i, j, self.matrix.at(vi, refmap.offset_of(j)));
                }
            }
        }
        dbm
    }
}

impl Hash for OffsetDbm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.matrix.hash(state);
    }
}
