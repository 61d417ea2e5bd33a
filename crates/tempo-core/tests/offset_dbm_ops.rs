// SPDX-License-Identifier: Apache-2.0
//! Offset DBM contracts: positivity, synchronization, asynchronous delay
//! and projection onto standard DBMs.
#![allow(clippy::unwrap_used)]

use fixedbitset::FixedBitSet;
use tempo_core::bound::{Bound, Cmp};
use tempo_core::dbm::ZoneStatus;
use tempo_core::offset_dbm::OffsetDbm;
use tempo_core::refmap::{RefMap, RefMapError};

/// Three processes; system clocks x1 (P0), x2 (P0), x3 (P1), x4 (P2) land
/// on offset variables 3..7.
fn layout() -> RefMap {
    RefMap::new(3, &[usize::MAX, 0, 0, 1, 2])
}

#[test]
fn universal_positive_is_positive_and_tight() {
    let rm = layout();
    let odbm = OffsetDbm::universal_positive(&rm);
    assert!(odbm.is_positive(&rm));
    assert!(odbm.is_universal_positive(&rm));
    assert!(odbm.matrix().is_tight());
}

#[test]
fn synchronize_equates_all_references() {
    let rm = layout();
    let mut odbm = OffsetDbm::universal_positive(&rm);
    assert!(!odbm.is_synchronized());
    assert_eq!(odbm.synchronize().unwrap(), ZoneStatus::NonEmpty);
    assert!(odbm.is_synchronized());
    // after synchronization every reference bounds every offset variable
    assert_eq!(odbm.matrix().at(0, 5), Bound::LE_ZERO);
    assert_eq!(odbm.matrix().at(2, 3), Bound::LE_ZERO);
}

#[test]
fn synchronize_detects_infeasibility() {
    let rm = layout();
    let mut odbm = OffsetDbm::universal_positive(&rm);
    // r0 - r1 <= -1 contradicts r0 = r1
    odbm.constrain(0, 1, Cmp::Le, -1).unwrap();
    assert_eq!(odbm.synchronize().unwrap(), ZoneStatus::Empty);
    assert!(odbm.is_empty());
}

#[test]
fn asynchronous_open_up_clears_every_reference_column() {
    let rm = layout();
    let mut odbm = OffsetDbm::universal_positive(&rm);
    odbm.constrain(0, 1, Cmp::Le, 0).unwrap();
    odbm.constrain(0, 2, Cmp::Lt, -1).unwrap();
    odbm.asynchronous_open_up();
    for r in 0..3 {
        for i in 0..rm.offset_dim() {
            if i != r {
                assert_eq!(odbm.matrix().at(i, r), Bound::LT_INFINITY);
            }
        }
    }
    // offset columns keep their bounds
    assert_eq!(odbm.matrix().at(0, 3), Bound::LE_ZERO);
    assert!(odbm.matrix().is_tight());
}

#[test]
fn partial_open_up_only_touches_allowed_processes() {
    let rm = layout();
    let mut odbm = OffsetDbm::universal_positive(&rm);
    odbm.constrain(2, 1, Cmp::Le, 1).unwrap();
    odbm.constrain(0, 1, Cmp::Le, 0).unwrap();

    let mut delay = FixedBitSet::with_capacity(3);
    delay.insert(1);

    let mut expected = odbm.clone();
    for i in 0..rm.offset_dim() {
        if i != 1 {
            expected.matrix_mut().set(i, 1, Bound::LT_INFINITY);
        }
    }

    odbm.asynchronous_open_up_partial(&delay);
    assert_eq!(odbm, expected);
}

#[test]
fn all_false_delay_bitmap_is_a_noop() {
    let rm = layout();
    let mut odbm = OffsetDbm::universal_positive(&rm);
    odbm.constrain(3, 0, Cmp::Le, 4).unwrap();
    let before = odbm.clone();
    odbm.asynchronous_open_up_partial(&FixedBitSet::with_capacity(3));
    assert_eq!(odbm, before);
}

#[test]
fn reset_to_refclock_zeroes_the_clock() {
    let rm = layout();
    let mut odbm = OffsetDbm::universal_positive(&rm);
    odbm.asynchronous_open_up();
    odbm.reset_to_refclock(3, &rm).unwrap();
    // X1 - RX1 = 0 both ways
    assert_eq!(odbm.matrix().at(3, 0), Bound::LE_ZERO);
    assert_eq!(odbm.matrix().at(0, 3), Bound::LE_ZERO);
    assert!(odbm.matrix().is_tight());
}

#[test]
fn to_dbm_of_synchronized_universal_positive() {
    let rm = layout();
    let mut odbm = OffsetDbm::universal_positive(&rm);
    odbm.synchronize().unwrap();
    let dbm = odbm.to_dbm(&rm);
    assert_eq!(dbm.dim(), rm.clock_dim());
    assert!(dbm.is_universal_positive());
    assert!(dbm.is_tight());
}

#[test]
fn to_dbm_preserves_clock_constraints() {
    let rm = layout();
    let mut odbm = OffsetDbm::universal_positive(&rm);
    // x1 >= 2: RX1 - X1 <= -2, and x4 <= 7: X4 - RX4 <= 7
    odbm.constrain(0, 3, Cmp::Le, -2).unwrap();
    odbm.constrain(6, 2, Cmp::Le, 7).unwrap();
    odbm.synchronize().unwrap();
    let dbm = odbm.to_dbm(&rm);
    assert_eq!(dbm.at(0, 1), Bound::le(-2).unwrap());
    assert_eq!(dbm.at(4, 0), Bound::le(7).unwrap());
    assert!(dbm.is_tight());
}

#[test]
fn zero_zero_constraints_are_rejected_by_translation() {
    let rm = layout();
    assert_eq!(
        rm.translate_constraint(0, 0, Cmp::Le, 1),
        Err(RefMapError::ZeroZeroConstraint)
    );
}

#[test]
fn translation_maps_single_clock_constraints_to_references() {
    let rm = layout();
    // x1 <= 5 becomes X1 - RX1 <= 5 with X1 = 3, RX1 = 0
    assert_eq!(
        rm.translate_constraint(1, 0, Cmp::Le, 5).unwrap(),
        (3, 0, Cmp::Le, 5)
    );
    // x3 >= 2 arrives as 0 - x3 <= -2, becomes RX3 - X3 <= -2
    assert_eq!(
        rm.translate_constraint(0, 3, Cmp::Le, -2).unwrap(),
        (1, 5, Cmp::Le, -2)
    );
}
