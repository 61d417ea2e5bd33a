// SPDX-License-Identifier: Apache-2.0
//! DBM operation contracts: tightening, constraining, resets, delays and
//! the emptiness sentinel.
#![allow(clippy::unwrap_used)]

use tempo_core::bound::{Bound, Cmp};
use tempo_core::dbm::{Dbm, ZoneStatus};

#[test]
fn tighten_universal_is_universal() {
    let mut dbm = Dbm::universal(4);
    assert_eq!(dbm.tighten().unwrap(), ZoneStatus::NonEmpty);
    assert!(dbm.is_universal());
    assert!(dbm.is_tight());
}

#[test]
fn tighten_zero_is_zero() {
    let mut dbm = Dbm::zero(4);
    let copy = dbm.clone();
    assert_eq!(dbm.tighten().unwrap(), ZoneStatus::NonEmpty);
    assert!(dbm.is_equal(&copy));
}

#[test]
fn tighten_resolves_transitive_bounds() {
    // x <= 2 & y - x <= 3 must tighten y <= 5
    let mut dbm = Dbm::universal_positive(3);
    dbm.constrain(1, 0, Cmp::Le, 2).unwrap();
    dbm.constrain(2, 1, Cmp::Le, 3).unwrap();
    assert!(dbm.is_tight());
    assert_eq!(dbm.at(2, 0), Bound::le(5).unwrap());
}

#[test]
fn tightness_when_zero_row_is_modified() {
    // the AD94 matrix: lower bounds only, differences through row 0
    let mut dbm = Dbm::universal(3);
    dbm.set(0, 1, Bound::lt(-2).unwrap());
    dbm.set(0, 2, Bound::le(-1).unwrap());
    dbm.set(2, 1, Bound::lt(-1).unwrap());
    assert_eq!(dbm.tighten().unwrap(), ZoneStatus::NonEmpty);
    assert!(dbm.is_tight());
    // 0 - x1 = (0 - x2) + (x2 - x1) < -2
    assert_eq!(dbm.at(0, 1), Bound::lt(-2).unwrap());
}

#[test]
fn global_tighten_detects_negative_cycles() {
    let mut dbm = Dbm::universal(3);
    dbm.set(1, 2, Bound::le(1).unwrap());
    dbm.set(2, 1, Bound::lt(-1).unwrap());
    assert_eq!(dbm.tighten().unwrap(), ZoneStatus::Empty);
    assert!(dbm.is_empty());
}

#[test]
fn constrain_keeps_tightness_and_detects_emptiness() {
    let mut dbm = Dbm::universal_positive(3);
    assert_eq!(dbm.constrain(1, 0, Cmp::Le, 5).unwrap(), ZoneStatus::NonEmpty);
    assert!(dbm.is_tight());
    assert_eq!(dbm.constrain(0, 1, Cmp::Le, -7).unwrap(), ZoneStatus::Empty);
    assert!(dbm.is_empty());
}

#[test]
fn constrain_with_infinity_bound_is_a_noop() {
    let mut dbm = Dbm::universal_positive(3);
    dbm.constrain(1, 2, Cmp::Lt, 4).unwrap();
    let copy = dbm.clone();
    dbm.constrain_bound(2, 1, Bound::LT_INFINITY).unwrap();
    assert!(dbm.is_equal(&copy));
}

#[test]
fn reset_to_zero_after_elapse() {
    let mut dbm = Dbm::zero(3);
    dbm.open_up();
    dbm.reset_to_zero(1).unwrap();
    assert!(dbm.is_tight());
    assert_eq!(dbm.at(1, 0), Bound::LE_ZERO);
    assert_eq!(dbm.at(0, 1), Bound::LE_ZERO);
    // x2 - x1 is now the elapsed time, unbounded above
    assert_eq!(dbm.at(2, 1), Bound::LT_INFINITY);
    assert_eq!(dbm.at(1, 2), Bound::LE_ZERO);
}

#[test]
fn sequential_resets_honor_order() {
    // x1 := 0 then x2 := x1 + 2 pins x2 - x1 = 2
    let mut dbm = Dbm::universal_positive(3);
    dbm.constrain(1, 0, Cmp::Le, 7).unwrap();
    dbm.reset(1, 0, 0).unwrap();
    dbm.reset(2, 1, 2).unwrap();
    assert!(dbm.is_tight());
    assert_eq!(dbm.at(2, 0), Bound::le(2).unwrap());
    assert_eq!(dbm.at(0, 2), Bound::le(-2).unwrap());
}

#[test]
fn open_up_preserves_differences() {
    let mut dbm = Dbm::universal_positive(3);
    dbm.constrain(1, 0, Cmp::Le, 2).unwrap();
    dbm.constrain(0, 1, Cmp::Le, -2).unwrap(); // x1 == 2
    dbm.open_up();
    assert!(dbm.is_tight());
    assert_eq!(dbm.at(1, 0), Bound::LT_INFINITY);
    assert_eq!(dbm.at(0, 1), Bound::le(-2).unwrap());
    // x1 - x2 stays pinned through delay
    assert_eq!(dbm.at(1, 2), Bound::le(2).unwrap());
}

#[test]
fn intersection_is_entrywise_min_then_tight() {
    let mut a = Dbm::universal_positive(3);
    a.constrain(1, 0, Cmp::Lt, 5).unwrap();
    let mut b = Dbm::universal_positive(3);
    b.constrain(0, 1, Cmp::Le, -2).unwrap();
    let (out, status) = Dbm::intersection(&a, &b).unwrap();
    assert_eq!(status, ZoneStatus::NonEmpty);
    assert!(out.is_tight());
    assert_eq!(out.at(1, 0), Bound::lt(5).unwrap());
    assert_eq!(out.at(0, 1), Bound::le(-2).unwrap());
}

#[test]
fn intersection_of_disjoint_zones_is_empty() {
    // 0 <= x1 < 5, 2 <= x2 <= 3, x2 - x1 > 4 has no solution over
    // positives
    let mut a = Dbm::universal_positive(3);
    a.constrain(1, 0, Cmp::Lt, 5).unwrap();
    a.constrain(0, 2, Cmp::Le, -2).unwrap();
    a.constrain(2, 0, Cmp::Le, 3).unwrap();
    let mut b = Dbm::universal_positive(3);
    b.constrain(1, 2, Cmp::Lt, -4).unwrap();
    let (out, status) = Dbm::intersection(&a, &b).unwrap();
    assert_eq!(status, ZoneStatus::Empty);
    assert!(out.is_empty());
}

#[test]
fn emptiness_sentinel_is_on_the_origin_entry() {
    let mut dbm = Dbm::universal_positive(2);
    dbm.constrain(1, 0, Cmp::Lt, 3).unwrap();
    dbm.constrain(0, 1, Cmp::Le, -3).unwrap();
    assert!(dbm.is_empty());
    assert!(dbm.at(0, 0) < Bound::LE_ZERO);
}

#[test]
fn unsatisfiable_marks_the_diagonal() {
    let dbm = Dbm::unsatisfiable(3);
    assert!(dbm.is_empty());
    assert_eq!(dbm.at(1, 1), Bound::LE_MINUS_ONE);
}

#[test]
fn inclusion_is_entrywise_on_tight_matrices() {
    let mut small = Dbm::universal_positive(3);
    small.constrain(1, 0, Cmp::Le, 2).unwrap();
    let big = Dbm::universal_positive(3);
    assert!(small.is_le(&big));
    assert!(!big.is_le(&small));
    assert!(small.is_le(&small));
}

#[test]
fn open_down_reaches_time_predecessors() {
    let mut dbm = Dbm::universal_positive(3);
    dbm.constrain(1, 0, Cmp::Le, 5).unwrap();
    dbm.constrain(0, 1, Cmp::Le, -5).unwrap();
    dbm.constrain(2, 0, Cmp::Le, 7).unwrap();
    dbm.constrain(0, 2, Cmp::Le, -7).unwrap();
    dbm.open_down().unwrap();
    assert!(dbm.is_tight());
    assert_eq!(dbm.at(0, 1), Bound::LE_ZERO);
    // x2 - x1 = 2 keeps x2 >= 2
    assert_eq!(dbm.at(0, 2), Bound::le(-2).unwrap());
}

#[test]
fn free_clock_forgets_everything_but_positivity() {
    let mut dbm = Dbm::zero(3);
    dbm.free_clock(1);
    assert!(dbm.is_tight());
    assert_eq!(dbm.at(1, 0), Bound::LT_INFINITY);
    assert_eq!(dbm.at(0, 1), Bound::LE_ZERO);
    assert_eq!(dbm.at(2, 1), Bound::LE_ZERO);
}

#[test]
fn unreset_is_the_inverse_image_of_reset() {
    // after x1 := 0 the zone is {x1 = 0, x2 = 3}; its pre-image frees x1
    let mut dbm = Dbm::universal_positive(3);
    dbm.constrain(1, 0, Cmp::Le, 0).unwrap();
    dbm.constrain(2, 0, Cmp::Le, 3).unwrap();
    dbm.constrain(0, 2, Cmp::Le, -3).unwrap();
    assert_eq!(dbm.unreset_to_zero(1).unwrap(), ZoneStatus::NonEmpty);
    assert!(dbm.is_tight());
    assert_eq!(dbm.at(1, 0), Bound::LT_INFINITY);
    assert_eq!(dbm.at(2, 0), Bound::le(3).unwrap());
}

#[test]
fn scale_multiplies_finite_bounds() {
    let mut dbm = Dbm::universal_positive(2);
    dbm.constrain(1, 0, Cmp::Lt, 3).unwrap();
    dbm.scale(4).unwrap();
    assert_eq!(dbm.at(1, 0), Bound::lt(12).unwrap());
    assert_eq!(dbm.at(0, 1), Bound::LE_ZERO);
}

#[test]
fn lexical_cmp_orders_by_entries() {
    let a = Dbm::zero(2);
    let b = Dbm::universal(2);
    assert_eq!(a.lexical_cmp(&b), std::cmp::Ordering::Less);
    assert_eq!(a.lexical_cmp(&a), std::cmp::Ordering::Equal);
}
