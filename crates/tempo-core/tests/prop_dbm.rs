// SPDX-License-Identifier: Apache-2.0
//! Property tests for the DBM algebra: tightening, inclusion and
//! extrapolation laws over randomly constrained zones.
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use tempo_core::bound::Cmp;
use tempo_core::dbm::{is_am_le, Dbm, ZoneStatus, UNBOUNDED};

const DIM: usize = 4;

#[derive(Debug, Clone)]
struct RandomConstraint {
    x: usize,
    y: usize,
    cmp: Cmp,
    value: i64,
}

fn constraint_strategy() -> impl Strategy<Value = RandomConstraint> {
    (0..DIM, 0..DIM, prop::bool::ANY, -10i64..=10)
        .prop_filter("distinct clocks", |(x, y, _, _)| x != y)
        .prop_map(|(x, y, le, value)| RandomConstraint {
            x,
            y,
            cmp: if le { Cmp::Le } else { Cmp::Lt },
            value,
        })
}

/// A zone built from up to eight random constraints over the positive
/// quadrant; `None` when the conjunction is empty.
fn zone_from(constraints: &[RandomConstraint]) -> Option<Dbm> {
    let mut dbm = Dbm::universal_positive(DIM);
    for c in constraints {
        if dbm.constrain(c.x, c.y, c.cmp, c.value).unwrap() == ZoneStatus::Empty {
            return None;
        }
    }
    Some(dbm)
}

fn bounds_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(
        prop_oneof![Just(UNBOUNDED), 0i64..=10],
        DIM,
    )
}

proptest! {
    #[test]
    fn tighten_is_idempotent(cs in prop::collection::vec(constraint_strategy(), 0..8)) {
        if let Some(mut zone) = zone_from(&cs) {
            prop_assert!(zone.is_tight());
            let before = zone.clone();
            prop_assert_eq!(zone.tighten().unwrap(), ZoneStatus::NonEmpty);
            prop_assert!(zone.is_equal(&before));
        }
    }

    #[test]
    fn emptiness_sentinel_is_set_whenever_constraining_empties(
        cs in prop::collection::vec(constraint_strategy(), 0..8),
    ) {
        let mut dbm = Dbm::universal_positive(DIM);
        for c in &cs {
            if dbm.constrain(c.x, c.y, c.cmp, c.value).unwrap() == ZoneStatus::Empty {
                prop_assert!(dbm.is_empty());
                return Ok(());
            }
        }
        prop_assert!(!dbm.is_empty());
    }

    #[test]
    fn extrapolation_grows_and_is_idempotent(
        cs in prop::collection::vec(constraint_strategy(), 0..8),
        m in bounds_strategy(),
    ) {
        if let Some(zone) = zone_from(&cs) {
            let mut extra = zone.clone();
            extra.extra_m(&m).unwrap();
            prop_assert!(zone.is_le(&extra));
            prop_assert!(extra.is_positive());

            let mut twice = extra.clone();
            twice.extra_m(&m).unwrap();
            prop_assert!(extra.is_equal(&twice));
        }
    }

    #[test]
    fn extrapolation_is_monotone(
        cs1 in prop::collection::vec(constraint_strategy(), 0..8),
        cs2 in prop::collection::vec(constraint_strategy(), 0..4),
        m in bounds_strategy(),
    ) {
        // build nested zones by constraining the first one further
        if let Some(big) = zone_from(&cs1) {
            let mut small = big.clone();
            let mut empty = false;
            for c in &cs2 {
                if small.constrain(c.x, c.y, c.cmp, c.value).unwrap() == ZoneStatus::Empty {
                    empty = true;
                    break;
                }
            }
            if !empty {
                let mut big_extra = big.clone();
                big_extra.extra_m(&m).unwrap();
                let mut small_extra = small.clone();
                small_extra.extra_m(&m).unwrap();
                prop_assert!(small_extra.is_le(&big_extra));
            }
        }
    }

    #[test]
    fn extrapolated_zone_is_am_included_in_the_original(
        cs in prop::collection::vec(constraint_strategy(), 0..8),
        m in bounds_strategy(),
    ) {
        if let Some(zone) = zone_from(&cs) {
            let mut extra = zone.clone();
            extra.extra_m(&m).unwrap();
            prop_assert!(is_am_le(&zone, &zone, &m));
            prop_assert!(is_am_le(&extra, &zone, &m));
        }
    }

    #[test]
    fn plus_variants_dominate_their_base_operators(
        cs in prop::collection::vec(constraint_strategy(), 0..8),
        m in bounds_strategy(),
    ) {
        if let Some(zone) = zone_from(&cs) {
            let mut base = zone.clone();
            base.extra_m(&m).unwrap();
            let mut plus = zone.clone();
            plus.extra_m_plus(&m).unwrap();
            prop_assert!(base.is_le(&plus));
        }
    }

    #[test]
    fn delay_then_reset_stays_tight(
        cs in prop::collection::vec(constraint_strategy(), 0..8),
        clock in 1..DIM,
    ) {
        if let Some(mut zone) = zone_from(&cs) {
            zone.open_up();
            prop_assert!(zone.is_tight());
            zone.reset_to_zero(clock).unwrap();
            prop_assert!(zone.is_tight());
            prop_assert!(!zone.is_empty());
        }
    }
}
