// SPDX-License-Identifier: Apache-2.0
//! Backward zone-graph semantics: final-state seeds and predecessor steps.
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use tempo_core::model::System;
use tempo_core::ts::{StateStatus, SymbolicTs};
use tempo_core::zg::{Extrapolation, Semantics, Zg};

use common::*;

fn zg(decl: &tempo_core::model::SystemDecl) -> Zg {
    Zg::new(
        Arc::new(System::from_decl(decl).unwrap()),
        Semantics::Elapsed,
        Extrapolation::None,
    )
}

#[test]
fn final_states_seed_label_covering_vectors() {
    let mut zg = zg(&scenario_sync_reach());
    let target = zg.system().labels_from_str("goal").unwrap();
    let finals = zg.final_states(&target, StateStatus::OK).unwrap();
    // l1 paired with both of P2's locations, one integer valuation each
    assert_eq!(finals.len(), 2);
    for (status, state, _) in &finals {
        assert_eq!(*status, StateStatus::OK);
        assert!(zg.labels(state).is_superset(&target));
        assert!(state.zone.is_positive());
        assert!(!state.zone.is_empty());
    }
}

#[test]
fn final_states_respect_invariants() {
    let mut zg = zg(&scenario_invariant_blocks());
    let target = zg.system().labels_from_str("bad").unwrap();
    let finals = zg.final_states(&target, StateStatus::OK).unwrap();
    // l1 has no invariant, so the seed zone is the full positive quadrant
    assert_eq!(finals.len(), 1);
    assert!(finals[0].1.zone.is_universal_positive());
}

#[test]
fn prev_inverts_a_forward_step() {
    let mut zg = zg(&scenario_sync_reach());
    let initial = zg.initial(StateStatus::OK).unwrap();
    assert_eq!(initial.len(), 1);
    let root = Arc::clone(&initial[0].1);

    let successors = zg.next(&root, StateStatus::OK).unwrap();
    assert_eq!(successors.len(), 1);
    let (_, reached, transition) = &successors[0];

    let predecessors = zg.prev(reached, StateStatus::OK).unwrap();
    assert_eq!(predecessors.len(), 1);
    let (_, pred, back_transition) = &predecessors[0];
    assert_eq!(pred.vloc, root.vloc);
    assert_eq!(back_transition.vedge, transition.vedge);
    // the backward zone contains every valuation the forward step left
    // from: the guard x >= 2 must hold somewhere in it
    assert!(!pred.zone.is_empty());
}

#[test]
fn prev_filters_incompatible_tuples() {
    let mut zg = zg(&scenario_sync_reach());
    let initial = zg.initial(StateStatus::OK).unwrap();
    let root = Arc::clone(&initial[0].1);
    // nothing reaches the initial vector
    let predecessors = zg.prev(&root, StateStatus::OK).unwrap();
    assert!(predecessors.is_empty());
}

#[test]
fn backward_walk_from_final_reaches_the_initial_vector() {
    let mut zg = zg(&scenario_sync_reach());
    let target = zg.system().labels_from_str("goal").unwrap();
    let finals = zg.final_states(&target, StateStatus::OK).unwrap();
    let mut frontier = finals.into_iter().map(|(_, s, _)| s).collect::<Vec<_>>();
    let mut saw_initial = false;
    for _ in 0..4 {
        let mut next = Vec::new();
        for state in &frontier {
            for (_, pred, _) in zg.prev(state, StateStatus::OK).unwrap() {
                if zg.is_initial(&pred) {
                    saw_initial = true;
                }
                next.push(pred);
            }
        }
        frontier = next;
        if saw_initial {
            break;
        }
    }
    assert!(saw_initial);
}
