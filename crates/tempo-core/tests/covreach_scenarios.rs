// SPDX-License-Identifier: Apache-2.0
//! End-to-end covering reachability scenarios.
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use tempo_core::covreach::{CoveringPolicy, SearchOrder};
use tempo_core::model::System;
use tempo_core::refmap::RefMapError;
use tempo_core::refzg::RefZg;
use tempo_core::run::{run, RunConfig};
use tempo_core::zg::{Extrapolation, Semantics};

use common::*;

fn bfs_full() -> RunConfig {
    RunConfig {
        search_order: SearchOrder::Bfs,
        covering: CoveringPolicy::Full,
        ..RunConfig::default()
    }
}

#[test]
fn reachability_through_synchronization() {
    let (stats, space) = run(&scenario_sync_reach(), "goal", &bfs_full()).unwrap();
    assert!(stats.reachable);
    assert_eq!(stats.visited, 2);
    assert_eq!(space.graph.nodes().count(), 2);
    // every stored state is found again through the hash-cons lookup
    for n in space.graph.nodes() {
        let state = &space.graph.node(n).state;
        assert_eq!(space.graph.find(&space.zg, state), Some(n));
    }
}

#[test]
fn invariant_makes_labels_unreachable() {
    for order in [SearchOrder::Bfs, SearchOrder::Dfs] {
        let config = RunConfig {
            search_order: order,
            ..bfs_full()
        };
        let (stats, _) = run(&scenario_invariant_blocks(), "bad", &config).unwrap();
        assert!(!stats.reachable);
        assert_eq!(stats.visited, 1);
    }
}

#[test]
fn covering_collapses_the_reset_loop() {
    // exhaust the state space without extrapolation: the resetting
    // self-loop lands in x = 0, covered by the stored zone x >= 0
    let config = RunConfig {
        extrapolation: Extrapolation::None,
        ..bfs_full()
    };
    let (stats, space) = run(&scenario_cover_loop(), "", &config).unwrap();
    assert!(!stats.reachable);
    assert_eq!(stats.visited, 1);
    assert_eq!(space.graph.nodes().count(), 1);
    assert!(stats.subsumption_edges >= 1);
}

#[test]
fn empty_labels_explore_everything() {
    let (stats, space) = run(&scenario_sync_reach(), "", &bfs_full()).unwrap();
    assert!(!stats.reachable);
    assert_eq!(space.graph.nodes().count(), 2);
    assert_eq!(stats.visited, 2);
}

#[test]
fn committed_location_forces_priority() {
    let (stats, space) = run(&scenario_committed_priority(), "", &bfs_full()).unwrap();
    assert!(!stats.reachable);
    // l0m0 -> l1m0 -> l1m1, never l0m1
    assert_eq!(space.graph.nodes().count(), 3);
    assert_eq!(stats.visited, 3);
}

#[test]
fn leaf_covering_never_detaches_stored_nodes() {
    let config = RunConfig {
        covering: CoveringPolicy::LeafNodes,
        ..bfs_full()
    };
    let (stats, _) = run(&scenario_cover_loop(), "", &config).unwrap();
    assert_eq!(stats.covered, 0);
}

#[test]
fn full_covering_keeps_no_comparable_pair() {
    let (_, space) = run(&scenario_cover_loop(), "", &bfs_full()).unwrap();
    let nodes: Vec<_> = space.graph.nodes().collect();
    for &a in &nodes {
        for &b in &nodes {
            if a == b {
                continue;
            }
            let sa = &space.graph.node(a).state;
            let sb = &space.graph.node(b).state;
            let comparable = sa.vloc == sb.vloc
                && sa.intvars == sb.intvars
                && sa.zone.is_le(&sb.zone);
            assert!(!comparable);
        }
    }
}

#[test]
fn reachable_zones_are_tight_and_positive() {
    let (_, space) = run(&scenario_sync_reach(), "", &bfs_full()).unwrap();
    for n in space.graph.nodes() {
        let state = &space.graph.node(n).state;
        assert!(!state.zone.is_empty());
        assert!(state.zone.is_tight());
        assert!(state.zone.is_positive());
    }
}

#[test]
fn dfs_and_bfs_agree_on_reachability() {
    for decl in [scenario_sync_reach(), scenario_invariant_blocks()] {
        let labels = if decl.name == "sync-reach" { "goal" } else { "bad" };
        let bfs = run(&decl, labels, &bfs_full()).unwrap().0.reachable;
        let dfs = run(
            &decl,
            labels,
            &RunConfig {
                search_order: SearchOrder::Dfs,
                ..bfs_full()
            },
        )
        .unwrap()
        .0
        .reachable;
        assert_eq!(bfs, dfs);
    }
}

#[test]
fn extrapolation_choices_agree_on_reachability() {
    for extrapolation in [
        Extrapolation::None,
        Extrapolation::M { local: false },
        Extrapolation::MPlus { local: true },
        Extrapolation::Lu { local: false },
        Extrapolation::LuPlus { local: true },
    ] {
        let config = RunConfig {
            extrapolation,
            ..bfs_full()
        };
        let (stats, _) = run(&scenario_sync_reach(), "goal", &config).unwrap();
        assert!(stats.reachable);
        let (stats, _) = run(&scenario_invariant_blocks(), "bad", &config).unwrap();
        assert!(!stats.reachable);
    }
}

#[test]
fn offset_decomposition_rejects_shared_clocks() {
    let system = Arc::new(System::from_decl(&scenario_shared_clock()).unwrap());
    let err = RefZg::new(system, Semantics::Elapsed, Extrapolation::None, true).unwrap_err();
    assert!(matches!(err, RefMapError::SharedClock(name) if name == "x"));
}

#[test]
fn offset_engine_explores_per_process_clocks() {
    use tempo_core::graph::CoveringGraph;

    // same model as the sync scenario, but x is only touched by P1, so the
    // decomposition applies and reaches the same verdict
    let system = Arc::new(System::from_decl(&scenario_sync_reach()).unwrap());
    let mut refzg =
        RefZg::new(Arc::clone(&system), Semantics::Elapsed, Extrapolation::None, true).unwrap();
    let target = system.labels_from_str("goal").unwrap();
    let mut graph = CoveringGraph::new(CoveringPolicy::Full);
    let stats =
        tempo_core::covreach::covreach(&mut refzg, &mut graph, &target, SearchOrder::Bfs).unwrap();
    assert!(stats.reachable);
}

#[test]
fn unknown_labels_are_rejected() {
    let err = run(&scenario_sync_reach(), "nope", &bfs_full()).unwrap_err();
    assert!(matches!(
        err,
        tempo_core::run::RunError::Model(tempo_core::model::ModelError::Unknown { .. })
    ));
}
