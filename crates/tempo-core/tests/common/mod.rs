// SPDX-License-Identifier: Apache-2.0
//! Shared model builders for the integration suites.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use tempo_core::bound::Cmp;
use tempo_core::model::{
    ActionDecl, ClockDecl, ConstraintDecl, EdgeDecl, EventDecl, LocationDecl, ProcessDecl,
    SyncConstraintDecl, SyncDecl, SystemDecl,
};

pub fn event(name: &str) -> EventDecl {
    EventDecl {
        name: name.to_owned(),
    }
}

pub fn clock(name: &str) -> ClockDecl {
    ClockDecl {
        name: name.to_owned(),
        size: 1,
    }
}

pub fn process(name: &str) -> ProcessDecl {
    ProcessDecl {
        name: name.to_owned(),
    }
}

pub fn location(process: &str, name: &str) -> LocationDecl {
    LocationDecl {
        process: process.to_owned(),
        name: name.to_owned(),
        ..Default::default()
    }
}

pub fn initial(process: &str, name: &str) -> LocationDecl {
    LocationDecl {
        initial: true,
        ..location(process, name)
    }
}

pub fn edge(process: &str, src: &str, tgt: &str, event: &str) -> EdgeDecl {
    EdgeDecl {
        process: process.to_owned(),
        src: src.to_owned(),
        tgt: tgt.to_owned(),
        event: event.to_owned(),
        guard: Vec::new(),
        int_guard: Vec::new(),
        actions: Vec::new(),
    }
}

/// `clock >= value`
pub fn ge(clock: &str, value: i64) -> ConstraintDecl {
    ConstraintDecl {
        x: None,
        y: Some(clock.to_owned()),
        cmp: Cmp::Le,
        value: -value,
    }
}

/// `clock <= value`
pub fn le(clock: &str, value: i64) -> ConstraintDecl {
    ConstraintDecl {
        x: Some(clock.to_owned()),
        y: None,
        cmp: Cmp::Le,
        value,
    }
}

pub fn reset(clock: &str) -> ActionDecl {
    ActionDecl::ResetClock {
        clock: clock.to_owned(),
    }
}

pub fn sync(parts: &[(&str, &str)]) -> SyncDecl {
    SyncDecl {
        constraints: parts
            .iter()
            .map(|(p, e)| SyncConstraintDecl {
                process: (*p).to_owned(),
                event: (*e).to_owned(),
                weak: false,
            })
            .collect(),
    }
}

/// Two processes synchronizing on `a`; `P1` needs `x >= 2` and reaches a
/// location labeled `goal`.
pub fn scenario_sync_reach() -> SystemDecl {
    let mut guarded = edge("P1", "l0", "l1", "a");
    guarded.guard.push(ge("x", 2));
    SystemDecl {
        name: "sync-reach".to_owned(),
        events: vec![event("a")],
        clocks: vec![clock("x")],
        intvars: vec![],
        processes: vec![process("P1"), process("P2")],
        locations: vec![
            initial("P1", "l0"),
            LocationDecl {
                labels: vec!["goal".to_owned()],
                ..location("P1", "l1")
            },
            initial("P2", "m0"),
            location("P2", "m1"),
        ],
        edges: vec![guarded, edge("P2", "m0", "m1", "a")],
        syncs: vec![sync(&[("P1", "a"), ("P2", "a")])],
    }
}

/// One process whose invariant `x <= 1` blocks the guard `x >= 2`.
pub fn scenario_invariant_blocks() -> SystemDecl {
    let mut guarded = edge("P", "l0", "l1", "a");
    guarded.guard.push(ge("x", 2));
    SystemDecl {
        name: "blocked".to_owned(),
        events: vec![event("a")],
        clocks: vec![clock("x")],
        intvars: vec![],
        processes: vec![process("P")],
        locations: vec![
            LocationDecl {
                invariant: vec![le("x", 1)],
                ..initial("P", "l0")
            },
            LocationDecl {
                labels: vec!["bad".to_owned()],
                ..location("P", "l1")
            },
        ],
        edges: vec![guarded],
        syncs: vec![],
    }
}

/// One location with a resetting self-loop and a plain self-loop; without
/// clock bounds, covering collapses everything onto `x >= 0`.
pub fn scenario_cover_loop() -> SystemDecl {
    let mut resetting = edge("P", "l0", "l0", "a");
    resetting.actions.push(reset("x"));
    SystemDecl {
        name: "loop".to_owned(),
        events: vec![event("a"), event("b")],
        clocks: vec![clock("x")],
        intvars: vec![],
        processes: vec![process("P")],
        locations: vec![LocationDecl {
            labels: vec!["loop".to_owned()],
            ..initial("P", "l0")
        }],
        edges: vec![resetting, edge("P", "l0", "l0", "b")],
        syncs: vec![],
    }
}

/// `P1` starts committed with an `a` edge; `P2` has an independent `b`
/// edge. The committed rule must delay `b` until `P1` has moved.
pub fn scenario_committed_priority() -> SystemDecl {
    SystemDecl {
        name: "committed".to_owned(),
        events: vec![event("a"), event("b")],
        clocks: vec![],
        intvars: vec![],
        processes: vec![process("P1"), process("P2")],
        locations: vec![
            LocationDecl {
                committed: true,
                ..initial("P1", "l0")
            },
            location("P1", "l1"),
            initial("P2", "m0"),
            location("P2", "m1"),
        ],
        edges: vec![edge("P1", "l0", "l1", "a"), edge("P2", "m0", "m1", "b")],
        syncs: vec![],
    }
}

/// One clock read by both processes; the offset decomposition must refuse
/// this system.
pub fn scenario_shared_clock() -> SystemDecl {
    let mut e1 = edge("P1", "l0", "l0", "a");
    e1.guard.push(ge("x", 1));
    let mut e2 = edge("P2", "m0", "m0", "b");
    e2.guard.push(ge("x", 1));
    SystemDecl {
        name: "shared".to_owned(),
        events: vec![event("a"), event("b")],
        clocks: vec![clock("x")],
        intvars: vec![],
        processes: vec![process("P1"), process("P2")],
        locations: vec![initial("P1", "l0"), initial("P2", "m0")],
        edges: vec![e1, e2],
        syncs: vec![],
    }
}
