// SPDX-License-Identifier: Apache-2.0
//! Construction of a [`System`] from its declaration.

use fixedbitset::FixedBitSet;
use rustc_hash::FxHashMap;

use super::decl::{ActionDecl, ConstraintDecl, IntGuardDecl, SystemDecl};
use super::expr::{Action, ClockConstraint, Guard, IntExpr, IntGuard};
use super::{
    ClockId, Edge, EdgeId, EventId, IntVar, IntVarId, Location, LocationId, ModelError, ProcessId,
    SyncConstraint, SyncStrength, Synchronization, System, VariableAccessMap, ZERO_CLOCK,
};

/// Name → id index with duplicate detection.
struct NameIndex {
    kind: &'static str,
    map: FxHashMap<String, u32>,
}

impl NameIndex {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            map: FxHashMap::default(),
        }
    }

    fn insert(&mut self, name: &str) -> Result<u32, ModelError> {
        let id = self.map.len() as u32;
        if self.map.insert(name.to_owned(), id).is_some() {
            return Err(ModelError::Duplicate {
                kind: self.kind,
                name: name.to_owned(),
            });
        }
        Ok(id)
    }

    fn get(&self, name: &str) -> Result<u32, ModelError> {
        self.map.get(name).copied().ok_or_else(|| ModelError::Unknown {
            kind: self.kind,
            name: name.to_owned(),
        })
    }
}

/// Flattens an array declaration into per-element names.
fn flatten(name: &str, size: u32) -> Result<Vec<String>, ModelError> {
    if size == 0 {
        return Err(ModelError::NonPositiveSize(name.to_owned()));
    }
    if size == 1 {
        Ok(vec![name.to_owned()])
    } else {
        Ok((0..size).map(|i| format!("{name}[{i}]")).collect())
    }
}

impl System {
    /// Builds and validates a system from its declaration.
    ///
    /// # Errors
    /// Any malformed-input condition: duplicate or unknown identifiers,
    /// non-positive array sizes, empty or escaped integer domains, processes
    /// without an initial location, cross-process edges and degenerate
    /// synchronizations.
    pub fn from_decl(decl: &SystemDecl) -> Result<Self, ModelError> {
        let mut process_index = NameIndex::new("process");
        for p in &decl.processes {
            process_index.insert(&p.name)?;
        }
        let processes: Vec<String> = decl.processes.iter().map(|p| p.name.clone()).collect();

        let mut event_index = NameIndex::new("event");
        for e in &decl.events {
            event_index.insert(&e.name)?;
        }
        let events: Vec<String> = decl.events.iter().map(|e| e.name.clone()).collect();

        let mut clock_index = NameIndex::new("clock");
        clock_index.insert("0")?; // reserved zero clock
        let mut clocks = vec!["0".to_owned()];
        for c in &decl.clocks {
            for flat in flatten(&c.name, c.size)? {
                clock_index.insert(&flat)?;
                clocks.push(flat);
            }
        }

        let mut intvar_index = NameIndex::new("intvar");
        let mut intvars = Vec::new();
        for v in &decl.intvars {
            if v.min > v.max || v.init < v.min || v.init > v.max {
                return Err(ModelError::BadDomain(v.name.clone()));
            }
            for flat in flatten(&v.name, v.size)? {
                intvar_index.insert(&flat)?;
                intvars.push(IntVar {
                    name: flat,
                    min: v.min,
                    max: v.max,
                    init: v.init,
                });
            }
        }

        // Labels are declared implicitly through location attributes, in
        // order of first appearance.
        let mut label_index = NameIndex::new("label");
        let mut labels = Vec::new();
        for l in &decl.locations {
            for name in &l.labels {
                if label_index.map.get(name.as_str()).is_none() {
                    label_index.insert(name)?;
                    labels.push(name.clone());
                }
            }
        }

        let resolve_constraint = |c: &ConstraintDecl| -> Result<ClockConstraint, ModelError> {
            let x = match &c.x {
                None => ZERO_CLOCK,
                Some(name) => ClockId(clock_index.get(name)?),
            };
            let y = match &c.y {
                None => ZERO_CLOCK,
                Some(name) => ClockId(clock_index.get(name)?),
            };
            if x == y {
                return Err(ModelError::DegenerateConstraint);
            }
            Ok(ClockConstraint {
                x,
                y,
                cmp: c.cmp,
                value: c.value,
            })
        };

        let resolve_expr = |e: &IntExpr<String>| -> Result<IntExpr<IntVarId>, ModelError> {
            resolve_int_expr(e, &intvar_index)
        };

        let mut location_index = NameIndex::new("location");
        let mut locations = Vec::new();
        for l in &decl.locations {
            let pid = ProcessId(process_index.get(&l.process)?);
            location_index.insert(&l.name)?;
            let mut label_set = FixedBitSet::with_capacity(labels.len());
            for name in &l.labels {
                label_set.insert(label_index.get(name)? as usize);
            }
            let invariant = l
                .invariant
                .iter()
                .map(&resolve_constraint)
                .collect::<Result<Vec<_>, _>>()?;
            locations.push(Location {
                pid,
                name: l.name.clone(),
                initial: l.initial,
                committed: l.committed,
                urgent: l.urgent,
                labels: label_set,
                invariant,
            });
        }

        let mut edges = Vec::new();
        for e in &decl.edges {
            let pid = ProcessId(process_index.get(&e.process)?);
            let src = LocationId(location_index.get(&e.src)?);
            let tgt = LocationId(location_index.get(&e.tgt)?);
            if locations[src.index()].pid != pid || locations[tgt.index()].pid != pid {
                return Err(ModelError::CrossProcessEdge {
                    src: e.src.clone(),
                    tgt: e.tgt.clone(),
                });
            }
            let event = EventId(event_index.get(&e.event)?);
            let guard = Guard {
                clocks: e
                    .guard
                    .iter()
                    .map(&resolve_constraint)
                    .collect::<Result<Vec<_>, _>>()?,
                ints: e
                    .int_guard
                    .iter()
                    .map(|g: &IntGuardDecl| {
                        Ok(IntGuard {
                            lhs: resolve_expr(&g.lhs)?,
                            op: g.op,
                            rhs: resolve_expr(&g.rhs)?,
                        })
                    })
                    .collect::<Result<Vec<_>, ModelError>>()?,
            };
            let actions = e
                .actions
                .iter()
                .map(|a| match a {
                    ActionDecl::ResetClock { clock } => Ok(Action::ResetClock {
                        clock: ClockId(clock_index.get(clock)?),
                    }),
                    ActionDecl::SetInt { var, expr } => Ok(Action::SetInt {
                        var: IntVarId(intvar_index.get(var)?),
                        expr: resolve_expr(expr)?,
                    }),
                })
                .collect::<Result<Vec<_>, ModelError>>()?;
            edges.push(Edge {
                pid,
                src,
                tgt,
                event,
                guard,
                actions,
            });
        }

        let mut syncs = Vec::new();
        for s in &decl.syncs {
            if s.constraints.is_empty() {
                return Err(ModelError::EmptySync);
            }
            let mut constraints = Vec::new();
            for c in &s.constraints {
                let pid = ProcessId(process_index.get(&c.process)?);
                if constraints.iter().any(|sc: &SyncConstraint| sc.pid == pid) {
                    return Err(ModelError::DuplicateSyncProcess(c.process.clone()));
                }
                constraints.push(SyncConstraint {
                    pid,
                    event: EventId(event_index.get(&c.event)?),
                    strength: if c.weak {
                        SyncStrength::Weak
                    } else {
                        SyncStrength::Strong
                    },
                });
            }
            constraints.sort_by_key(|c| c.pid);
            syncs.push(Synchronization { constraints });
        }

        let mut system = Self {
            name: decl.name.clone(),
            processes,
            events,
            clocks,
            intvars,
            labels,
            locations,
            edges,
            syncs,
            locations_per_process: Vec::new(),
            initial_per_process: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            outgoing_by_event: Vec::new(),
            incoming_by_event: Vec::new(),
            committed: FixedBitSet::new(),
            urgent: FixedBitSet::new(),
            access: VariableAccessMap::new(0, 0, 0),
        };
        system.build_indices()?;
        Ok(system)
    }

    fn build_indices(&mut self) -> Result<(), ModelError> {
        let nlocs = self.locations.len();
        self.locations_per_process = vec![Vec::new(); self.processes.len()];
        self.initial_per_process = vec![Vec::new(); self.processes.len()];
        self.committed = FixedBitSet::with_capacity(nlocs);
        self.urgent = FixedBitSet::with_capacity(nlocs);
        for (i, loc) in self.locations.iter().enumerate() {
            let id = LocationId(i as u32);
            self.locations_per_process[loc.pid.index()].push(id);
            if loc.initial {
                self.initial_per_process[loc.pid.index()].push(id);
            }
            if loc.committed {
                self.committed.insert(i);
            }
            if loc.urgent {
                self.urgent.insert(i);
            }
        }
        for (pid, initials) in self.initial_per_process.iter().enumerate() {
            if initials.is_empty() {
                return Err(ModelError::NoInitialLocation(self.processes[pid].clone()));
            }
        }

        self.outgoing = vec![Vec::new(); nlocs];
        self.incoming = vec![Vec::new(); nlocs];
        self.outgoing_by_event = vec![Vec::new(); nlocs];
        self.incoming_by_event = vec![Vec::new(); nlocs];
        for (i, edge) in self.edges.iter().enumerate() {
            let id = EdgeId(i as u32);
            self.outgoing[edge.src.index()].push(id);
            self.incoming[edge.tgt.index()].push(id);
            self.outgoing_by_event[edge.src.index()].push((edge.event, id));
            self.incoming_by_event[edge.tgt.index()].push((edge.event, id));
        }

        self.access = self.compute_access();
        Ok(())
    }

    fn compute_access(&self) -> VariableAccessMap {
        let mut access =
            VariableAccessMap::new(self.clocks.len(), self.intvars.len(), self.processes.len());
        let mut vars = Vec::new();
        for loc in &self.locations {
            for c in &loc.invariant {
                access.record_clock_read(c.x, loc.pid);
                access.record_clock_read(c.y, loc.pid);
            }
        }
        for edge in &self.edges {
            for c in &edge.guard.clocks {
                access.record_clock_read(c.x, edge.pid);
                access.record_clock_read(c.y, edge.pid);
            }
            for g in &edge.guard.ints {
                vars.clear();
                g.lhs.variables(&mut vars);
                g.rhs.variables(&mut vars);
                for v in &vars {
                    access.record_int_read(**v, edge.pid);
                }
            }
            for a in &edge.actions {
                match a {
                    Action::ResetClock { clock } => access.record_clock_write(*clock, edge.pid),
                    Action::SetInt { var, expr } => {
                        access.record_int_write(*var, edge.pid);
                        vars.clear();
                        expr.variables(&mut vars);
                        for v in &vars {
                            access.record_int_read(**v, edge.pid);
                        }
                    }
                }
            }
        }
        access
    }
}

fn resolve_int_expr(
    e: &IntExpr<String>,
    index: &NameIndex,
) -> Result<IntExpr<IntVarId>, ModelError> {
    Ok(match e {
        IntExpr::Const(c) => IntExpr::Const(*c),
        IntExpr::Var(name) => IntExpr::Var(IntVarId(index.get(name)?)),
        IntExpr::Add(a, b) => IntExpr::Add(
            Box::new(resolve_int_expr(a, index)?),
            Box::new(resolve_int_expr(b, index)?),
        ),
        IntExpr::Sub(a, b) => IntExpr::Sub(
            Box::new(resolve_int_expr(a, index)?),
            Box::new(resolve_int_expr(b, index)?),
        ),
        IntExpr::Mul(a, b) => IntExpr::Mul(
            Box::new(resolve_int_expr(a, index)?),
            Box::new(resolve_int_expr(b, index)?),
        ),
        IntExpr::Neg(a) => IntExpr::Neg(Box::new(resolve_int_expr(a, index)?)),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use crate::bound::Cmp;

    use super::super::decl::{
        ClockDecl, EdgeDecl, EventDecl, LocationDecl, ProcessDecl, SyncConstraintDecl, SyncDecl,
    };
    use super::*;

    fn two_process_decl() -> SystemDecl {
        SystemDecl {
            name: "demo".to_owned(),
            events: vec![EventDecl {
                name: "a".to_owned(),
            }],
            clocks: vec![ClockDecl {
                name: "x".to_owned(),
                size: 1,
            }],
            intvars: vec![],
            processes: vec![
                ProcessDecl {
                    name: "P1".to_owned(),
                },
                ProcessDecl {
                    name: "P2".to_owned(),
                },
            ],
            locations: vec![
                LocationDecl {
                    process: "P1".to_owned(),
                    name: "l0".to_owned(),
                    initial: true,
                    ..Default::default()
                },
                LocationDecl {
                    process: "P1".to_owned(),
                    name: "l1".to_owned(),
                    labels: vec!["goal".to_owned()],
                    ..Default::default()
                },
                LocationDecl {
                    process: "P2".to_owned(),
                    name: "m0".to_owned(),
                    initial: true,
                    ..Default::default()
                },
                LocationDecl {
                    process: "P2".to_owned(),
                    name: "m1".to_owned(),
                    ..Default::default()
                },
            ],
            edges: vec![
                EdgeDecl {
                    process: "P1".to_owned(),
                    src: "l0".to_owned(),
                    tgt: "l1".to_owned(),
                    event: "a".to_owned(),
                    guard: vec![ConstraintDecl {
                        x: Some("x".to_owned()),
                        y: None,
                        cmp: Cmp::Le,
                        value: 5,
                    }],
                    int_guard: vec![],
                    actions: vec![],
                },
                EdgeDecl {
                    process: "P2".to_owned(),
                    src: "m0".to_owned(),
                    tgt: "m1".to_owned(),
                    event: "a".to_owned(),
                    guard: vec![],
                    int_guard: vec![],
                    actions: vec![],
                },
            ],
            syncs: vec![SyncDecl {
                constraints: vec![
                    SyncConstraintDecl {
                        process: "P1".to_owned(),
                        event: "a".to_owned(),
                        weak: false,
                    },
                    SyncConstraintDecl {
                        process: "P2".to_owned(),
                        event: "a".to_owned(),
                        weak: false,
                    },
                ],
            }],
        }
    }

    #[test]
    fn builds_two_process_system() {
        let system = System::from_decl(&two_process_decl()).unwrap();
        assert_eq!(system.process_count(), 2);
        assert_eq!(system.clock_count(), 2);
        assert_eq!(system.label_count(), 1);
        assert_eq!(system.initial_locations(ProcessId(0)), &[LocationId(0)]);
        assert_eq!(system.outgoing_edges(LocationId(0)), &[EdgeId(0)]);
        assert_eq!(system.edge(EdgeId(0)).guard.clocks.len(), 1);
    }

    #[test]
    fn rejects_missing_initial_location() {
        let mut decl = two_process_decl();
        decl.locations[0].initial = false;
        assert!(matches!(
            System::from_decl(&decl),
            Err(ModelError::NoInitialLocation(p)) if p == "P1"
        ));
    }

    #[test]
    fn rejects_unknown_event() {
        let mut decl = two_process_decl();
        decl.edges[0].event = "b".to_owned();
        assert!(matches!(
            System::from_decl(&decl),
            Err(ModelError::Unknown { kind: "event", .. })
        ));
    }

    #[test]
    fn rejects_duplicate_location_names() {
        let mut decl = two_process_decl();
        decl.locations[2].name = "l0".to_owned();
        assert!(matches!(
            System::from_decl(&decl),
            Err(ModelError::Duplicate { kind: "location", .. })
        ));
    }

    #[test]
    fn rejects_zero_sized_clock_arrays() {
        let mut decl = two_process_decl();
        decl.clocks[0].size = 0;
        assert!(matches!(
            System::from_decl(&decl),
            Err(ModelError::NonPositiveSize(_))
        ));
    }

    #[test]
    fn access_map_records_guard_reads() {
        let system = System::from_decl(&two_process_decl()).unwrap();
        let readers = system.access().clock_readers(ClockId(1));
        assert!(readers.contains(0));
        assert!(!readers.contains(1));
        assert!(!system.access().has_shared_clock());
    }
}
