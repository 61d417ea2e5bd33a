// SPDX-License-Identifier: Apache-2.0
//! DOT rendering of covering graphs.
//!
//! Nodes are emitted in lexical order of `(vloc, intvars, zone, flags)` and
//! edges in lexical order of their endpoints and `vedge`; subsumption edges
//! are dashed and annotated `{subsumption}`.

use std::fmt::{self, Write};

use crate::graph::{CoveringGraph, EdgeKind, NodeId};
use crate::model::{ClockId, EdgeId, IntVarId, ProcessId, System};
use crate::zg::{Zg, ZgState};

fn vloc_str(system: &System, state: &ZgState) -> String {
    let mut out = String::from("<");
    for (i, &loc) in state.vloc.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&system.location(loc).name);
    }
    out.push('>');
    out
}

fn intvars_str(system: &System, state: &ZgState) -> String {
    let mut out = String::new();
    for (i, value) in state.intvars.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let name = &system.intvar(IntVarId(i as u32)).name;
        let _ = write!(out, "{name}={value}");
    }
    out
}

fn zone_str(system: &System, state: &ZgState) -> String {
    let mut out = String::from("(");
    let name = |i: usize| system.clock_name(ClockId(i as u32)).to_owned();
    let _ = state.zone.write_constraints(&mut out, &name);
    out.push(')');
    out
}

fn vedge_str(system: &System, vedge: &[Option<EdgeId>]) -> String {
    let mut out = String::from("<");
    let mut first = true;
    for (pid, e) in vedge.iter().enumerate() {
        if let Some(e) = e {
            if !first {
                out.push(',');
            }
            first = false;
            let edge = system.edge(*e);
            let process = system.process_name(ProcessId(pid as u32));
            let event = system.event_name(edge.event);
            let _ = write!(out, "{process}@{event}");
        }
    }
    out.push('>');
    out
}

fn node_key(system: &System, graph: &CoveringGraph<Zg>, n: NodeId) -> (String, String, Vec<u8>) {
    let node = graph.node(n);
    let zone_cmp: Vec<u8> = zone_str(system, &node.state).into_bytes();
    (
        vloc_str(system, &node.state),
        intvars_str(system, &node.state),
        zone_cmp,
    )
}

/// Writes the covering graph in DOT format.
pub fn dot_output<W: Write>(
    w: &mut W,
    graph: &CoveringGraph<Zg>,
    system: &System,
    name: &str,
) -> fmt::Result {
    writeln!(w, "digraph {name} {{")?;
    writeln!(w, "  node [shape=\"box\"];")?;

    let mut nodes: Vec<NodeId> = graph.nodes().collect();
    nodes.sort_by(|&a, &b| {
        let ka = node_key(system, graph, a);
        let kb = node_key(system, graph, b);
        ka.cmp(&kb).then_with(|| {
            let na = graph.node(a);
            let nb = graph.node(b);
            (na.initial, na.is_final).cmp(&(nb.initial, nb.is_final))
        })
    });
    let mut order = vec![usize::MAX; graph.node_count()];
    for (i, &n) in nodes.iter().enumerate() {
        order[n.index()] = i;
    }

    for (i, &n) in nodes.iter().enumerate() {
        let node = graph.node(n);
        writeln!(
            w,
            "  {i} [initial=\"{}\", final=\"{}\", intvars=\"{}\", vloc=\"{}\", zone=\"{}\"]",
            node.initial,
            node.is_final,
            intvars_str(system, &node.state),
            vloc_str(system, &node.state),
            zone_str(system, &node.state),
        )?;
    }

    let mut edges: Vec<crate::graph::EdgeId> = graph.edges().collect();
    edges.sort_by(|&a, &b| {
        let key = |e: crate::graph::EdgeId| {
            let label = match graph.edge_kind(e) {
                EdgeKind::Actual(t) => vedge_str(system, &t.vedge),
                EdgeKind::Subsumption => String::new(),
            };
            (
                order[graph.edge_src(e).index()],
                order[graph.edge_tgt(e).index()],
                label,
            )
        };
        let (sa, ta, la) = key(a);
        let (sb, tb, lb) = key(b);
        (sa, ta, la).cmp(&(sb, tb, lb))
    });

    for e in edges {
        let src = order[graph.edge_src(e).index()];
        let tgt = order[graph.edge_tgt(e).index()];
        match graph.edge_kind(e) {
            EdgeKind::Actual(t) => {
                writeln!(w, "  {src} -> {tgt} [vedge=\"{}\"]", vedge_str(system, &t.vedge))?;
            }
            EdgeKind::Subsumption => {
                writeln!(
                    w,
                    "  {src} -> {tgt} [style=\"dashed\", label=\"{{subsumption}}\"]"
                )?;
            }
        }
    }

    writeln!(w, "}}")
}
