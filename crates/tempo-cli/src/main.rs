// SPDX-License-Identifier: Apache-2.0
//! tempo: covering reachability checker for networks of timed automata.
//!
//! `tempo check FILE` parses and validates a model; `tempo reach FILE -l
//! LABELS` runs covering reachability and reports whether a configuration
//! carrying the labels is reachable, optionally dumping the covering graph
//! (DOT) and a counter-example path.
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod parser;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::Table;

use tempo_core::covreach::{CoveringPolicy, SearchOrder};
use tempo_core::dot::dot_output;
use tempo_core::model::{ClockId, IntVarId, ProcessId, System};
use tempo_core::path::{ClockValue, ConcretePath, SymbolicPath};
use tempo_core::run::{run_system, RunConfig, StateSpace};
use tempo_core::zg::{Extrapolation, Semantics, ZgState};

/// Process exit codes, one per error family.
mod exit {
    /// I/O failure reading the model or writing an output file.
    pub const IO: u8 = 1;
    /// The model text does not parse.
    pub const PARSE: u8 = 2;
    /// The model is malformed (unknown references, bad domains, …).
    pub const MODEL: u8 = 3;
    /// The requested engine configuration is unsupported.
    pub const UNSUPPORTED: u8 = 4;
    /// Numeric overflow during exploration.
    pub const OVERFLOW: u8 = 5;
}

#[derive(Parser, Debug)]
#[clap(name = "tempo", version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and validate a model, printing a summary.
    Check {
        /// Model file.
        file: PathBuf,
    },
    /// Run covering reachability for a set of accepting labels.
    Reach {
        /// Model file.
        file: PathBuf,
        /// Comma-separated accepting labels; empty explores the full state
        /// space.
        #[clap(short, long, default_value = "")]
        labels: String,
        /// Search order.
        #[clap(long, value_enum, default_value_t = OrderArg::Bfs)]
        order: OrderArg,
        /// Covering policy.
        #[clap(long, value_enum, default_value_t = CoveringArg::Full)]
        covering: CoveringArg,
        /// Extrapolation operator.
        #[clap(long, value_enum, default_value_t = ExtraArg::LuPlus)]
        extra: ExtraArg,
        /// Use the global clock-bound tables instead of per-location ones.
        #[clap(long)]
        global_bounds: bool,
        /// Zone semantics.
        #[clap(long, value_enum, default_value_t = SemanticsArg::Elapsed)]
        semantics: SemanticsArg,
        /// Write the covering graph in DOT format to this file.
        #[clap(long)]
        dot: Option<PathBuf>,
        /// Print a counter example when the labels are reachable.
        #[clap(long, value_enum)]
        cex: Option<CexArg>,
        /// Print statistics as JSON instead of a table.
        #[clap(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OrderArg {
    Bfs,
    Dfs,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CoveringArg {
    Full,
    Leaf,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ExtraArg {
    None,
    M,
    #[value(name = "m+")]
    MPlus,
    Lu,
    #[value(name = "lu+")]
    LuPlus,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SemanticsArg {
    Elapsed,
    NonElapsed,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CexArg {
    Symbolic,
    Concrete,
}

fn main() -> ExitCode {
    match dispatch() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("tempo: {e:#}");
            ExitCode::from(classify(&e))
        }
    }
}

/// Maps an error chain onto the documented exit codes.
fn classify(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.is::<std::io::Error>() {
            return exit::IO;
        }
        if cause.is::<parser::ParseError>() {
            return exit::PARSE;
        }
        if cause.is::<tempo_core::model::ModelError>() {
            return exit::MODEL;
        }
        if cause.is::<tempo_core::refmap::RefMapError>() {
            return exit::UNSUPPORTED;
        }
        if cause.is::<tempo_core::bound::BoundError>() {
            return exit::OVERFLOW;
        }
        if let Some(run) = cause.downcast_ref::<tempo_core::run::RunError>() {
            return match run {
                tempo_core::run::RunError::Model(_) => exit::MODEL,
                tempo_core::run::RunError::Bound(_) => exit::OVERFLOW,
            };
        }
    }
    exit::IO
}

fn dispatch() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Check { file } => check(&file),
        Command::Reach {
            file,
            labels,
            order,
            covering,
            extra,
            global_bounds,
            semantics,
            dot,
            cex,
            json,
        } => reach(
            &file,
            &labels,
            order,
            covering,
            extra,
            global_bounds,
            semantics,
            dot.as_deref(),
            cex,
            json,
        ),
    }
}

fn load_system(file: &Path) -> anyhow::Result<Arc<System>> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading model file `{}`", file.display()))?;
    let decl = parser::parse_model(&text).context("parsing model")?;
    let system = System::from_decl(&decl).context("validating model")?;
    Ok(Arc::new(system))
}

fn check(file: &Path) -> anyhow::Result<()> {
    let system = load_system(file)?;
    println!(
        "{}: {} processes, {} locations, {} edges, {} clocks, {} intvars, {} events, {} syncs, {} labels",
        if system.name().is_empty() {
            "model"
        } else {
            system.name()
        },
        system.process_count(),
        system.location_count(),
        system.edge_count(),
        system.clock_count() - 1,
        system.intvar_count(),
        system.event_count(),
        system.syncs().count(),
        system.label_count(),
    );
    Ok(())
}

#[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
fn reach(
    file: &Path,
    labels: &str,
    order: OrderArg,
    covering: CoveringArg,
    extra: ExtraArg,
    global_bounds: bool,
    semantics: SemanticsArg,
    dot: Option<&Path>,
    cex: Option<CexArg>,
    json: bool,
) -> anyhow::Result<()> {
    let system = load_system(file)?;
    let local = !global_bounds;
    let config = RunConfig {
        search_order: match order {
            OrderArg::Bfs => SearchOrder::Bfs,
            OrderArg::Dfs => SearchOrder::Dfs,
        },
        covering: match covering {
            CoveringArg::Full => CoveringPolicy::Full,
            CoveringArg::Leaf => CoveringPolicy::LeafNodes,
        },
        semantics: match semantics {
            SemanticsArg::Elapsed => Semantics::Elapsed,
            SemanticsArg::NonElapsed => Semantics::NonElapsed,
        },
        extrapolation: match extra {
            ExtraArg::None => Extrapolation::None,
            ExtraArg::M => Extrapolation::M { local },
            ExtraArg::MPlus => Extrapolation::MPlus { local },
            ExtraArg::Lu => Extrapolation::Lu { local },
            ExtraArg::LuPlus => Extrapolation::LuPlus { local },
        },
        ..RunConfig::default()
    };

    let (stats, space) = run_system(Arc::clone(&system), labels, &config)?;

    if json {
        let out = serde_json::json!({
            "reachable": stats.reachable,
            "visited": stats.visited,
            "stored": stats.stored,
            "covered": stats.covered,
            "actual_edges": stats.actual_edges,
            "subsumption_edges": stats.subsumption_edges,
            "elapsed_ms": stats.elapsed().as_millis() as u64,
        });
        println!("{out}");
    } else {
        let mut table = Table::new();
        table.set_header(["metric", "value"]);
        table.add_row(["reachable", &stats.reachable.to_string()]);
        table.add_row(["visited states", &stats.visited.to_string()]);
        table.add_row(["stored nodes", &stats.stored.to_string()]);
        table.add_row(["covered nodes", &stats.covered.to_string()]);
        table.add_row(["actual edges", &stats.actual_edges.to_string()]);
        table.add_row(["subsumption edges", &stats.subsumption_edges.to_string()]);
        table.add_row(["elapsed", &format!("{:?}", stats.elapsed())]);
        println!("{table}");
    }

    if let Some(path) = dot {
        let mut out = String::new();
        dot_output(&mut out, &space.graph, &system, "covreach")
            .context("rendering DOT output")?;
        std::fs::write(path, out)
            .with_context(|| format!("writing DOT file `{}`", path.display()))?;
    }

    if let Some(kind) = cex {
        print_counter_example(&system, &space, stats.reachable, kind)?;
    }
    Ok(())
}

fn print_counter_example(
    system: &System,
    space: &StateSpace,
    reachable: bool,
    kind: CexArg,
) -> anyhow::Result<()> {
    if !reachable {
        println!("no counter example: labels are not reachable");
        return Ok(());
    }
    let Some(cex) = space.counter_example().context("extracting counter example")? else {
        println!("no counter example over actual edges");
        return Ok(());
    };
    match kind {
        CexArg::Symbolic => print_symbolic(system, &cex.symbolic, None),
        CexArg::Concrete => match &cex.concrete {
            Some(concrete) => print_symbolic(system, &cex.symbolic, Some(concrete)),
            None => {
                println!("concrete lift exceeded the scale budget; symbolic path follows");
                print_symbolic(system, &cex.symbolic, None);
            }
        },
    }
    Ok(())
}

fn print_symbolic(system: &System, path: &SymbolicPath, concrete: Option<&ConcretePath>) {
    for (i, state) in path.states.iter().enumerate() {
        if i > 0 {
            let t = &path.transitions[i - 1];
            let mut vedge = String::from("<");
            let mut first = true;
            for (pid, e) in t.vedge.iter().enumerate() {
                if let Some(e) = e {
                    if !first {
                        vedge.push(',');
                    }
                    first = false;
                    let edge = system.edge(*e);
                    let _ = write!(
                        vedge,
                        "{}@{}",
                        system.process_name(ProcessId(pid as u32)),
                        system.event_name(edge.event)
                    );
                }
            }
            vedge.push('>');
            println!("  -- {vedge} -->");
        }
        println!("{}", state_str(system, state, concrete.map(|c| &c.valuations[i])));
    }
}

fn state_str(system: &System, state: &ZgState, valuation: Option<&Vec<ClockValue>>) -> String {
    let mut out = String::from("(<");
    for (i, &loc) in state.vloc.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&system.location(loc).name);
    }
    out.push('>');
    for (i, value) in state.intvars.iter().enumerate() {
        let name = &system.intvar(IntVarId(i as u32)).name;
        let _ = write!(out, ", {name}={value}");
    }
    match valuation {
        Some(values) => {
            for (i, v) in values.iter().enumerate() {
                let name = system.clock_name(ClockId(i as u32 + 1));
                if v.den == 1 {
                    let _ = write!(out, ", {name}={}", v.num);
                } else {
                    let _ = write!(out, ", {name}={}/{}", v.num, v.den);
                }
            }
        }
        None => {
            let mut zone = String::new();
            let name =
                |i: usize| system.clock_name(ClockId(i as u32)).to_owned();
            let _ = state.zone.write_constraints(&mut zone, &name);
            let _ = write!(out, ", {zone}");
        }
    }
    out.push(')');
    out
}
