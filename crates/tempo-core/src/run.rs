// SPDX-License-Identifier: Apache-2.0
//! End-to-end covering reachability entry point.

use std::sync::Arc;

use thiserror::Error;

use crate::bound::BoundError;
use crate::covreach::{covreach, CoveringPolicy, SearchOrder, Stats};
use crate::graph::CoveringGraph;
use crate::model::{ModelError, System, SystemDecl};
use crate::path::{concrete_run, symbolic_counter_example, CounterExample, PathError};
use crate::zg::{Extrapolation, Semantics, Zg};

/// Errors of a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The model declaration was rejected.
    #[error(transparent)]
    Model(#[from] ModelError),
    /// Bound arithmetic overflowed.
    #[error(transparent)]
    Bound(#[from] BoundError),
}

/// Configuration of a covering reachability run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Waiting-store policy.
    pub search_order: SearchOrder,
    /// Covering policy.
    pub covering: CoveringPolicy,
    /// Zone semantics.
    pub semantics: Semantics,
    /// Extrapolation operator.
    pub extrapolation: Extrapolation,
    /// Sizing hint for the node table (buckets reserved up front).
    pub table_size: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            search_order: SearchOrder::Bfs,
            covering: CoveringPolicy::Full,
            semantics: Semantics::Elapsed,
            extrapolation: Extrapolation::LuPlus { local: true },
            table_size: 65_536,
        }
    }
}

/// The state space left behind by a run, for inspection, dumping and
/// counter-example extraction.
#[derive(Debug)]
pub struct StateSpace {
    /// The zone graph the run explored.
    pub zg: Zg,
    /// The covering graph built by the run.
    pub graph: CoveringGraph<Zg>,
}

impl StateSpace {
    /// Extracts a counter example when the run reached the accepting
    /// labels: the symbolic path always, plus the concrete lift when it
    /// stays within the scale budget.
    pub fn counter_example(&self) -> Result<Option<CounterExample>, PathError> {
        let system = Arc::clone(self.zg.system());
        let Some(symbolic) =
            symbolic_counter_example(&self.graph, system, self.zg.semantics())?
        else {
            return Ok(None);
        };
        let concrete = match concrete_run(&self.zg, &symbolic) {
            Ok(c) => Some(c),
            Err(PathError::ScaleOverflow) => None,
            Err(e) => return Err(e),
        };
        Ok(Some(CounterExample { symbolic, concrete }))
    }
}

/// Builds the system of `decl` and runs covering reachability for the
/// comma-separated accepting `labels`.
///
/// An empty label set makes the run exhaust the reachable state space and
/// report `reachable = false`.
pub fn run(
    decl: &SystemDecl,
    labels: &str,
    config: &RunConfig,
) -> Result<(Stats, StateSpace), RunError> {
    let system = Arc::new(System::from_decl(decl)?);
    run_system(system, labels, config)
}

/// [`run`] over an already-built system.
pub fn run_system(
    system: Arc<System>,
    labels: &str,
    config: &RunConfig,
) -> Result<(Stats, StateSpace), RunError> {
    let target = system.labels_from_str(labels)?;
    let mut zg = Zg::new(system, config.semantics, config.extrapolation);
    let mut graph = CoveringGraph::with_capacity(config.covering, config.table_size);
    let stats = covreach(&mut zg, &mut graph, &target, config.search_order)?;
    Ok((stats, StateSpace { zg, graph }))
}
