//! Resource liveness: which slots hold a value at each point of a routine.
//!
//! A forward dataflow problem over the control graph tracks, per resource
//! leaf, whether the slot is [`Initialized`](LivenessState::Initialized),
//! [`Finalized`](LivenessState::Finalized), not yet seen, or in
//! [`Conflict`](LivenessState::Conflict) because different incoming paths
//! disagree. Three reporting passes read the solution:
//!
//! - [`report_conflicts`]: variables whose state depends on the path taken
//! - [`check_blocks`]: finalize/initialize/use ordering inside each block
//! - [`check_routine_end`]: outputs initialized, everything else finalized
//!
//! Ordering checks are only meaningful on a conflict-free solution, so
//! [`analyze`] runs them only when no conflict was reported.

mod block_level;
mod conflict;
mod descriptor;
mod problem;
mod routine_level;
mod state;

use ara_diagnostic::DiagnosticQueue;
use ara_ir::Environment;

use crate::dataflow::{self, DataflowSolution};
use crate::declarations::Declarations;
use crate::graph::{BlockId, ControlGraph};
use crate::storage::StorageError;

pub use block_level::check_blocks;
pub use conflict::report_conflicts;
pub use descriptor::LivenessDescriptor;
pub use problem::LivenessProblem;
pub use routine_level::check_routine_end;
pub use state::{CauseSet, LivenessState};

/// Fixpoint of [`LivenessProblem`]: one descriptor per block and side.
pub type LivenessSolution = DataflowSolution<BlockId, LivenessDescriptor>;

/// Solve liveness for `graph` and run every reporting pass.
///
/// Fails only if the descriptor cannot be laid out over `env`.
pub fn analyze(
    graph: &ControlGraph<'_>,
    env: &Environment,
    declarations: &Declarations,
    queue: &mut DiagnosticQueue,
) -> Result<LivenessSolution, StorageError> {
    let problem = LivenessProblem::new(graph, env, declarations.inputs())?;
    let solution = dataflow::solve(&problem);
    tracing::debug!(
        routine = %graph.routine(),
        blocks = graph.len(),
        iterations = solution.iterations(),
        "liveness solved"
    );

    if report_conflicts(graph, &solution, declarations, queue) == 0 {
        check_blocks(graph, &solution, queue);
        check_routine_end(graph, &solution, declarations, queue);
    }
    Ok(solution)
}

#[cfg(test)]
mod tests;
