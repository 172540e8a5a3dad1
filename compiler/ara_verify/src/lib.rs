//! Reversibility verification for Ara routines.
//!
//! Every Ara routine can be called forward or uncalled backward, which only
//! works if every path through it creates and consumes resources in
//! balance. This crate checks that statically, one routine at a time:
//!
//! ```text
//! declarations ──► graph ──► liveness (conflicts, blocks, routine end)
//!       │
//!       └────────► memory marking (per instruction)
//! ```
//!
//! - [`declarations`]: where variables are declared, and whether they have
//!   types
//! - [`graph`]: basic blocks linked through entry and exit labels
//! - [`dataflow`]: the generic worklist solver
//! - [`liveness`]: initialized/finalized tracking over the graph
//! - [`memory`]: balanced creation and destruction through references
//! - [`paths`], [`storage`]: how locations are named and laid out
//!
//! A pass is skipped when one it depends on reported an error, so one
//! mistake does not cascade into unrelated diagnostics.

pub mod dataflow;
pub mod declarations;
pub mod graph;
pub mod liveness;
pub mod memory;
mod options;
pub mod paths;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;


use std::fmt::Display;
use std::sync::Once;

use ara_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use ara_ir::ast::{Program, RoutineDef};
use ara_ir::{Environment, Name};
use rustc_hash::FxHashMap;

pub use declarations::Declarations;
pub use graph::{Block, BlockId, ControlGraph};
pub use liveness::{LivenessDescriptor, LivenessSolution, LivenessState};
pub use options::{DumpPasses, VerifyOptions};
pub use paths::{MemoryPath, ResourcePath};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Enable with `RUST_LOG=ara_verify=debug`, or
/// `RUST_LOG=ara_verify=trace` to follow every worklist step.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

/// Everything verification produced for one routine.
#[derive(Clone, Debug)]
pub struct RoutineReport<'r> {
    pub name: Name,
    pub graph: ControlGraph<'r>,
    /// `None` when liveness was skipped.
    pub liveness: Option<LivenessSolution>,
    /// Declaration, graph, liveness and memory diagnostics, in that order.
    /// After a declaration error only the declaration diagnostics remain.
    pub diagnostics: Vec<Diagnostic>,
}

impl RoutineReport<'_> {
    /// No errors were reported.
    pub fn is_accepted(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Everything verification produced for a program.
#[derive(Clone, Debug)]
pub struct ProgramReport<'p> {
    /// Diagnostics that belong to no single routine.
    pub program: Vec<Diagnostic>,
    pub routines: Vec<RoutineReport<'p>>,
}

impl ProgramReport<'_> {
    /// Program diagnostics, then each routine's in definition order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.program
            .iter()
            .chain(self.routines.iter().flat_map(|report| &report.diagnostics))
    }

    pub fn is_accepted(&self) -> bool {
        self.diagnostics().next().is_none()
    }
}

/// Verify one routine against its resolved environment.
#[tracing::instrument(level = "debug", skip_all, fields(routine = %routine.name))]
pub fn verify_routine<'r>(
    routine: &'r RoutineDef,
    env: &Environment,
    options: &VerifyOptions,
) -> RoutineReport<'r> {
    let new_queue = || DiagnosticQueue::with_config(options.diagnostics.clone());

    let mut declaration_queue = new_queue();
    let declarations = Declarations::collect(routine, env, &mut declaration_queue);
    let declarations_ok = declaration_queue.has_errors().is_none();

    let mut graph_queue = new_queue();
    let graph = ControlGraph::build(routine, &mut graph_queue);
    if options.dump.contains(DumpPasses::GRAPH) {
        tracing::debug!("control graph of `{}`:\n{}", routine.name, graph.render());
    }

    let mut liveness_queue = new_queue();
    let liveness = if declarations_ok && graph_queue.has_errors().is_none() {
        match liveness::analyze(&graph, env, &declarations, &mut liveness_queue) {
            Ok(solution) => {
                if options.dump.contains(DumpPasses::LIVENESS) {
                    dump_liveness(&graph, &solution);
                }
                Some(solution)
            }
            Err(error) => {
                liveness_queue.add(internal_error(routine, &error));
                None
            }
        }
    } else {
        tracing::debug!("liveness skipped");
        None
    };

    let mut memory_queue = new_queue();
    if declarations_ok {
        match memory::check_routine(routine, env, &mut memory_queue) {
            Ok(marks) => {
                if options.dump.contains(DumpPasses::MEMORY) {
                    for (instruction, marks) in routine.body.iter().zip(&marks) {
                        tracing::debug!(
                            span = ?instruction.span(),
                            "destroyed:\n{}\ncreated:\n{}",
                            marks.destroyed,
                            marks.created
                        );
                    }
                }
            }
            Err(error) => {
                memory_queue.add(internal_error(routine, &error));
            }
        }
    } else {
        tracing::debug!("memory marking skipped");
    }

    let mut diagnostics = declaration_queue.flush();
    if declarations_ok {
        diagnostics.extend(graph_queue.flush());
    } else {
        tracing::debug!(
            suppressed = graph_queue.flush().len(),
            "graph diagnostics dropped after declaration errors"
        );
    }
    diagnostics.extend(liveness_queue.flush());
    diagnostics.extend(memory_queue.flush());
    tracing::debug!(diagnostics = diagnostics.len(), "routine verified");

    RoutineReport {
        name: routine.name.name.clone(),
        graph,
        liveness,
        diagnostics,
    }
}

/// Verify every routine of `program`.
///
/// `envs` holds the resolved environment of each routine by name. A routine
/// without one is verified against an empty environment, so each of its
/// variables is reported as untyped.
pub fn verify_program<'p>(
    program: &'p Program,
    envs: &FxHashMap<Name, Environment>,
    options: &VerifyOptions,
) -> ProgramReport<'p> {
    let mut queue = DiagnosticQueue::with_config(options.diagnostics.clone());
    declarations::check_routine_names(program, &mut queue);

    let empty = Environment::default();
    let routines = program
        .routines()
        .map(|routine| {
            let env = envs.get(&routine.name.name).unwrap_or_else(|| {
                tracing::warn!(routine = %routine.name, "no environment for routine");
                &empty
            });
            verify_routine(routine, env, options)
        })
        .collect();

    ProgramReport {
        program: queue.flush(),
        routines,
    }
}

fn dump_liveness(graph: &ControlGraph<'_>, solution: &LivenessSolution) {
    for block in graph.blocks() {
        if let (Some(input), Some(output)) = (solution.get_in(block.id), solution.get_out(block.id)) {
            tracing::debug!("{} in:\n{input}\n{} out:\n{output}", block.id, block.id);
        }
    }
}

#[cold]
fn internal_error(routine: &RoutineDef, error: &impl Display) -> Diagnostic {
    tracing::warn!(routine = %routine.name, %error, "internal verifier error");
    Diagnostic::error(ErrorCode::E9001)
        .with_message(format!("internal verifier error: {error}"))
        .with_label(routine.span, "while verifying this routine")
        .with_note("this is a bug in the verifier, not in the program")
}
