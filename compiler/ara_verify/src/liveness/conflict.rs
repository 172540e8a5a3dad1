//! Conflict reporting over a solved liveness problem.
//!
//! A slot is in conflict where one incoming path leaves it initialized and
//! another leaves it finalized. Slots are compared leaf by leaf: a structure
//! whose members were consumed at different points is not a conflict.
//!
//! Once a conflict arises it propagates to every block downstream, so only
//! blocks whose predecessors are all free of the conflict are blamed; their
//! causes are merged into one diagnostic per variable. A conflict that first
//! arises in a loop header has no such block, and is blamed on the
//! conflicting blocks a conflict-free path enters.

use ara_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use ara_ir::Span;

use crate::declarations::Declarations;
use crate::graph::{BlockId, ControlGraph};
use crate::paths::ResourcePath;

use super::{LivenessSolution, LivenessState};

/// Report every conflicting variable, in name order. Returns how many were
/// reported.
pub fn report_conflicts(
    graph: &ControlGraph<'_>,
    solution: &LivenessSolution,
    declarations: &Declarations,
    queue: &mut DiagnosticQueue,
) -> usize {
    let Some(layout) = solution.get_out(graph.begin()) else {
        return 0;
    };
    let keys = layout.keys();

    let mut reported = 0;
    for (variable, site) in declarations.sites() {
        let leaves: Vec<&ResourcePath> =
            keys.iter().filter(|key| key.variable() == variable).collect();
        let conflict_in = |block: BlockId| conflicting_leaves(solution, block, &leaves);
        let is_conflict = |block: BlockId| !conflict_in(block).is_unknown();

        let merge_where = |blamed: &dyn Fn(BlockId) -> bool| {
            graph
                .blocks()
                .iter()
                .filter(|block| blamed(block.id))
                .fold(LivenessState::Unknown, |merged, block| {
                    merged.meet(&conflict_in(block.id))
                })
        };

        let mut merged =
            merge_where(&|block| !graph.predecessors(block).into_iter().any(is_conflict));
        if !merged.is_conflict() {
            merged = merge_where(&|block| {
                graph
                    .predecessors(block)
                    .into_iter()
                    .any(|pred| !is_conflict(pred))
            });
        }

        if merged.is_conflict() {
            queue.add(conflict_diagnostic(variable.as_str(), site, &merged));
            reported += 1;
        }
    }

    tracing::debug!(routine = %graph.routine(), reported, "conflicts checked");
    reported
}

/// Meet of the conflicting leaves among `leaves` at the end of `block`, or
/// `Unknown` when none conflicts.
fn conflicting_leaves(
    solution: &LivenessSolution,
    block: BlockId,
    leaves: &[&ResourcePath],
) -> LivenessState {
    let Some(out) = solution.get_out(block) else {
        return LivenessState::Unknown;
    };
    leaves
        .iter()
        .filter_map(|leaf| out.leaf(leaf).ok())
        .filter(|state| state.is_conflict())
        .fold(LivenessState::Unknown, |merged, state| merged.meet(state))
}

fn conflict_diagnostic(variable: &str, site: Span, state: &LivenessState) -> Diagnostic {
    let mut causes: Vec<(Span, &str)> = state
        .initializers()
        .iter()
        .map(|&span| (span, "initializer"))
        .chain(state.finalizers().iter().map(|&span| (span, "finalizer")))
        .collect();
    causes.sort_unstable();

    let mut diagnostic = Diagnostic::error(ErrorCode::E3001)
        .with_message(format!(
            "variable `{variable}` has conflicting initializers and finalizers"
        ))
        .with_label(site, "declared here");
    for (span, role) in causes {
        diagnostic = diagnostic.with_secondary_label(span, format!("potential cause: {role} here"));
    }
    diagnostic.with_note("the variable is initialized on one incoming path and finalized on another")
}
