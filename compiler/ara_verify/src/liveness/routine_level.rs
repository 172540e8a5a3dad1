//! End-of-routine checks.
//!
//! When a routine returns, its output parameters must hold values and every
//! other variable must have been consumed. The inverse routine starts from
//! exactly the outputs.

use ara_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use ara_ir::{Name, Span};

use crate::declarations::Declarations;
use crate::graph::ControlGraph;
use crate::paths::ResourcePath;

use super::{CauseSet, LivenessSolution, LivenessState};

/// Check the OUT state of the end block. Outputs are reported first, then
/// the remaining variables, each group in name order.
pub fn check_routine_end(
    graph: &ControlGraph<'_>,
    solution: &LivenessSolution,
    declarations: &Declarations,
    queue: &mut DiagnosticQueue,
) {
    let Some(end) = solution.get_out(graph.end()) else {
        return;
    };
    let state_of = |variable: &Name| match end.get(&ResourcePath::root(variable.clone())) {
        Ok(state) => Some(state),
        Err(error) => {
            tracing::warn!(%variable, %error, "variable missing from liveness state");
            None
        }
    };

    for (variable, site) in declarations.sites() {
        if !declarations.is_output(variable.as_str()) {
            continue;
        }
        if let Some(state) = state_of(variable).filter(|state| !state.is_initialized()) {
            queue.add(end_diagnostic(
                ErrorCode::E3005,
                format!("output `{variable}` is not initialized at the end of the routine"),
                site,
                &state,
                state.finalizers(),
                "potential cause: finalizer here",
            ));
        }
    }

    for (variable, site) in declarations.sites() {
        if declarations.is_output(variable.as_str()) {
            continue;
        }
        if let Some(state) = state_of(variable).filter(|state| !state.is_finalized()) {
            queue.add(end_diagnostic(
                ErrorCode::E3006,
                format!("variable `{variable}` is not finalized at the end of the routine"),
                site,
                &state,
                state.initializers(),
                "potential cause: initializer here",
            ));
        }
    }
}

/// Anchor at the earliest cause, or at the declaration when there is none.
fn end_diagnostic(
    code: ErrorCode,
    message: String,
    site: Span,
    state: &LivenessState,
    causes: &CauseSet,
    cause_label: &str,
) -> Diagnostic {
    let diagnostic = Diagnostic::error(code)
        .with_message(message)
        .with_note(format!("its state at the end of the routine is: {}", describe(state)));
    let mut causes = causes.iter().copied();
    match causes.next() {
        Some(first) => diagnostic
            .with_label(first, cause_label)
            .with_secondary_labels(causes, cause_label),
        None => diagnostic.with_label(site, "declared here"),
    }
}

fn describe(state: &LivenessState) -> &'static str {
    match state {
        LivenessState::Unknown => "never assigned",
        LivenessState::Initialized(_) => "initialized",
        LivenessState::Finalized(_) => "finalized",
        LivenessState::Conflict { .. } => "conflicting",
    }
}
