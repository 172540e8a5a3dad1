//! Instruction-by-instruction checks inside each block.
//!
//! Each block is replayed from a copy of its IN state. Per instruction:
//!
//! 1. every destroyed resource must be initialized, and is then finalized;
//! 2. every resource the instruction reads must be initialized;
//! 3. every created resource must be finalized or not yet seen, and is then
//!    initialized.
//!
//! A resource that fails a check keeps its state, so one mistake is reported
//! where it happens rather than at every later use.

use std::collections::BTreeSet;

use ara_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use ara_ir::ast::{Instruction, ResourceExpr};
use ara_ir::Span;

use crate::graph::{Block, ControlGraph};
use crate::paths::{
    arithmetic_paths, condition_paths, created_resources, destroyed_resources, memory_references,
    resource_path, resource_paths, ResourcePath,
};

use super::{LivenessDescriptor, LivenessSolution, LivenessState};

/// Check every block of `graph` against its IN state in `solution`.
pub fn check_blocks(graph: &ControlGraph<'_>, solution: &LivenessSolution, queue: &mut DiagnosticQueue) {
    for block in graph.blocks() {
        let Some(state) = solution.get_in(block.id) else {
            continue;
        };
        BlockChecker {
            state: state.clone(),
            queue: &mut *queue,
        }
        .check(block);
    }
}

struct BlockChecker<'q> {
    state: LivenessDescriptor,
    queue: &'q mut DiagnosticQueue,
}

impl BlockChecker<'_> {
    fn check(mut self, block: &Block<'_>) {
        for instruction in block.instructions {
            for expr in destroyed_resources(instruction) {
                for path in resource_paths(expr) {
                    self.finalize_or_report(&path, expr.span());
                }
            }
            self.verify_uses(instruction);
            for expr in created_resources(instruction) {
                for path in resource_paths(expr) {
                    self.initialize_or_report(&path, expr.span());
                }
            }
        }
    }

    fn state_of(&self, path: &ResourcePath) -> Option<LivenessState> {
        match self.state.get(path) {
            Ok(state) => Some(state),
            Err(error) => {
                tracing::warn!(%path, %error, "skipping resource outside the environment");
                None
            }
        }
    }

    fn finalize_or_report(&mut self, path: &ResourcePath, at: Span) {
        let Some(state) = self.state_of(path) else {
            return;
        };
        if state.is_initialized() {
            if let Err(error) = self.state.finalize(path, at) {
                tracing::warn!(%path, %error, "failed to finalize resource");
            }
            return;
        }

        let reason = if state.finalizers().is_empty() {
            "it has not been initialized"
        } else {
            "it has already been finalized"
        };
        self.queue.add(
            Diagnostic::error(ErrorCode::E3002)
                .with_message(format!("cannot finalize `{path}` as {reason}"))
                .with_label(at, "finalized here")
                .with_secondary_labels(state.finalizers().iter().copied(), "potential cause: finalizer here"),
        );
    }

    fn initialize_or_report(&mut self, path: &ResourcePath, at: Span) {
        let Some(state) = self.state_of(path) else {
            return;
        };
        if state.is_finalized() || state.is_unknown() {
            if let Err(error) = self.state.initialize(path, at) {
                tracing::warn!(%path, %error, "failed to initialize resource");
            }
            return;
        }

        self.queue.add(
            Diagnostic::error(ErrorCode::E3003)
                .with_message(format!("cannot initialize `{path}` as it has already been initialized"))
                .with_label(at, "initialized here")
                .with_secondary_labels(
                    state.initializers().iter().copied(),
                    "potential cause: initializer here",
                ),
        );
    }

    fn verify_use(&mut self, path: &ResourcePath, anchor: Span) {
        let Some(state) = self.state_of(path) else {
            return;
        };
        if state.is_initialized() {
            return;
        }

        self.queue.add(
            Diagnostic::error(ErrorCode::E3004)
                .with_message(format!("cannot use `{path}` as it has not been initialized"))
                .with_label(anchor, "used here")
                .with_secondary_labels(state.finalizers().iter().copied(), "potential cause: finalizer here"),
        );
    }

    /// References followed by any memory expression, then modifier and
    /// condition operands.
    fn verify_uses(&mut self, instruction: &Instruction) {
        let resources: Vec<&ResourceExpr> = created_resources(instruction)
            .iter()
            .chain(destroyed_resources(instruction))
            .collect();
        for memory in resources.into_iter().flat_map(memory_references) {
            let storage = memory.dereferenced_storage();
            self.verify_use(&resource_path(storage), storage.span());
        }

        match instruction {
            Instruction::ArithmeticAssignment {
                modifier: Some(modifier),
                ..
            } => {
                let paths: BTreeSet<ResourcePath> = arithmetic_paths(&modifier.value).into_iter().collect();
                for path in &paths {
                    self.verify_use(path, modifier.span);
                }
            }
            Instruction::Conditional { condition, .. } => {
                let paths: BTreeSet<ResourcePath> = condition_paths(condition).into_iter().collect();
                for path in &paths {
                    self.verify_use(path, condition.span());
                }
            }
            Instruction::ArithmeticAssignment { modifier: None, .. }
            | Instruction::MultiAssignment { .. }
            | Instruction::Call { .. }
            | Instruction::Unconditional { .. } => {}
        }
    }
}
