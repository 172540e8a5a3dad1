//! Variable and routine declarations.
//!
//! Ara has no `let`: a variable is declared by naming it in a parameter list
//! or by using it as a storage anywhere in a routine body. This pass records
//! where every variable first appears (its declaration site, used to anchor
//! diagnostics that have no better position) and checks that:
//!
//! - no name repeats within the input list or within the output list,
//! - every variable has a resolved type in the routine's environment,
//! - no routine name is defined twice in a program.
//!
//! A name may appear in both parameter lists; `r(p) -> (p)` consumes and
//! produces the same variable.

use std::collections::{BTreeMap, BTreeSet};

use ara_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use ara_ir::ast::{Instruction, Param, Program, ResourceExpr, RoutineDef};
use ara_ir::{Environment, Ident, Name, Span};
use rustc_hash::FxHashMap;

use crate::paths::{created_resources, destroyed_resources};

/// Variables of one routine and where they were declared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Declarations {
    sites: BTreeMap<Name, Span>,
    inputs: Vec<Ident>,
    outputs: BTreeSet<Name>,
}

impl Declarations {
    /// Scan `routine`, reporting duplicate parameters and variables missing
    /// from `env`.
    pub fn collect(routine: &RoutineDef, env: &Environment, queue: &mut DiagnosticQueue) -> Self {
        let mut declarations = Declarations::default();

        let inputs = unique_parameters(&routine.inputs, queue);
        let outputs = unique_parameters(&routine.outputs, queue);
        for param in inputs.iter().chain(&outputs) {
            declarations.record(param);
        }
        declarations.inputs = inputs;
        declarations.outputs = outputs.into_iter().map(|ident| ident.name).collect();

        for instruction in &routine.body {
            declarations.record_instruction(instruction);
        }

        for (name, &site) in &declarations.sites {
            if !env.contains(name.as_str()) {
                queue.add(
                    Diagnostic::error(ErrorCode::E2002)
                        .with_message(format!("variable `{name}` has no resolved type"))
                        .with_label(site, "declared here"),
                );
            }
        }

        tracing::debug!(
            routine = %routine.name,
            num_variables = declarations.sites.len(),
            "declarations collected"
        );

        declarations
    }

    /// Where `name` first appears in the routine.
    pub fn site(&self, name: &str) -> Option<Span> {
        self.sites.get(name).copied()
    }

    /// Every declared variable with its site, in name order.
    pub fn sites(&self) -> impl Iterator<Item = (&Name, Span)> {
        self.sites.iter().map(|(name, &span)| (name, span))
    }

    /// Input parameters, duplicates removed.
    pub fn inputs(&self) -> &[Ident] {
        &self.inputs
    }

    pub fn is_output(&self, name: &str) -> bool {
        self.outputs.contains(name)
    }

    fn record(&mut self, ident: &Ident) {
        self.sites.entry(ident.name.clone()).or_insert(ident.span);
    }

    fn record_instruction(&mut self, instruction: &Instruction) {
        for expr in created_resources(instruction)
            .iter()
            .chain(destroyed_resources(instruction))
        {
            self.record_expr(expr);
        }
        match instruction {
            Instruction::ArithmeticAssignment {
                modifier: Some(modifier),
                ..
            } => {
                for operand in modifier.value.operands() {
                    self.record_expr(operand);
                }
            }
            Instruction::Conditional { condition, .. } => {
                for operand in condition.operands() {
                    self.record_expr(operand);
                }
            }
            Instruction::ArithmeticAssignment { modifier: None, .. }
            | Instruction::MultiAssignment { .. }
            | Instruction::Call { .. }
            | Instruction::Unconditional { .. } => {}
        }
    }

    fn record_expr(&mut self, expr: &ResourceExpr) {
        match expr {
            ResourceExpr::Storage(storage) => self.record(storage.root()),
            ResourceExpr::Memory(memory) => self.record(memory.dereferenced_storage().root()),
            ResourceExpr::Allocation { value, .. } => self.record_expr(value),
            ResourceExpr::StructureLiteral { members, .. } => {
                for member in members {
                    self.record_expr(&member.value);
                }
            }
            ResourceExpr::IntegerLiteral { .. } | ResourceExpr::NullReference { .. } => {}
        }
    }
}

/// First occurrence of every parameter name; later ones are reported.
fn unique_parameters(params: &[Param], queue: &mut DiagnosticQueue) -> Vec<Ident> {
    let mut seen: FxHashMap<&Name, Span> = FxHashMap::default();
    let mut unique = Vec::with_capacity(params.len());
    for param in params {
        if let Some(&first) = seen.get(&param.name.name) {
            queue.add(
                Diagnostic::error(ErrorCode::E2001)
                    .with_message(format!("parameter `{}` was declared multiple times", param.name))
                    .with_label(param.span, "declared again here")
                    .with_secondary_label(first, "first declared here"),
            );
        } else {
            seen.insert(&param.name.name, param.span);
            unique.push(param.name.clone());
        }
    }
    unique
}

/// Report routine names defined more than once in `program`.
pub fn check_routine_names(program: &Program, queue: &mut DiagnosticQueue) {
    let mut seen: FxHashMap<&Name, Span> = FxHashMap::default();
    for routine in program.routines() {
        if let Some(&first) = seen.get(&routine.name.name) {
            queue.add(
                Diagnostic::error(ErrorCode::E2003)
                    .with_message(format!("routine `{}` was defined multiple times", routine.name))
                    .with_label(routine.name.span, "defined again here")
                    .with_secondary_label(first, "first defined here"),
            );
        } else {
            seen.insert(&routine.name.name, routine.name.span);
        }
    }
}

#[cfg(test)]
mod tests;
