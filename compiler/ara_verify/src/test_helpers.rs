//! Shared test utilities for the verification passes.
//!
//! Factory functions for syntax trees and environments used across the
//! `paths`, `graph`, `liveness`, `memory` and pipeline tests. Positions are
//! single offsets: `sp(at)` is the one-byte span starting at `at`, and an
//! instruction built at `at` covers everything it contains. Only compiled in
//! test builds.

use std::sync::Arc;

use ara_ir::ast::{
    ComparisonOp, ConditionalExpr, Instruction, Memory, Param, ResourceExpr, RoutineDef, Storage,
};
use ara_ir::{Direction, Environment, Ident, Name, Span, Type, TypeTable};

/// Shorthand for `Span::new(at, at + 1)`.
pub(crate) fn sp(at: u32) -> Span {
    Span::new(at, at + 1)
}

pub(crate) fn ident(name: &str, at: u32) -> Ident {
    Ident::new(name, sp(at))
}

/// `name`
pub(crate) fn var(name: &str, at: u32) -> ResourceExpr {
    ResourceExpr::Storage(Storage::Named(ident(name, at)))
}

/// `name.member`, with the member two bytes after the variable.
pub(crate) fn field(name: &str, member: &str, at: u32) -> ResourceExpr {
    ResourceExpr::Storage(Storage::MemberAccess {
        storage: Box::new(Storage::Named(ident(name, at))),
        member: ident(member, at + 2),
        span: Span::new(at, at + 3),
    })
}

/// `name&`
pub(crate) fn deref(name: &str, at: u32) -> ResourceExpr {
    ResourceExpr::Memory(deref_memory(name, at))
}

/// `name&.member`
pub(crate) fn deref_member(name: &str, member: &str, at: u32) -> ResourceExpr {
    ResourceExpr::Memory(Memory::MemberAccess {
        memory: Box::new(deref_memory(name, at)),
        member: ident(member, at + 3),
        span: Span::new(at, at + 4),
    })
}

fn deref_memory(name: &str, at: u32) -> Memory {
    Memory::DereferencedStorage {
        storage: Storage::Named(ident(name, at)),
        span: Span::new(at, at + 2),
    }
}

pub(crate) fn int(value: i64, at: u32) -> ResourceExpr {
    ResourceExpr::IntegerLiteral {
        value,
        span: sp(at),
    }
}

/// `dst := src`
pub(crate) fn assign(dst: ResourceExpr, src: ResourceExpr, at: u32) -> Instruction {
    let span = sp(at).merge(dst.span()).merge(src.span());
    Instruction::ArithmeticAssignment {
        dst,
        src,
        modifier: None,
        span,
    }
}

/// `(d1, ...) := (s1, ...)`
pub(crate) fn multi(dsts: Vec<ResourceExpr>, srcs: Vec<ResourceExpr>, at: u32) -> Instruction {
    let span = dsts
        .iter()
        .chain(&srcs)
        .fold(sp(at), |span, expr| span.merge(expr.span()));
    Instruction::MultiAssignment { dsts, srcs, span }
}

/// `-> label`
pub(crate) fn exit(label: &str, at: u32) -> Instruction {
    Instruction::Unconditional {
        direction: Direction::Forward,
        label: ident(label, at + 3),
        span: Span::new(at, at + 4),
    }
}

/// `label <-`
pub(crate) fn entry(label: &str, at: u32) -> Instruction {
    Instruction::Unconditional {
        direction: Direction::Backward,
        label: ident(label, at),
        span: Span::new(at, at + 4),
    }
}

/// `(c == 0) -> lhs, rhs`, with `c` at `at + 1`.
pub(crate) fn branch(condition: &str, lhs: &str, rhs: &str, at: u32) -> Instruction {
    Instruction::Conditional {
        direction: Direction::Forward,
        lhs_label: ident(lhs, at + 10),
        rhs_label: ident(rhs, at + 13),
        condition: compare_to_zero(condition, at + 1),
        span: Span::new(at, at + 14),
    }
}

/// `lhs, rhs <- (c == 0)`, with `c` at `at + 9`.
pub(crate) fn join(lhs: &str, rhs: &str, condition: &str, at: u32) -> Instruction {
    Instruction::Conditional {
        direction: Direction::Backward,
        lhs_label: ident(lhs, at),
        rhs_label: ident(rhs, at + 3),
        condition: compare_to_zero(condition, at + 9),
        span: Span::new(at, at + 16),
    }
}

fn compare_to_zero(variable: &str, at: u32) -> ConditionalExpr {
    ConditionalExpr::Comparison {
        lhs: var(variable, at),
        op: ComparisonOp::Eq,
        rhs: int(0, at + 5),
        span: Span::new(at, at + 6),
    }
}

/// An untyped parameter.
pub(crate) fn param(name: &str, at: u32) -> Param {
    Param {
        name: ident(name, at),
        ty: None,
        span: sp(at),
    }
}

/// `routine r(inputs) -> (outputs) { body }`, named `r` at offset 0.
pub(crate) fn routine(inputs: Vec<Param>, outputs: Vec<Param>, body: Vec<Instruction>) -> RoutineDef {
    routine_named("r", inputs, outputs, body)
}

pub(crate) fn routine_named(
    name: &str,
    inputs: Vec<Param>,
    outputs: Vec<Param>,
    body: Vec<Instruction>,
) -> RoutineDef {
    let end = body.last().map_or(0, |instruction| instruction.span().end);
    RoutineDef {
        name: ident(name, 0),
        inputs,
        outputs,
        body,
        span: Span::new(0, end + 1),
    }
}

/// A `{ a: Int, b: Int }` structure.
pub(crate) fn pair() -> Type {
    Type::structure(vec![
        ara_ir::Member::new("a", Type::Int),
        ara_ir::Member::new("b", Type::Int),
    ])
}

/// An environment over an empty type table.
pub(crate) fn env(variables: &[(&str, Type)]) -> Environment {
    env_with_types(TypeTable::new(), variables)
}

pub(crate) fn env_with_types(types: TypeTable, variables: &[(&str, Type)]) -> Environment {
    let mut env = Environment::new(Arc::new(types));
    for (name, ty) in variables {
        env.declare(Name::from(*name), ty.clone());
    }
    env
}
