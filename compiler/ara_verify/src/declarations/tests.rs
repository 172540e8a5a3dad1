use ara_diagnostic::{DiagnosticQueue, ErrorCode};
use ara_ir::ast::{
    ArithmeticExpr, ArithmeticModifier, BinaryOp, Definition, Instruction, ModificationOp, Program,
};
use ara_ir::{Span, Type};
use pretty_assertions::assert_eq;

use crate::test_helpers::{
    assign, branch, deref, env, field, int, param, routine, routine_named, sp, var,
};

use super::*;

fn sites(declarations: &Declarations) -> Vec<(String, Span)> {
    declarations
        .sites()
        .map(|(name, span)| (name.to_string(), span))
        .collect()
}

#[test]
fn sites_are_first_occurrences() {
    let routine = routine(
        vec![param("x", 1)],
        vec![param("y", 3)],
        vec![
            assign(var("y", 10), var("x", 15), 10),
            assign(field("p", "a", 20), deref("q", 30), 20),
            assign(var("x", 40), var("y", 45), 40),
        ],
    );
    let env = env(&[("p", Type::Int), ("q", Type::Int), ("x", Type::Int), ("y", Type::Int)]);
    let mut queue = DiagnosticQueue::new();
    let declarations = Declarations::collect(&routine, &env, &mut queue);

    assert!(queue.has_errors().is_none());
    assert_eq!(
        sites(&declarations),
        [
            ("p".to_string(), sp(20)),
            ("q".to_string(), sp(30)),
            ("x".to_string(), sp(1)),
            ("y".to_string(), sp(3)),
        ]
    );
    assert_eq!(declarations.site("q"), Some(sp(30)));
    assert_eq!(declarations.site("z"), None);
    assert!(declarations.is_output("y"));
    assert!(!declarations.is_output("x"));
    let inputs: Vec<&str> = declarations.inputs().iter().map(|i| i.name.as_str()).collect();
    assert_eq!(inputs, ["x"]);
}

#[test]
fn inputs_are_recorded_before_outputs() {
    let routine = routine(
        vec![param("p", 5), param("c", 6)],
        vec![param("c", 2), param("p", 1)],
        vec![],
    );
    let env = env(&[("c", Type::Int), ("p", Type::Int)]);
    let mut queue = DiagnosticQueue::new();
    let declarations = Declarations::collect(&routine, &env, &mut queue);

    assert!(queue.has_errors().is_none());
    assert_eq!(
        sites(&declarations),
        [("c".to_string(), sp(6)), ("p".to_string(), sp(5))]
    );
    let inputs: Vec<Span> = declarations.inputs().iter().map(|i| i.span).collect();
    assert_eq!(inputs, [sp(5), sp(6)]);
    assert!(declarations.is_output("p"));
    assert!(declarations.is_output("c"));
}

#[test]
fn modifier_and_condition_operands_are_declarations() {
    let modified = Instruction::ArithmeticAssignment {
        dst: var("y", 0),
        src: var("x", 5),
        modifier: Some(ArithmeticModifier {
            op: ModificationOp::Add,
            value: ArithmeticExpr::Binary {
                lhs: var("k", 10),
                op: BinaryOp::Mul,
                rhs: int(2, 14),
                span: Span::new(10, 15),
            },
            span: Span::new(8, 16),
        }),
        span: Span::new(0, 16),
    };
    let routine = routine(vec![], vec![], vec![modified, branch("c", "L", "M", 20)]);
    let env = env(&[("c", Type::Int), ("k", Type::Int), ("x", Type::Int), ("y", Type::Int)]);
    let mut queue = DiagnosticQueue::new();
    let declarations = Declarations::collect(&routine, &env, &mut queue);

    assert_eq!(declarations.site("k"), Some(sp(10)));
    assert_eq!(declarations.site("c"), Some(sp(21)));
    assert!(queue.has_errors().is_none());
}

#[test]
fn duplicate_parameters_within_one_list() {
    let routine = routine(
        vec![param("x", 1), param("x", 3)],
        vec![param("x", 5), param("y", 7), param("y", 9)],
        vec![],
    );
    let env = env(&[("x", Type::Int), ("y", Type::Int)]);
    let mut queue = DiagnosticQueue::new();
    let declarations = Declarations::collect(&routine, &env, &mut queue);
    let diagnostics = queue.flush();

    let codes: Vec<ErrorCode> = diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, [ErrorCode::E2001, ErrorCode::E2001]);
    assert_eq!(diagnostics[0].primary_span(), Some(sp(3)));
    assert_eq!(diagnostics[0].message, "parameter `x` was declared multiple times");
    let first: Vec<Span> = diagnostics[0].secondary_labels().map(|l| l.span).collect();
    assert_eq!(first, [sp(1)]);
    assert_eq!(diagnostics[1].primary_span(), Some(sp(9)));

    // The same name as input and output is fine.
    assert_eq!(declarations.inputs().len(), 1);
    assert!(declarations.is_output("x"));
}

#[test]
fn variables_without_type_are_reported_in_name_order() {
    let routine = routine(
        vec![param("x", 1)],
        vec![],
        vec![assign(var("b", 10), var("x", 15), 10), assign(var("a", 20), var("b", 25), 20)],
    );
    let env = env(&[("x", Type::Int)]);
    let mut queue = DiagnosticQueue::new();
    Declarations::collect(&routine, &env, &mut queue);
    let diagnostics = queue.flush();

    let found: Vec<(ErrorCode, Option<Span>)> =
        diagnostics.iter().map(|d| (d.code, d.primary_span())).collect();
    assert_eq!(
        found,
        [(ErrorCode::E2002, Some(sp(20))), (ErrorCode::E2002, Some(sp(10)))]
    );
}

#[test]
fn duplicate_routine_names() {
    let program = Program {
        definitions: vec![
            Definition::Routine(routine_named("r", vec![], vec![], vec![])),
            Definition::Routine(routine_named("s", vec![], vec![], vec![])),
            Definition::Routine(routine_named("r", vec![], vec![], vec![])),
        ],
    };
    let mut queue = DiagnosticQueue::new();
    check_routine_names(&program, &mut queue);
    let diagnostics = queue.flush();

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, ErrorCode::E2003);
    assert_eq!(diagnostics[0].message, "routine `r` was defined multiple times");
    assert_eq!(diagnostics[0].primary_span(), Some(sp(0)));
}
