use ara_diagnostic::{Diagnostic, DiagnosticConfig, DiagnosticQueue, ErrorCode};
use ara_ir::ast::{ArithmeticExpr, ArithmeticModifier, Instruction, ModificationOp, RoutineDef};
use ara_ir::{Environment, Name, Span, Type};
use pretty_assertions::assert_eq;

use crate::dataflow::DataflowProblem;
use crate::declarations::Declarations;
use crate::graph::{BlockId, ControlGraph};
use crate::paths::ResourcePath;
use crate::storage::StorageError;
use crate::test_helpers::{
    assign, branch, deref, entry, env, exit, field, int, join, pair, param, routine, sp, var,
};

use super::*;

fn causes(spans: &[Span]) -> CauseSet {
    spans.iter().copied().collect()
}

fn path(variable: &str) -> ResourcePath {
    ResourcePath::root(variable)
}

/// Run declarations, graph construction and liveness on a routine that is
/// expected to be structurally clean.
fn run(routine: &RoutineDef, env: &Environment) -> (LivenessSolution, BlockId, Vec<Diagnostic>) {
    let mut queue = DiagnosticQueue::with_config(DiagnosticConfig::unlimited());
    let declarations = Declarations::collect(routine, env, &mut queue);
    let graph = ControlGraph::build(routine, &mut queue);
    assert!(queue.has_errors().is_none(), "{:?}", queue.flush());

    let Ok(solution) = analyze(&graph, env, &declarations, &mut queue) else {
        panic!("liveness descriptor should build");
    };
    (solution, graph.end(), queue.flush())
}

fn codes(diagnostics: &[Diagnostic]) -> Vec<ErrorCode> {
    diagnostics.iter().map(|d| d.code).collect()
}

fn end_state(solution: &LivenessSolution, end: BlockId, variable: &str) -> LivenessState {
    match solution.get_out(end).map(|out| out.get(&path(variable))) {
        Some(Ok(state)) => state,
        other => panic!("no state for `{variable}`: {other:?}"),
    }
}

// Lattice

#[test]
fn meet_table() {
    let init = LivenessState::initialized_at(sp(1));
    let fin = LivenessState::finalized_at(sp(2));

    assert_eq!(LivenessState::Unknown.meet(&init), init);
    assert_eq!(fin.meet(&LivenessState::Unknown), fin);
    assert_eq!(
        init.meet(&LivenessState::initialized_at(sp(3))),
        LivenessState::Initialized(causes(&[sp(1), sp(3)]))
    );
    assert_eq!(
        fin.meet(&init),
        LivenessState::Conflict {
            initializers: causes(&[sp(1)]),
            finalizers: causes(&[sp(2)]),
        }
    );

    let conflict = init.meet(&fin);
    assert_eq!(
        conflict.meet(&LivenessState::finalized_at(sp(4))),
        LivenessState::Conflict {
            initializers: causes(&[sp(1)]),
            finalizers: causes(&[sp(2), sp(4)]),
        }
    );
}

#[test]
fn overwrite_replaces_unless_same_kind() {
    let init = LivenessState::initialized_at(sp(1));
    let fin = LivenessState::finalized_at(sp(2));

    assert_eq!(LivenessState::Unknown.overwritten_with(&fin), fin);
    assert_eq!(init.overwritten_with(&fin), fin);
    assert_eq!(fin.overwritten_with(&init), init);
    assert_eq!(
        init.overwritten_with(&LivenessState::initialized_at(sp(5))),
        LivenessState::Initialized(causes(&[sp(1), sp(5)]))
    );
}

#[test]
fn overwrite_never_resolves_a_conflict() {
    let conflict = LivenessState::initialized_at(sp(1)).meet(&LivenessState::finalized_at(sp(2)));

    assert_eq!(conflict.overwritten_with(&LivenessState::Unknown), conflict);
    assert_eq!(
        conflict.overwritten_with(&LivenessState::initialized_at(sp(7))),
        LivenessState::Conflict {
            initializers: causes(&[sp(1), sp(7)]),
            finalizers: causes(&[sp(2)]),
        }
    );
}

#[test]
fn display_symbols() {
    let states = [
        LivenessState::Unknown,
        LivenessState::initialized_at(sp(0)),
        LivenessState::finalized_at(sp(0)),
        LivenessState::initialized_at(sp(0)).meet(&LivenessState::finalized_at(sp(1))),
    ];
    let shown: Vec<String> = states.iter().map(ToString::to_string).collect();
    assert_eq!(shown, ["?", "+", "-", "!"]);
}

mod lattice_laws {
    use proptest::prelude::*;

    use super::*;

    fn cause_set() -> impl Strategy<Value = CauseSet> {
        proptest::collection::btree_set((0u32..12).prop_map(sp), 1..4)
    }

    fn state() -> impl Strategy<Value = LivenessState> {
        prop_oneof![
            Just(LivenessState::Unknown),
            cause_set().prop_map(LivenessState::Initialized),
            cause_set().prop_map(LivenessState::Finalized),
            (cause_set(), cause_set()).prop_map(|(initializers, finalizers)| {
                LivenessState::Conflict {
                    initializers,
                    finalizers,
                }
            }),
        ]
    }

    proptest! {
        #[test]
        fn meet_is_commutative(a in state(), b in state()) {
            prop_assert_eq!(a.meet(&b), b.meet(&a));
        }

        #[test]
        fn meet_is_associative(a in state(), b in state(), c in state()) {
            prop_assert_eq!(a.meet(&b).meet(&c), a.meet(&b.meet(&c)));
        }

        #[test]
        fn unknown_is_the_identity(a in state()) {
            prop_assert_eq!(a.meet(&LivenessState::Unknown), a.clone());
            prop_assert_eq!(LivenessState::Unknown.meet(&a), a);
        }

        #[test]
        fn meet_is_idempotent(a in state()) {
            prop_assert_eq!(a.meet(&a), a);
        }

        #[test]
        fn causes_only_grow(a in state(), b in state()) {
            let met = a.meet(&b);
            prop_assert!(met.initializers().is_superset(a.initializers()));
            prop_assert!(met.finalizers().is_superset(b.finalizers()));
            let overwritten = a.overwritten_with(&b);
            prop_assert!(overwritten.initializers().is_superset(b.initializers()));
        }
    }
}

// Descriptor

#[test]
fn structures_synthesize_from_members() {
    let env = env(&[("p", pair())]);
    let Ok(mut descriptor) = LivenessDescriptor::all_unknown(&env) else {
        panic!("descriptor should build");
    };

    let member = ResourcePath::new("p", [Name::from("a")]);
    assert_eq!(descriptor.initialize(&member, sp(5)), Ok(()));
    assert_eq!(descriptor.get(&path("p")), Ok(LivenessState::initialized_at(sp(5))));

    let other = ResourcePath::new("p", [Name::from("b")]);
    assert_eq!(descriptor.finalize(&other, sp(7)), Ok(()));
    assert_eq!(
        descriptor.get(&path("p")),
        Ok(LivenessState::Conflict {
            initializers: causes(&[sp(5)]),
            finalizers: causes(&[sp(7)]),
        })
    );

    // Writing the root reaches every member.
    assert_eq!(descriptor.finalize(&path("p"), sp(9)), Ok(()));
    assert_eq!(descriptor.get(&member), Ok(LivenessState::finalized_at(sp(9))));
    assert_eq!(
        descriptor.get(&path("p")),
        Ok(LivenessState::Finalized(causes(&[sp(7), sp(9)])))
    );
}

#[test]
fn unknown_paths_are_errors() {
    let env = env(&[("x", Type::Int)]);
    let Ok(mut descriptor) = LivenessDescriptor::all_unknown(&env) else {
        panic!("descriptor should build");
    };

    assert_eq!(
        descriptor.initialize(&path("z"), sp(0)),
        Err(StorageError::UnknownPath(path("z")))
    );
}

// Analysis

#[test]
fn straight_line_routine_is_accepted() {
    let routine = routine(
        vec![param("x", 1)],
        vec![param("y", 3)],
        vec![assign(var("y", 10), var("x", 15), 10)],
    );
    let env = env(&[("x", Type::Int), ("y", Type::Int)]);
    let (solution, end, diagnostics) = run(&routine, &env);

    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(end_state(&solution, end, "x"), LivenessState::finalized_at(sp(15)));
    assert_eq!(end_state(&solution, end, "y"), LivenessState::initialized_at(sp(10)));
}

#[test]
fn finalizing_twice_and_initializing_twice() {
    let routine = routine(
        vec![param("x", 1)],
        vec![param("y", 3)],
        vec![
            assign(var("y", 10), var("x", 15), 10),
            assign(var("y", 20), var("x", 25), 20),
        ],
    );
    let env = env(&[("x", Type::Int), ("y", Type::Int)]);
    let (_, _, diagnostics) = run(&routine, &env);

    assert_eq!(codes(&diagnostics), [ErrorCode::E3002, ErrorCode::E3003]);
    assert_eq!(
        diagnostics[0].message,
        "cannot finalize `x` as it has already been finalized"
    );
    assert_eq!(diagnostics[0].primary_span(), Some(sp(25)));
    let finalizers: Vec<Span> = diagnostics[0].secondary_labels().map(|l| l.span).collect();
    assert_eq!(finalizers, [sp(15)]);

    assert_eq!(
        diagnostics[1].message,
        "cannot initialize `y` as it has already been initialized"
    );
    assert_eq!(diagnostics[1].primary_span(), Some(sp(20)));
    let initializers: Vec<Span> = diagnostics[1].secondary_labels().map(|l| l.span).collect();
    assert_eq!(initializers, [sp(10)]);
}

#[test]
fn finalizing_what_was_never_initialized() {
    let routine = routine(
        vec![],
        vec![],
        vec![
            assign(var("y", 10), var("x", 15), 10),
            assign(var("z", 20), var("y", 25), 20),
        ],
    );
    let env = env(&[("x", Type::Int), ("y", Type::Int), ("z", Type::Int)]);
    let (_, _, diagnostics) = run(&routine, &env);

    // `z` is left initialized at the end; `x` and `y` are finalized.
    assert_eq!(codes(&diagnostics), [ErrorCode::E3002, ErrorCode::E3006]);
    assert_eq!(
        diagnostics[0].message,
        "cannot finalize `x` as it has not been initialized"
    );
    assert_eq!(diagnostics[0].secondary_labels().count(), 0);
    assert_eq!(
        diagnostics[1].message,
        "variable `z` is not finalized at the end of the routine"
    );
    assert_eq!(diagnostics[1].primary_span(), Some(sp(20)));
}

#[test]
fn modifier_operands_must_be_initialized() {
    let modified = Instruction::ArithmeticAssignment {
        dst: var("y", 10),
        src: var("x", 15),
        modifier: Some(ArithmeticModifier {
            op: ModificationOp::Add,
            value: ArithmeticExpr::Value(var("k", 20)),
            span: Span::new(18, 22),
        }),
        span: Span::new(10, 22),
    };
    let routine = routine(vec![param("x", 1)], vec![param("y", 3)], vec![modified]);
    let env = env(&[("k", Type::Int), ("x", Type::Int), ("y", Type::Int)]);
    let (_, _, diagnostics) = run(&routine, &env);

    assert_eq!(codes(&diagnostics), [ErrorCode::E3004, ErrorCode::E3006]);
    assert_eq!(
        diagnostics[0].message,
        "cannot use `k` as it has not been initialized"
    );
    assert_eq!(diagnostics[0].primary_span(), Some(Span::new(18, 22)));
    // Never touched, so the end-of-routine error points at the declaration.
    assert_eq!(diagnostics[1].primary_span(), Some(sp(20)));
    assert_eq!(diagnostics[1].notes, ["its state at the end of the routine is: never assigned"]);
}

#[test]
fn dereferenced_storage_is_a_use() {
    let routine = routine(
        vec![],
        vec![param("y", 3)],
        vec![assign(var("y", 10), deref("p", 15), 10)],
    );
    let env = env(&[("p", Type::reference(Type::Int)), ("y", Type::Int)]);
    let (_, _, diagnostics) = run(&routine, &env);

    assert_eq!(codes(&diagnostics), [ErrorCode::E3004, ErrorCode::E3006]);
    assert_eq!(
        diagnostics[0].message,
        "cannot use `p` as it has not been initialized"
    );
    assert_eq!(diagnostics[0].primary_span(), Some(sp(15)));
}

#[test]
fn member_initialization_of_a_structure() {
    let routine = routine(
        vec![param("x", 1), param("z", 2)],
        vec![param("p", 3)],
        vec![
            assign(field("p", "a", 10), var("x", 15), 10),
            assign(field("p", "b", 20), var("z", 25), 20),
        ],
    );
    let env = env(&[("p", pair()), ("x", Type::Int), ("z", Type::Int)]);
    let (solution, end, diagnostics) = run(&routine, &env);

    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(
        end_state(&solution, end, "p"),
        LivenessState::Initialized(causes(&[Span::new(10, 13), Span::new(20, 23)]))
    );
}

#[test]
fn routine_end_reports_outputs_then_other_variables() {
    let routine = routine(vec![param("x", 1)], vec![param("y", 3)], vec![]);
    let env = env(&[("x", Type::Int), ("y", Type::Int)]);
    let (_, _, diagnostics) = run(&routine, &env);

    assert_eq!(codes(&diagnostics), [ErrorCode::E3005, ErrorCode::E3006]);
    assert_eq!(
        diagnostics[0].message,
        "output `y` is not initialized at the end of the routine"
    );
    assert_eq!(diagnostics[0].primary_span(), Some(sp(3)));
    assert_eq!(
        diagnostics[1].message,
        "variable `x` is not finalized at the end of the routine"
    );
    assert_eq!(diagnostics[1].primary_span(), Some(sp(1)));
}

/// ```text
///   0: (c == 0) -> T, F
///  20: T <-
///  30: y := x
///  40: -> J
///  50: F <-
///  70: -> K
///  80: J, K <- (c == 0)
/// ```
#[test]
fn conflict_is_reported_once_with_both_causes() {
    let routine = routine(
        vec![param("x", 100), param("c", 102)],
        vec![param("y", 104), param("c", 106)],
        vec![
            branch("c", "T", "F", 0),
            entry("T", 20),
            assign(var("y", 30), var("x", 35), 30),
            exit("J", 40),
            entry("F", 50),
            exit("K", 70),
            join("J", "K", "c", 80),
        ],
    );
    let env = env(&[("c", Type::Int), ("x", Type::Int), ("y", Type::Int)]);
    let (solution, end, diagnostics) = run(&routine, &env);

    // Ordering checks are skipped once a conflict is known.
    assert_eq!(codes(&diagnostics), [ErrorCode::E3001]);
    let conflict = &diagnostics[0];
    assert_eq!(
        conflict.message,
        "variable `x` has conflicting initializers and finalizers"
    );
    assert_eq!(conflict.primary_span(), Some(sp(100)));
    let labels: Vec<(Span, &str)> = conflict
        .secondary_labels()
        .map(|l| (l.span, l.message.as_str()))
        .collect();
    assert_eq!(
        labels,
        [
            (sp(35), "potential cause: finalizer here"),
            (sp(100), "potential cause: initializer here"),
        ]
    );

    assert!(end_state(&solution, end, "x").is_conflict());
    assert!(end_state(&solution, end, "y").is_initialized());
}

/// ```text
///   0: -> L
///  10: L, M <- (c == 0)
///  30: 0 := x
///  40: (c == 0) -> M, E
///  60: E <-
/// ```
#[test]
fn conflict_arising_in_a_loop_header_is_reported() {
    let routine = routine(
        vec![param("x", 100), param("c", 102)],
        vec![param("c", 106)],
        vec![
            exit("L", 0),
            join("L", "M", "c", 10),
            assign(int(0, 30), var("x", 35), 30),
            branch("c", "M", "E", 40),
            entry("E", 60),
        ],
    );
    let env = env(&[("c", Type::Int), ("x", Type::Int)]);
    let (solution, end, diagnostics) = run(&routine, &env);

    // Every conflicting block has a conflicting predecessor here.
    assert_eq!(codes(&diagnostics), [ErrorCode::E3001]);
    assert_eq!(diagnostics[0].primary_span(), Some(sp(100)));
    let labels: Vec<Span> = diagnostics[0].secondary_labels().map(|l| l.span).collect();
    assert_eq!(labels, [sp(35), sp(100)]);
    assert!(end_state(&solution, end, "x").is_conflict());
}

#[test]
fn members_consumed_in_different_blocks_do_not_conflict() {
    let routine = routine(
        vec![param("p", 1)],
        vec![param("x", 3), param("z", 4)],
        vec![
            assign(var("x", 10), field("p", "a", 15), 10),
            exit("L", 20),
            entry("L", 30),
            assign(var("z", 40), field("p", "b", 45), 40),
        ],
    );
    let env = env(&[("p", pair()), ("x", Type::Int), ("z", Type::Int)]);
    let (solution, end, diagnostics) = run(&routine, &env);

    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    assert_eq!(
        end_state(&solution, end, "p"),
        LivenessState::Finalized(causes(&[Span::new(15, 18), Span::new(45, 48)]))
    );
}

#[test]
fn begin_block_alone_starts_with_inputs() {
    let routine = routine(vec![param("x", 1)], vec![param("y", 3)], vec![]);
    let env = env(&[("x", Type::Int), ("y", Type::Int)]);
    let mut queue = DiagnosticQueue::new();
    let graph = ControlGraph::build(&routine, &mut queue);
    let Ok(problem) = LivenessProblem::new(&graph, &env, &[routine.inputs[0].name.clone()]) else {
        panic!("problem should build");
    };

    let begin_in = problem.initial_in(graph.begin());
    assert_eq!(begin_in.get(&path("x")), Ok(LivenessState::initialized_at(sp(1))));
    assert_eq!(begin_in.get(&path("y")), Ok(LivenessState::Unknown));
    assert_eq!(problem.initial_out(graph.begin()).get(&path("x")), Ok(LivenessState::Unknown));
}
