//! Memory marking: balanced creation and destruction within one instruction.
//!
//! Liveness tracks local slots. Locations reached through references are
//! checked here instead, one instruction at a time and independently of any
//! control flow. For every instruction two marking passes run, one over the
//! memory it destroys and one over the memory it creates:
//!
//! 1. marking a location twice in one pass is an error;
//! 2. whatever one pass marked and the other did not is unbalanced.
//!
//! ```text
//! (p&.a, p&.b) := (p&.b, p&.a)   balanced, a swap
//! p&.a := p&.a, p&.a             `p&.a` destroyed twice
//! q& := p&.a                     `q&` created, `p&.a` destroyed
//! ```

mod markable;

use std::fmt;

use ara_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use ara_ir::ast::{Instruction, ResourceExpr, RoutineDef};
use ara_ir::{Environment, Name, Type, TypeError, TypeTable};

use crate::paths::{
    created_resources, destroyed_resources, memory_path, memory_references, MemoryPath,
    MemorySegment,
};
use crate::storage::{StorageDescriptor, StorageError};

pub use markable::{subtract, MarkableMemory};

/// Failure to follow a memory path through a marking tree.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MarkingError {
    #[error("`{0}` is not a reference and cannot be dereferenced")]
    NotAReference(MemoryPath),
    #[error("`{path}` is not a structure, so it has no member `{member}`")]
    NotAStructure { path: MemoryPath, member: Name },
    #[error("`{path}` has no member `{member}`")]
    UnknownMember { path: MemoryPath, member: Name },
    #[error("type `{0}` contains itself without a reference")]
    InfiniteType(Name),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// One marking tree per reference-typed leaf of a routine's variables.
#[derive(Clone, Debug)]
pub struct MarkingDescriptor<'e> {
    slots: StorageDescriptor<Option<MarkableMemory>>,
    types: &'e TypeTable,
}

impl<'e> MarkingDescriptor<'e> {
    /// Nothing marked.
    pub fn new(env: &'e Environment) -> Result<Self, StorageError> {
        let slots = StorageDescriptor::from_environment(env, |ty| {
            if let Type::Reference(base) = ty {
                Some(MarkableMemory::pointing_to(base))
            } else {
                None
            }
        })?;
        Ok(MarkingDescriptor {
            slots,
            types: env.types(),
        })
    }

    /// Mark the location `path` names. Returns whether it was marked before.
    pub fn mark(&mut self, path: &MemoryPath) -> Result<bool, MarkingError> {
        let types = self.types;
        let mut at = MemoryPath::of_resource(path.resource.clone());
        let mut memory = self
            .slots
            .leaf_mut(&path.resource)?
            .as_mut()
            .ok_or_else(|| MarkingError::NotAReference(at.clone()))?;

        for segment in &path.segments {
            memory = memory.access(segment, &at, types)?;
            at = match segment {
                MemorySegment::Deref => at.with_deref(),
                MemorySegment::Member(member) => at.with_member(member.clone()),
            };
        }

        let was_marked = memory.is_marked();
        memory.set_marked();
        Ok(was_marked)
    }

    /// Locations marked here but not in `other`, in layout order.
    pub fn difference(&self, other: &Self) -> Vec<MemoryPath> {
        let mut result = Vec::new();
        for key in self.slots.keys() {
            let Ok(Some(mine)) = self.slots.leaf(&key) else {
                continue;
            };
            let theirs = other.slots.leaf(&key).ok().and_then(Option::as_ref);
            result.extend(subtract(&MemoryPath::of_resource(key), mine, theirs));
        }
        result
    }
}

impl fmt::Display for MarkingDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for key in self.slots.keys() {
            if let Ok(Some(memory)) = self.slots.leaf(&key) {
                if !first {
                    f.write_str("\n")?;
                }
                first = false;
                write!(f, "{key}: {memory}")?;
            }
        }
        Ok(())
    }
}

/// Both marking passes of one instruction.
#[derive(Clone, Debug)]
pub struct InstructionMarks<'e> {
    pub destroyed: MarkingDescriptor<'e>,
    pub created: MarkingDescriptor<'e>,
}

#[derive(Copy, Clone)]
enum Role {
    Destroyed,
    Created,
}

impl Role {
    fn verb(self) -> &'static str {
        match self {
            Role::Destroyed => "destroyed",
            Role::Created => "created",
        }
    }

    fn twice_code(self) -> ErrorCode {
        match self {
            Role::Destroyed => ErrorCode::E4001,
            Role::Created => ErrorCode::E4002,
        }
    }
}

/// Check every instruction of `routine`.
pub fn check_routine<'e>(
    routine: &RoutineDef,
    env: &'e Environment,
    queue: &mut DiagnosticQueue,
) -> Result<Vec<InstructionMarks<'e>>, StorageError> {
    let unmarked = MarkingDescriptor::new(env)?;
    let marks: Vec<InstructionMarks<'e>> = routine
        .body
        .iter()
        .map(|instruction| check_instruction(instruction, &unmarked, queue))
        .collect();
    tracing::debug!(
        routine = %routine.name,
        instructions = marks.len(),
        errors = queue.error_count(),
        "memory marking checked"
    );
    Ok(marks)
}

/// Mark what `instruction` destroys and creates, starting from `unmarked`.
///
/// Balance is only checked when every path could be followed.
pub fn check_instruction<'e>(
    instruction: &Instruction,
    unmarked: &MarkingDescriptor<'e>,
    queue: &mut DiagnosticQueue,
) -> InstructionMarks<'e> {
    let mut failed = false;
    let destroyed = mark_all(
        unmarked,
        destroyed_resources(instruction),
        Role::Destroyed,
        queue,
        &mut failed,
    );
    let created = mark_all(
        unmarked,
        created_resources(instruction),
        Role::Created,
        queue,
        &mut failed,
    );

    if !failed {
        let created_only = created.difference(&destroyed);
        if !created_only.is_empty() {
            queue.add(
                Diagnostic::error(ErrorCode::E4003)
                    .with_message("memory resources must be destroyed before they are created")
                    .with_label(instruction.span(), "in this assignment")
                    .with_note(format!(
                        "created but not destroyed: {}",
                        path_list(&created_only)
                    )),
            );
        }
        let destroyed_only = destroyed.difference(&created);
        if !destroyed_only.is_empty() {
            queue.add(
                Diagnostic::error(ErrorCode::E4004)
                    .with_message("memory resources must be created after they are destroyed")
                    .with_label(instruction.span(), "in this assignment")
                    .with_note(format!(
                        "destroyed but not created: {}",
                        path_list(&destroyed_only)
                    )),
            );
        }
    }

    InstructionMarks { destroyed, created }
}

fn mark_all<'e>(
    unmarked: &MarkingDescriptor<'e>,
    resources: &[ResourceExpr],
    role: Role,
    queue: &mut DiagnosticQueue,
    failed: &mut bool,
) -> MarkingDescriptor<'e> {
    let mut marks = unmarked.clone();
    for memory in resources.iter().flat_map(memory_references) {
        let path = memory_path(memory);
        match marks.mark(&path) {
            Ok(false) => {}
            Ok(true) => {
                queue.add(
                    Diagnostic::error(role.twice_code())
                        .with_message(format!(
                            "memory resource `{path}` has already been {} by this assignment",
                            role.verb()
                        ))
                        .with_label(memory.span(), format!("{} again here", role.verb())),
                );
            }
            Err(error) => {
                tracing::warn!(%path, %error, "memory marking failed");
                *failed = true;
                queue.add(
                    Diagnostic::error(ErrorCode::E4005)
                        .with_message(format!("invalid memory access `{path}`"))
                        .with_label(memory.span(), "accessed here")
                        .with_note(error.to_string()),
                );
            }
        }
    }
    marks
}

fn path_list(paths: &[MemoryPath]) -> String {
    paths
        .iter()
        .map(|path| format!("`{path}`"))
        .collect::<Vec<_>>()
        .join(", ")
}
