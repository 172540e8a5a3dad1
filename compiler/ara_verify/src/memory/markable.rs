//! Marking trees shaped like the value behind a reference.

use std::fmt;

use ara_ir::{Name, Type, TypeTable};

use crate::paths::{MemoryPath, MemorySegment};

use super::MarkingError;

/// One flag per location of a value, materialized on demand.
///
/// - `Leaf`: a builtin value, marked or not.
/// - `Reference`: marked as a whole, or through the value it points to.
///   The pointee is only built when a path dereferences it.
/// - `Structure`: marked when any member is marked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkableMemory {
    Leaf {
        marked: bool,
    },
    Reference {
        base: Type,
        target: Option<Box<MarkableMemory>>,
        self_marked: bool,
    },
    Structure(Vec<(Name, MarkableMemory)>),
}

impl MarkableMemory {
    /// An unmarked tree for a value of type `ty`.
    ///
    /// Named types are resolved through `types`. Expansion stops at
    /// references, so only a structure containing itself by value fails.
    pub fn unmarked(ty: &Type, types: &TypeTable) -> Result<Self, MarkingError> {
        Self::build(ty, types, &mut Vec::new())
    }

    fn build(ty: &Type, types: &TypeTable, expanding: &mut Vec<Name>) -> Result<Self, MarkingError> {
        let depth = expanding.len();
        if let Type::Named(name) = ty {
            if expanding.contains(name) {
                return Err(MarkingError::InfiniteType(name.clone()));
            }
            expanding.push(name.clone());
        }

        let memory = match types.resolve(ty)? {
            Type::Reference(base) => MarkableMemory::pointing_to(base),
            Type::Structure(members) => {
                let mut entries = Vec::with_capacity(members.len());
                for member in members {
                    entries.push((member.name.clone(), Self::build(&member.ty, types, expanding)?));
                }
                MarkableMemory::Structure(entries)
            }
            Type::Int | Type::Comparison | Type::Unit | Type::Named(_) => {
                MarkableMemory::Leaf { marked: false }
            }
        };
        expanding.truncate(depth);
        Ok(memory)
    }

    /// An unmarked reference to a value of type `base`.
    pub fn pointing_to(base: &Type) -> Self {
        MarkableMemory::Reference {
            base: base.clone(),
            target: None,
            self_marked: false,
        }
    }

    pub fn is_marked(&self) -> bool {
        match self {
            MarkableMemory::Leaf { marked } => *marked,
            MarkableMemory::Reference {
                target,
                self_marked,
                ..
            } => target.as_ref().map_or(*self_marked, |target| target.is_marked()),
            MarkableMemory::Structure(members) => members.iter().any(|(_, m)| m.is_marked()),
        }
    }

    /// Mark this location and everything inside it.
    pub fn set_marked(&mut self) {
        match self {
            MarkableMemory::Leaf { marked } => *marked = true,
            MarkableMemory::Reference {
                target,
                self_marked,
                ..
            } => {
                *self_marked = true;
                *target = None;
            }
            MarkableMemory::Structure(members) => {
                for (_, member) in members {
                    member.set_marked();
                }
            }
        }
    }

    /// Step from this location along `segment`.
    ///
    /// `at` is the path of this location, used for errors. Dereferencing a
    /// reference that is already marked as a whole yields a marked pointee.
    pub fn access(
        &mut self,
        segment: &MemorySegment,
        at: &MemoryPath,
        types: &TypeTable,
    ) -> Result<&mut MarkableMemory, MarkingError> {
        match (self, segment) {
            (
                MarkableMemory::Reference {
                    base,
                    target,
                    self_marked,
                },
                MemorySegment::Deref,
            ) => {
                if target.is_none() {
                    let mut pointee = MarkableMemory::unmarked(base, types)?;
                    if *self_marked {
                        pointee.set_marked();
                    }
                    *target = Some(Box::new(pointee));
                }
                target
                    .as_deref_mut()
                    .ok_or_else(|| MarkingError::NotAReference(at.clone()))
            }
            (MarkableMemory::Structure(members), MemorySegment::Member(name)) => members
                .iter_mut()
                .find(|(member, _)| member == name)
                .map(|(_, memory)| memory)
                .ok_or_else(|| MarkingError::UnknownMember {
                    path: at.clone(),
                    member: name.clone(),
                }),
            (_, MemorySegment::Deref) => Err(MarkingError::NotAReference(at.clone())),
            (_, MemorySegment::Member(name)) => Err(MarkingError::NotAStructure {
                path: at.clone(),
                member: name.clone(),
            }),
        }
    }

    fn member(&self, name: &Name) -> Option<&MarkableMemory> {
        match self {
            MarkableMemory::Structure(members) => {
                members.iter().find(|(member, _)| member == name).map(|(_, m)| m)
            }
            MarkableMemory::Leaf { .. } | MarkableMemory::Reference { .. } => None,
        }
    }

    fn target(&self) -> Option<&MarkableMemory> {
        match self {
            MarkableMemory::Reference { target, .. } => target.as_deref(),
            MarkableMemory::Leaf { .. } | MarkableMemory::Structure(_) => None,
        }
    }

    fn is_self_marked(&self) -> bool {
        matches!(
            self,
            MarkableMemory::Reference {
                self_marked: true,
                ..
            }
        )
    }
}

/// Locations marked in `minuend` but not in `subtrahend`, below `current`.
///
/// A missing subtrahend stands for an unmarked tree of the same shape. A
/// structure that is entirely marked on one side and untouched on the other
/// is reported by its own path instead of member by member.
pub fn subtract(
    current: &MemoryPath,
    minuend: &MarkableMemory,
    subtrahend: Option<&MarkableMemory>,
) -> Vec<MemoryPath> {
    if !minuend.is_marked() {
        return Vec::new();
    }
    let subtrahend_marked = subtrahend.is_some_and(MarkableMemory::is_marked);

    match minuend {
        MarkableMemory::Leaf { .. } => {
            if subtrahend_marked {
                Vec::new()
            } else {
                vec![current.clone()]
            }
        }
        MarkableMemory::Reference {
            target,
            self_marked,
            ..
        } => {
            if subtrahend.is_some_and(MarkableMemory::is_self_marked) {
                Vec::new()
            } else if *self_marked {
                vec![current.clone()]
            } else {
                match target {
                    Some(target) => subtract(
                        &current.with_deref(),
                        target,
                        subtrahend.and_then(MarkableMemory::target),
                    ),
                    None => Vec::new(),
                }
            }
        }
        MarkableMemory::Structure(members) => {
            if !subtrahend_marked && members.iter().all(|(_, m)| m.is_marked()) {
                return vec![current.clone()];
            }
            members
                .iter()
                .flat_map(|(name, member)| {
                    subtract(
                        &current.with_member(name.clone()),
                        member,
                        subtrahend.and_then(|other| other.member(name)),
                    )
                })
                .collect()
        }
    }
}

impl fmt::Display for MarkableMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkableMemory::Leaf { marked } => f.write_str(if *marked { "#" } else { "_" }),
            MarkableMemory::Reference {
                target: Some(target),
                ..
            } => write!(f, "&{target}"),
            MarkableMemory::Reference { self_marked, .. } => {
                f.write_str(if *self_marked { "&#" } else { "&_" })
            }
            MarkableMemory::Structure(members) => {
                f.write_str("{")?;
                for (i, (name, member)) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {member}")?;
                }
                f.write_str("}")
            }
        }
    }
}
