//! Resource and memory paths.
//!
//! A [`ResourcePath`] names a local storage slot: a variable followed by
//! member accesses (`p.pos.x`). A [`MemoryPath`] names a location reached
//! through a reference: a resource path followed by dereference and member
//! steps (`p&.next&`). Every analysis keys its state by these.
//!
//! The derivation functions are total over the expression grammar. An
//! expression either denotes locations or it does not; nothing here fails.

use std::fmt;

use ara_ir::ast::{
    ArithmeticExpr, ConditionalExpr, Instruction, Memory, ResourceExpr, Storage,
};
use ara_ir::Name;
use smallvec::{smallvec, SmallVec};

/// A variable plus member accesses. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourcePath {
    segments: SmallVec<[Name; 2]>,
}

impl ResourcePath {
    /// The path of a whole variable.
    pub fn root(variable: impl Into<Name>) -> Self {
        ResourcePath {
            segments: smallvec![variable.into()],
        }
    }

    /// A variable followed by the given members.
    pub fn new(variable: impl Into<Name>, members: impl IntoIterator<Item = Name>) -> Self {
        let mut path = Self::root(variable);
        path.segments.extend(members);
        path
    }

    /// The variable this path starts at.
    #[inline]
    pub fn variable(&self) -> &Name {
        &self.segments[0]
    }

    #[inline]
    pub fn segments(&self) -> &[Name] {
        &self.segments
    }

    /// Number of segments, including the variable.
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; paths have at least the variable segment.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn with_member(&self, member: Name) -> Self {
        let mut segments = self.segments.clone();
        segments.push(member);
        ResourcePath { segments }
    }

    /// The first `len` segments (at least the variable).
    #[must_use]
    pub fn prefix(&self, len: usize) -> Self {
        let len = len.clamp(1, self.segments.len());
        ResourcePath {
            segments: self.segments[..len].iter().cloned().collect(),
        }
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// One step taken from a reference-valued resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemorySegment {
    /// `&`
    Deref,
    /// `.name`
    Member(Name),
}

impl fmt::Display for MemorySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemorySegment::Deref => f.write_str("&"),
            MemorySegment::Member(name) => write!(f, ".{name}"),
        }
    }
}

/// A resource path followed by dereference and member steps.
///
/// `p&.x` is `{ resource: p, segments: [Deref, Member(x)] }`. A memory path
/// with no segments names the reference slot itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryPath {
    pub resource: ResourcePath,
    pub segments: Vec<MemorySegment>,
}

impl MemoryPath {
    pub fn of_resource(resource: ResourcePath) -> Self {
        MemoryPath {
            resource,
            segments: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_deref(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.push(MemorySegment::Deref);
        MemoryPath {
            resource: self.resource.clone(),
            segments,
        }
    }

    #[must_use]
    pub fn with_member(&self, member: Name) -> Self {
        let mut segments = self.segments.clone();
        segments.push(MemorySegment::Member(member));
        MemoryPath {
            resource: self.resource.clone(),
            segments,
        }
    }
}

impl fmt::Display for MemoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource)?;
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

// Derivation

/// The slot a storage expression denotes. Type annotations are transparent.
pub fn resource_path(storage: &Storage) -> ResourcePath {
    match storage {
        Storage::Named(ident) => ResourcePath::root(ident.name.clone()),
        Storage::Typed { storage, .. } => resource_path(storage),
        Storage::MemberAccess {
            storage, member, ..
        } => resource_path(storage).with_member(member.name.clone()),
    }
}

/// Every slot a resource expression consumes or produces.
///
/// Literals denote nothing. Allocations and structure literals denote what
/// their parts denote. Memory expressions are addressed by [`MemoryPath`]
/// instead and yield nothing here.
pub fn resource_paths(expr: &ResourceExpr) -> Vec<ResourcePath> {
    let mut paths = Vec::new();
    collect_resource_paths(expr, &mut paths);
    paths
}

fn collect_resource_paths(expr: &ResourceExpr, out: &mut Vec<ResourcePath>) {
    match expr {
        ResourceExpr::Storage(storage) => out.push(resource_path(storage)),
        ResourceExpr::Allocation { value, .. } => collect_resource_paths(value, out),
        ResourceExpr::StructureLiteral { members, .. } => {
            for member in members {
                collect_resource_paths(&member.value, out);
            }
        }
        ResourceExpr::IntegerLiteral { .. }
        | ResourceExpr::NullReference { .. }
        | ResourceExpr::Memory(_) => {}
    }
}

/// Slots read by an arithmetic modifier.
pub fn arithmetic_paths(expr: &ArithmeticExpr) -> Vec<ResourcePath> {
    let mut paths = Vec::new();
    for operand in expr.operands() {
        collect_resource_paths(operand, &mut paths);
    }
    paths
}

/// Slots read by a condition.
pub fn condition_paths(expr: &ConditionalExpr) -> Vec<ResourcePath> {
    let mut paths = Vec::new();
    for operand in expr.operands() {
        collect_resource_paths(operand, &mut paths);
    }
    paths
}

/// The location a memory expression denotes.
pub fn memory_path(memory: &Memory) -> MemoryPath {
    match memory {
        Memory::DereferencedStorage { storage, .. } => {
            MemoryPath::of_resource(resource_path(storage)).with_deref()
        }
        Memory::DereferencedMemory { memory, .. } => memory_path(memory).with_deref(),
        Memory::MemberAccess { memory, member, .. } => {
            memory_path(memory).with_member(member.name.clone())
        }
    }
}

/// Memory sub-expressions of a resource expression, left to right.
pub fn memory_references(expr: &ResourceExpr) -> Vec<&Memory> {
    let mut refs = Vec::new();
    collect_memory_references(expr, &mut refs);
    refs
}

fn collect_memory_references<'e>(expr: &'e ResourceExpr, out: &mut Vec<&'e Memory>) {
    match expr {
        ResourceExpr::Memory(memory) => out.push(memory),
        ResourceExpr::Allocation { value, .. } => collect_memory_references(value, out),
        ResourceExpr::StructureLiteral { members, .. } => {
            for member in members {
                collect_memory_references(&member.value, out);
            }
        }
        ResourceExpr::IntegerLiteral { .. }
        | ResourceExpr::NullReference { .. }
        | ResourceExpr::Storage(_) => {}
    }
}

// Instruction resources

/// Expressions whose resources an instruction produces.
pub fn created_resources(instruction: &Instruction) -> &[ResourceExpr] {
    match instruction {
        Instruction::ArithmeticAssignment { dst, .. } => std::slice::from_ref(dst),
        Instruction::MultiAssignment { dsts, .. } | Instruction::Call { dsts, .. } => dsts,
        Instruction::Unconditional { .. } | Instruction::Conditional { .. } => &[],
    }
}

/// Expressions whose resources an instruction consumes.
pub fn destroyed_resources(instruction: &Instruction) -> &[ResourceExpr] {
    match instruction {
        Instruction::ArithmeticAssignment { src, .. } => std::slice::from_ref(src),
        Instruction::MultiAssignment { srcs, .. } | Instruction::Call { srcs, .. } => srcs,
        Instruction::Unconditional { .. } | Instruction::Conditional { .. } => &[],
    }
}
