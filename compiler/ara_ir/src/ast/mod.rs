//! Instruction-level syntax tree.
//!
//! This is the shape the parser hands to the verifier. Every node carries a
//! [`Span`]; nothing here is resolved or checked. Grammars are closed enums
//! so that every consumer matches exhaustively.
//!
//! ```text
//! routine r(x: Int) -> (y: Int) {
//!     y := x
//! }
//! ```

use crate::{Direction, Ident, Span};

/// A whole compilation unit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Program {
    pub definitions: Vec<Definition>,
}

impl Program {
    /// All routine definitions, in source order.
    pub fn routines(&self) -> impl Iterator<Item = &RoutineDef> {
        self.definitions.iter().filter_map(|definition| match definition {
            Definition::Routine(routine) => Some(routine),
            Definition::Type(_) => None,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Definition {
    Type(TypeDef),
    Routine(RoutineDef),
}

/// `type Name = Type`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TypeDef {
    pub name: Ident,
    pub ty: TypeExpr,
    pub span: Span,
}

/// `routine name(inputs) -> (outputs) { body }`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoutineDef {
    pub name: Ident,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    pub body: Vec<Instruction>,
    pub span: Span,
}

/// A routine parameter with an optional declared type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: Option<TypeExpr>,
    pub span: Span,
}

/// A type as written in source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TypeExpr {
    /// `Int`, `Point`
    Named(Ident),
    /// `&T`
    Reference { base: Box<TypeExpr>, span: Span },
    /// `{ a: T, b: U }`
    Structure { members: Vec<TypeMember>, span: Span },
}

impl TypeExpr {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Named(ident) => ident.span,
            TypeExpr::Reference { span, .. } | TypeExpr::Structure { span, .. } => *span,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TypeMember {
    pub name: Ident,
    pub ty: TypeExpr,
}

/// One instruction of a routine body.
///
/// `Unconditional` and `Conditional` are control instructions: with
/// [`Direction::Forward`] they are exit points that close the current block,
/// with [`Direction::Backward`] they are entry points that open a new one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Instruction {
    /// `dst := src` or `dst := src OP (value)`
    ArithmeticAssignment {
        dst: ResourceExpr,
        src: ResourceExpr,
        modifier: Option<ArithmeticModifier>,
        span: Span,
    },
    /// `(d1, ..., dn) := (s1, ..., sn)`
    MultiAssignment {
        dsts: Vec<ResourceExpr>,
        srcs: Vec<ResourceExpr>,
        span: Span,
    },
    /// `(d1, ...) := call r(s1, ...)` or `uncall`
    Call {
        dsts: Vec<ResourceExpr>,
        srcs: Vec<ResourceExpr>,
        direction: Direction,
        routine: Ident,
        span: Span,
    },
    /// `-> L` or `L <-`
    Unconditional {
        direction: Direction,
        label: Ident,
        span: Span,
    },
    /// `(c) -> L1, L2` or `L1, L2 <- (c)`
    Conditional {
        direction: Direction,
        lhs_label: Ident,
        rhs_label: Ident,
        condition: ConditionalExpr,
        span: Span,
    },
}

impl Instruction {
    pub fn span(&self) -> Span {
        match self {
            Instruction::ArithmeticAssignment { span, .. }
            | Instruction::MultiAssignment { span, .. }
            | Instruction::Call { span, .. }
            | Instruction::Unconditional { span, .. }
            | Instruction::Conditional { span, .. } => *span,
        }
    }

    /// The direction of a control instruction, `None` for everything else.
    pub fn control_direction(&self) -> Option<Direction> {
        match self {
            Instruction::Unconditional { direction, .. }
            | Instruction::Conditional { direction, .. } => Some(*direction),
            Instruction::ArithmeticAssignment { .. }
            | Instruction::MultiAssignment { .. }
            | Instruction::Call { .. } => None,
        }
    }

    #[inline]
    pub fn is_entry_point(&self) -> bool {
        self.control_direction() == Some(Direction::Backward)
    }

    #[inline]
    pub fn is_exit_point(&self) -> bool {
        self.control_direction() == Some(Direction::Forward)
    }

    /// Labels named by a control instruction, left to right.
    pub fn labels(&self) -> impl Iterator<Item = &Ident> {
        let (first, second) = match self {
            Instruction::Unconditional { label, .. } => (Some(label), None),
            Instruction::Conditional {
                lhs_label,
                rhs_label,
                ..
            } => (Some(lhs_label), Some(rhs_label)),
            Instruction::ArithmeticAssignment { .. }
            | Instruction::MultiAssignment { .. }
            | Instruction::Call { .. } => (None, None),
        };
        first.into_iter().chain(second)
    }
}

/// `OP (value)` trailing an arithmetic assignment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArithmeticModifier {
    pub op: ModificationOp,
    pub value: ArithmeticExpr,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ModificationOp {
    Add,
    Sub,
    Xor,
}

/// An expression that initializes or finalizes resources.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResourceExpr {
    IntegerLiteral { value: i64, span: Span },
    /// `null`
    NullReference { span: Span },
    /// `{ x = e1, y = e2 }`
    StructureLiteral {
        members: Vec<StructureMember>,
        span: Span,
    },
    /// `&value`
    Allocation { value: Box<ResourceExpr>, span: Span },
    Storage(Storage),
    Memory(Memory),
}

impl ResourceExpr {
    pub fn span(&self) -> Span {
        match self {
            ResourceExpr::IntegerLiteral { span, .. }
            | ResourceExpr::NullReference { span }
            | ResourceExpr::StructureLiteral { span, .. }
            | ResourceExpr::Allocation { span, .. } => *span,
            ResourceExpr::Storage(storage) => storage.span(),
            ResourceExpr::Memory(memory) => memory.span(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StructureMember {
    pub name: Ident,
    pub value: ResourceExpr,
}

/// A modifiable local slot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Storage {
    /// `x`
    Named(Ident),
    /// `x : T`
    Typed {
        storage: Box<Storage>,
        ty: TypeExpr,
        span: Span,
    },
    /// `s.member`
    MemberAccess {
        storage: Box<Storage>,
        member: Ident,
        span: Span,
    },
}

impl Storage {
    pub fn span(&self) -> Span {
        match self {
            Storage::Named(ident) => ident.span,
            Storage::Typed { span, .. } | Storage::MemberAccess { span, .. } => *span,
        }
    }

    /// The local variable this storage is rooted at.
    pub fn root(&self) -> &Ident {
        let mut current = self;
        loop {
            match current {
                Storage::Named(ident) => return ident,
                Storage::Typed { storage, .. } | Storage::MemberAccess { storage, .. } => {
                    current = storage;
                }
            }
        }
    }
}

/// A location reached through a reference.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Memory {
    /// `s&`
    DereferencedStorage { storage: Storage, span: Span },
    /// `m&`
    DereferencedMemory { memory: Box<Memory>, span: Span },
    /// `m.member`
    MemberAccess {
        memory: Box<Memory>,
        member: Ident,
        span: Span,
    },
}

impl Memory {
    pub fn span(&self) -> Span {
        match self {
            Memory::DereferencedStorage { span, .. }
            | Memory::DereferencedMemory { span, .. }
            | Memory::MemberAccess { span, .. } => *span,
        }
    }

    /// The storage whose reference is followed first.
    pub fn dereferenced_storage(&self) -> &Storage {
        let mut current = self;
        loop {
            match current {
                Memory::DereferencedStorage { storage, .. } => return storage,
                Memory::DereferencedMemory { memory, .. } | Memory::MemberAccess { memory, .. } => {
                    current = memory;
                }
            }
        }
    }
}

/// The value of an arithmetic modifier. Reads resources, never consumes them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ArithmeticExpr {
    Binary {
        lhs: ResourceExpr,
        op: BinaryOp,
        rhs: ResourceExpr,
        span: Span,
    },
    Value(ResourceExpr),
}

impl ArithmeticExpr {
    pub fn span(&self) -> Span {
        match self {
            ArithmeticExpr::Binary { span, .. } => *span,
            ArithmeticExpr::Value(value) => value.span(),
        }
    }

    /// Operands, left to right.
    pub fn operands(&self) -> impl Iterator<Item = &ResourceExpr> {
        let (first, second) = match self {
            ArithmeticExpr::Binary { lhs, rhs, .. } => (lhs, Some(rhs)),
            ArithmeticExpr::Value(value) => (value, None),
        };
        std::iter::once(first).chain(second)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Xor,
    Mul,
    Div,
    Mod,
}

/// The condition of a conditional entry or exit point.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConditionalExpr {
    Comparison {
        lhs: ResourceExpr,
        op: ComparisonOp,
        rhs: ResourceExpr,
        span: Span,
    },
}

impl ConditionalExpr {
    pub fn span(&self) -> Span {
        match self {
            ConditionalExpr::Comparison { span, .. } => *span,
        }
    }

    /// Operands, left to right.
    pub fn operands(&self) -> impl Iterator<Item = &ResourceExpr> {
        match self {
            ConditionalExpr::Comparison { lhs, rhs, .. } => [lhs, rhs].into_iter(),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}
