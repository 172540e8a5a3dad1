//! Resolved structural types and per-routine environments.
//!
//! Type inference runs before verification and produces these. The verifier
//! only reads them to lay out storage descriptors and marking trees.
//!
//! Types refer to user definitions by name through [`Type::Named`], which
//! is what makes recursive types expressible (`type List = { head: Int,
//! tail: &List }`). Names are looked up in a shared [`TypeTable`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::ast::TypeExpr;
use crate::Name;

/// A fully resolved type.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Type {
    Int,
    Comparison,
    /// The empty structure `{ }`.
    Unit,
    Reference(Box<Type>),
    /// Non-empty, members in declaration order.
    Structure(Vec<Member>),
    Named(Name),
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Member {
    pub name: Name,
    pub ty: Type,
}

impl Member {
    pub fn new(name: impl Into<Name>, ty: Type) -> Self {
        Member {
            name: name.into(),
            ty,
        }
    }
}

impl Type {
    /// A structure of the given members, or `Unit` if there are none.
    pub fn structure(members: Vec<Member>) -> Type {
        if members.is_empty() {
            Type::Unit
        } else {
            Type::Structure(members)
        }
    }

    pub fn reference(base: Type) -> Type {
        Type::Reference(Box::new(base))
    }

    /// Translate a written type. `Int` is the only builtin name; every
    /// other name refers to a user definition.
    pub fn from_type_expr(expr: &TypeExpr) -> Type {
        match expr {
            TypeExpr::Named(ident) if ident.name.as_str() == "Int" => Type::Int,
            TypeExpr::Named(ident) => Type::Named(ident.name.clone()),
            TypeExpr::Reference { base, .. } => Type::reference(Type::from_type_expr(base)),
            TypeExpr::Structure { members, .. } => Type::structure(
                members
                    .iter()
                    .map(|m| Member::new(m.name.name.clone(), Type::from_type_expr(&m.ty)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => f.write_str("Int"),
            Type::Comparison => f.write_str("Comparison"),
            Type::Unit => f.write_str("{ }"),
            Type::Reference(base) => write!(f, "&{base}"),
            Type::Structure(members) => {
                f.write_str("{")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", member.name, member.ty)?;
                }
                f.write_str("}")
            }
            Type::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Failure to resolve a [`Type::Named`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TypeError {
    #[error("type `{0}` is not defined")]
    Undefined(Name),
    #[error("type `{0}` is defined in terms of itself")]
    Cyclic(Name),
}

/// User type definitions, shared read-only by every routine of a program.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TypeTable {
    definitions: BTreeMap<Name, Type>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `name`. Returns `false` and keeps the old definition if the
    /// name was already taken.
    pub fn define(&mut self, name: impl Into<Name>, ty: Type) -> bool {
        let name = name.into();
        if self.definitions.contains_key(&name) {
            return false;
        }
        self.definitions.insert(name, ty);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.definitions.get(name)
    }

    /// Follow `Named` indirections until a structural type is reached.
    ///
    /// Only the outermost layer is resolved; members and reference targets
    /// may still be `Named`.
    pub fn resolve<'a>(&'a self, ty: &'a Type) -> Result<&'a Type, TypeError> {
        let mut current = ty;
        let mut seen = BTreeSet::new();
        while let Type::Named(name) = current {
            if !seen.insert(name) {
                return Err(TypeError::Cyclic(name.clone()));
            }
            current = self
                .definitions
                .get(name)
                .ok_or_else(|| TypeError::Undefined(name.clone()))?;
        }
        Ok(current)
    }
}

/// The resolved variables of one routine.
///
/// Variables are kept ordered by name, which fixes the layout of every
/// descriptor built from the environment.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    types: Arc<TypeTable>,
    variables: BTreeMap<Name, Type>,
}

impl Environment {
    pub fn new(types: Arc<TypeTable>) -> Self {
        Environment {
            types,
            variables: BTreeMap::new(),
        }
    }

    /// Builder-style [`Environment::declare`].
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<Name>, ty: Type) -> Self {
        self.declare(name, ty);
        self
    }

    /// Record the type of a variable, replacing an earlier entry.
    pub fn declare(&mut self, name: impl Into<Name>, ty: Type) {
        self.variables.insert(name.into(), ty);
    }

    pub fn variable(&self, name: &str) -> Option<&Type> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Variables in name order.
    pub fn variables(&self) -> impl Iterator<Item = (&Name, &Type)> {
        self.variables.iter()
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// See [`TypeTable::resolve`].
    pub fn resolve<'a>(&'a self, ty: &'a Type) -> Result<&'a Type, TypeError> {
        self.types.resolve(ty)
    }
}
