//! Storage descriptors: per-variable trees shaped like resolved types.
//!
//! A [`StorageDescriptor`] mirrors the variable environment of one routine.
//! Structures become inner nodes with one entry per member; every other
//! type (builtins, references) becomes a leaf carrying one payload value.
//! Recursion stops at references, so recursive types built through `&`
//! produce finite trees.
//!
//! The payload is generic. Liveness stores a lattice value per leaf, memory
//! marking stores an optional marking tree per reference leaf. Reads of an
//! inner node go through [`Synthesize`], writes fan out to every leaf below
//! the addressed node.
//!
//! ```text
//! p: { x: Int, y: Int }     ├p
//! q: &Point                 │├x: +
//!                           │└y: -
//!                           └q: ?
//! ```

use std::fmt;

use ara_ir::{Environment, Name, Type, TypeError};

use crate::paths::ResourcePath;

/// Failure to build or address a descriptor.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("no resource `{0}` in this routine")]
    UnknownPath(ResourcePath),
    #[error("resource `{0}` is a structure, not a single value")]
    NotALeaf(ResourcePath),
    #[error("type `{0}` contains itself without a reference")]
    InfiniteType(Name),
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Aggregation of leaf values into a value for an inner node.
pub trait Synthesize: Clone {
    fn synthesize<'a>(leaves: impl Iterator<Item = &'a Self>) -> Self
    where
        Self: 'a;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DescriptorNode<V> {
    Leaf(V),
    Inner(Vec<DescriptorEntry<V>>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DescriptorEntry<V> {
    pub key: Name,
    pub node: DescriptorNode<V>,
}

impl<V> DescriptorNode<V> {
    fn child(&self, key: &Name) -> Option<&DescriptorNode<V>> {
        match self {
            DescriptorNode::Inner(entries) => entries.iter().find(|e| &e.key == key).map(|e| &e.node),
            DescriptorNode::Leaf(_) => None,
        }
    }

    fn child_mut(&mut self, key: &Name) -> Option<&mut DescriptorNode<V>> {
        match self {
            DescriptorNode::Inner(entries) => entries
                .iter_mut()
                .find(|e| &e.key == key)
                .map(|e| &mut e.node),
            DescriptorNode::Leaf(_) => None,
        }
    }

    fn for_each_leaf<'a>(&'a self, f: &mut impl FnMut(&'a V)) {
        match self {
            DescriptorNode::Leaf(value) => f(value),
            DescriptorNode::Inner(entries) => {
                for entry in entries {
                    entry.node.for_each_leaf(f);
                }
            }
        }
    }

    fn for_each_leaf_mut(&mut self, f: &mut impl FnMut(&mut V)) {
        match self {
            DescriptorNode::Leaf(value) => f(value),
            DescriptorNode::Inner(entries) => {
                for entry in entries {
                    entry.node.for_each_leaf_mut(f);
                }
            }
        }
    }

    fn zip_with(&self, other: &Self, f: &mut impl FnMut(&V, &V) -> V) -> Self
    where
        V: Clone,
    {
        match (self, other) {
            (DescriptorNode::Leaf(lhs), DescriptorNode::Leaf(rhs)) => DescriptorNode::Leaf(f(lhs, rhs)),
            (DescriptorNode::Inner(lhs), DescriptorNode::Inner(rhs)) => DescriptorNode::Inner(
                lhs.iter()
                    .zip(rhs)
                    .map(|(l, r)| DescriptorEntry {
                        key: l.key.clone(),
                        node: l.node.zip_with(&r.node, f),
                    })
                    .collect(),
            ),
            // Descriptors of one environment always agree in shape.
            _ => self.clone(),
        }
    }

    fn collect_keys(&self, prefix: &ResourcePath, out: &mut Vec<ResourcePath>) {
        match self {
            DescriptorNode::Leaf(_) => out.push(prefix.clone()),
            DescriptorNode::Inner(entries) => {
                for entry in entries {
                    entry
                        .node
                        .collect_keys(&prefix.with_member(entry.key.clone()), out);
                }
            }
        }
    }
}

/// A tree of payload values addressed by [`ResourcePath`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageDescriptor<V> {
    variables: Vec<DescriptorEntry<V>>,
}

impl<V> StorageDescriptor<V> {
    /// Lay out one tree per variable of `env`, in name order.
    ///
    /// `leaf` produces the initial payload for each leaf from its resolved
    /// type.
    pub fn from_environment(
        env: &Environment,
        mut leaf: impl FnMut(&Type) -> V,
    ) -> Result<Self, StorageError> {
        let mut expanding = Vec::new();
        let mut variables = Vec::new();
        for (name, ty) in env.variables() {
            variables.push(DescriptorEntry {
                key: name.clone(),
                node: build_node(env, ty, &mut leaf, &mut expanding)?,
            });
        }
        Ok(StorageDescriptor { variables })
    }

    /// Variable names, in layout order.
    pub fn variables(&self) -> impl Iterator<Item = &Name> {
        self.variables.iter().map(|entry| &entry.key)
    }

    /// Paths of every leaf, depth first in layout order.
    pub fn keys(&self) -> Vec<ResourcePath> {
        let mut keys = Vec::new();
        for entry in &self.variables {
            entry
                .node
                .collect_keys(&ResourcePath::root(entry.key.clone()), &mut keys);
        }
        keys
    }

    pub fn node(&self, path: &ResourcePath) -> Result<&DescriptorNode<V>, StorageError> {
        let (variable, members) = split(path);
        let mut node = self
            .variables
            .iter()
            .find(|entry| &entry.key == variable)
            .map(|entry| &entry.node)
            .ok_or_else(|| StorageError::UnknownPath(path.prefix(1)))?;
        for (depth, member) in members.iter().enumerate() {
            node = node
                .child(member)
                .ok_or_else(|| StorageError::UnknownPath(path.prefix(depth + 2)))?;
        }
        Ok(node)
    }

    pub fn node_mut(&mut self, path: &ResourcePath) -> Result<&mut DescriptorNode<V>, StorageError> {
        let (variable, members) = split(path);
        let mut node = self
            .variables
            .iter_mut()
            .find(|entry| &entry.key == variable)
            .map(|entry| &mut entry.node)
            .ok_or_else(|| StorageError::UnknownPath(path.prefix(1)))?;
        for (depth, member) in members.iter().enumerate() {
            node = node
                .child_mut(member)
                .ok_or_else(|| StorageError::UnknownPath(path.prefix(depth + 2)))?;
        }
        Ok(node)
    }

    /// The payload of a leaf.
    pub fn leaf(&self, path: &ResourcePath) -> Result<&V, StorageError> {
        match self.node(path)? {
            DescriptorNode::Leaf(value) => Ok(value),
            DescriptorNode::Inner(_) => Err(StorageError::NotALeaf(path.clone())),
        }
    }

    pub fn leaf_mut(&mut self, path: &ResourcePath) -> Result<&mut V, StorageError> {
        match self.node_mut(path)? {
            DescriptorNode::Leaf(value) => Ok(value),
            DescriptorNode::Inner(_) => Err(StorageError::NotALeaf(path.clone())),
        }
    }

    /// Apply `f` to every leaf at or below `path`.
    pub fn update(
        &mut self,
        path: &ResourcePath,
        mut f: impl FnMut(&mut V),
    ) -> Result<(), StorageError> {
        self.node_mut(path)?.for_each_leaf_mut(&mut f);
        Ok(())
    }

    /// The value at `path`; synthesized from the leaves for inner nodes.
    pub fn get(&self, path: &ResourcePath) -> Result<V, StorageError>
    where
        V: Synthesize,
    {
        Ok(match self.node(path)? {
            DescriptorNode::Leaf(value) => value.clone(),
            inner @ DescriptorNode::Inner(_) => {
                let mut leaves = Vec::new();
                inner.for_each_leaf(&mut |value| leaves.push(value));
                V::synthesize(leaves.into_iter())
            }
        })
    }

    /// Combine two descriptors of the same environment leaf by leaf.
    #[must_use]
    pub fn zip_with(&self, other: &Self, mut f: impl FnMut(&V, &V) -> V) -> Self
    where
        V: Clone,
    {
        StorageDescriptor {
            variables: self
                .variables
                .iter()
                .zip(&other.variables)
                .map(|(l, r)| DescriptorEntry {
                    key: l.key.clone(),
                    node: l.node.zip_with(&r.node, &mut f),
                })
                .collect(),
        }
    }
}

fn split(path: &ResourcePath) -> (&Name, &[Name]) {
    let segments = path.segments();
    (&segments[0], &segments[1..])
}

fn build_node<V>(
    env: &Environment,
    ty: &Type,
    leaf: &mut impl FnMut(&Type) -> V,
    expanding: &mut Vec<Name>,
) -> Result<DescriptorNode<V>, StorageError> {
    let depth = expanding.len();
    let mut current = ty;
    while let Type::Named(name) = current {
        if expanding.contains(name) {
            return Err(StorageError::InfiniteType(name.clone()));
        }
        expanding.push(name.clone());
        current = env
            .types()
            .get(name.as_str())
            .ok_or_else(|| TypeError::Undefined(name.clone()))?;
    }

    let node = match current {
        Type::Structure(members) => {
            let mut entries = Vec::with_capacity(members.len());
            for member in members {
                entries.push(DescriptorEntry {
                    key: member.name.clone(),
                    node: build_node(env, &member.ty, leaf, expanding)?,
                });
            }
            DescriptorNode::Inner(entries)
        }
        Type::Int | Type::Comparison | Type::Unit | Type::Reference(_) | Type::Named(_) => {
            DescriptorNode::Leaf(leaf(current))
        }
    };
    expanding.truncate(depth);
    Ok(node)
}

// Formatting

impl<V: fmt::Display> StorageDescriptor<V> {
    fn format_entries(entries: &[DescriptorEntry<V>], rows: &mut Vec<String>) {
        for (i, entry) in entries.iter().enumerate() {
            let is_last = i + 1 == entries.len();
            let (first, rest) = if is_last { ("└", " ") } else { ("├", "│") };
            for (j, row) in Self::format_entry(entry).into_iter().enumerate() {
                let indent = if j == 0 { first } else { rest };
                rows.push(format!("{indent}{row}"));
            }
        }
    }

    fn format_entry(entry: &DescriptorEntry<V>) -> Vec<String> {
        match &entry.node {
            DescriptorNode::Leaf(value) => vec![format!("{}: {value}", entry.key)],
            DescriptorNode::Inner(children) => {
                let mut rows = vec![entry.key.to_string()];
                Self::format_entries(children, &mut rows);
                rows
            }
        }
    }
}

impl<V: fmt::Display> fmt::Display for StorageDescriptor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rows = Vec::new();
        Self::format_entries(&self.variables, &mut rows);
        f.write_str(&rows.join("\n"))
    }
}
