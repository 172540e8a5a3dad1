//! Identifiers.
//!
//! [`Name`] is a cheaply clonable, ordered string handle. Ordering is
//! lexicographic on the text so that maps keyed by names iterate in the
//! order diagnostics are reported in.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use crate::Span;

/// Shared, immutable identifier text.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Name(Arc<str>);

impl Name {
    /// Create a name from any string-like value.
    pub fn new(text: impl AsRef<str>) -> Self {
        Name(Arc::from(text.as_ref()))
    }

    /// The identifier text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(text: &str) -> Self {
        Name::new(text)
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", &*self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A name together with the place it was written.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Ident {
    pub name: Name,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<Name>, span: Span) -> Self {
        Ident {
            name: name.into(),
            span,
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.name, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_compare_by_text() {
        let mut names = vec![Name::from("y"), Name::from("a"), Name::from("x")];
        names.sort();
        let texts: Vec<&str> = names.iter().map(Name::as_str).collect();
        assert_eq!(texts, ["a", "x", "y"]);
    }

    #[test]
    fn clones_are_equal() {
        let name = Name::from("counter");
        assert_eq!(name.clone(), name);
        assert_eq!(format!("{name}"), "counter");
        assert_eq!(format!("{name:?}"), "Name(\"counter\")");
    }
}
