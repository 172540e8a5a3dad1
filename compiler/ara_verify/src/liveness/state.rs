//! The four-point liveness lattice.
//!
//! ```text
//!            Conflict
//!           /        \
//!   Initialized    Finalized
//!           \        /
//!            Unknown
//! ```
//!
//! Every non-`Unknown` state carries the source positions that put the
//! resource into it. Cause sets only grow: meet and overwrite both union.

use std::collections::BTreeSet;
use std::fmt;

use ara_ir::Span;

use crate::storage::Synthesize;

/// Positions of the initializers or finalizers behind a state, in source
/// order.
pub type CauseSet = BTreeSet<Span>;

static EMPTY: CauseSet = BTreeSet::new();

/// Abstract initialization status of one resource at one program point.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum LivenessState {
    #[default]
    Unknown,
    Initialized(CauseSet),
    Finalized(CauseSet),
    Conflict {
        initializers: CauseSet,
        finalizers: CauseSet,
    },
}

fn union(a: &CauseSet, b: &CauseSet) -> CauseSet {
    a.union(b).copied().collect()
}

impl LivenessState {
    pub fn initialized_at(span: Span) -> Self {
        LivenessState::Initialized(BTreeSet::from([span]))
    }

    pub fn finalized_at(span: Span) -> Self {
        LivenessState::Finalized(BTreeSet::from([span]))
    }

    /// Initializers on record. Empty for `Unknown` and `Finalized`.
    pub fn initializers(&self) -> &CauseSet {
        match self {
            LivenessState::Initialized(causes)
            | LivenessState::Conflict {
                initializers: causes,
                ..
            } => causes,
            LivenessState::Unknown | LivenessState::Finalized(_) => &EMPTY,
        }
    }

    /// Finalizers on record. Empty for `Unknown` and `Initialized`.
    pub fn finalizers(&self) -> &CauseSet {
        match self {
            LivenessState::Finalized(causes)
            | LivenessState::Conflict {
                finalizers: causes,
                ..
            } => causes,
            LivenessState::Unknown | LivenessState::Initialized(_) => &EMPTY,
        }
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, LivenessState::Unknown)
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        matches!(self, LivenessState::Initialized(_))
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        matches!(self, LivenessState::Finalized(_))
    }

    #[inline]
    pub fn is_conflict(&self) -> bool {
        matches!(self, LivenessState::Conflict { .. })
    }

    /// Lattice meet, applied where control flow joins.
    #[must_use]
    pub fn meet(&self, other: &Self) -> Self {
        use LivenessState::{Conflict, Finalized, Initialized, Unknown};

        match (self, other) {
            (Unknown, state) | (state, Unknown) => state.clone(),
            (Initialized(a), Initialized(b)) => Initialized(union(a, b)),
            (Finalized(a), Finalized(b)) => Finalized(union(a, b)),
            (Initialized(initializers), Finalized(finalizers))
            | (Finalized(finalizers), Initialized(initializers)) => Conflict {
                initializers: initializers.clone(),
                finalizers: finalizers.clone(),
            },
            (Conflict { .. }, _) | (_, Conflict { .. }) => Conflict {
                initializers: union(self.initializers(), other.initializers()),
                finalizers: union(self.finalizers(), other.finalizers()),
            },
        }
    }

    /// The state after an instruction sets `new` on a resource in this state.
    ///
    /// A new state replaces the old one unless both are of the same kind, in
    /// which case the causes accumulate. A conflict is never resolved by an
    /// update; it only collects more causes.
    #[must_use]
    pub fn overwritten_with(&self, new: &Self) -> Self {
        use LivenessState::{Conflict, Finalized, Initialized, Unknown};

        match (self, new) {
            (Unknown, new) => new.clone(),
            (Initialized(a), Initialized(b)) => Initialized(union(a, b)),
            (Finalized(a), Finalized(b)) => Finalized(union(a, b)),
            (Conflict { .. }, Unknown) => self.clone(),
            (Conflict { .. }, _) => Conflict {
                initializers: union(self.initializers(), new.initializers()),
                finalizers: union(self.finalizers(), new.finalizers()),
            },
            (Initialized(_) | Finalized(_), new) => new.clone(),
        }
    }
}

impl Synthesize for LivenessState {
    /// A structure reads as initialized if any member is initialized, as
    /// finalized if any member is finalized, and as conflicting if both.
    fn synthesize<'a>(leaves: impl Iterator<Item = &'a Self>) -> Self
    where
        Self: 'a,
    {
        let mut initializers = CauseSet::new();
        let mut finalizers = CauseSet::new();
        for leaf in leaves {
            initializers.extend(leaf.initializers());
            finalizers.extend(leaf.finalizers());
        }
        match (initializers.is_empty(), finalizers.is_empty()) {
            (false, false) => LivenessState::Conflict {
                initializers,
                finalizers,
            },
            (false, true) => LivenessState::Initialized(initializers),
            (true, false) => LivenessState::Finalized(finalizers),
            (true, true) => LivenessState::Unknown,
        }
    }
}

impl fmt::Display for LivenessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LivenessState::Unknown => "?",
            LivenessState::Initialized(_) => "+",
            LivenessState::Finalized(_) => "-",
            LivenessState::Conflict { .. } => "!",
        })
    }
}
