//! Liveness states laid out over a routine's variables.

use ara_ir::{Environment, Span};

use crate::paths::ResourcePath;
use crate::storage::{StorageDescriptor, StorageError};

use super::LivenessState;

/// One [`LivenessState`] per resource leaf of a routine.
pub type LivenessDescriptor = StorageDescriptor<LivenessState>;

impl StorageDescriptor<LivenessState> {
    /// Every leaf `Unknown`.
    pub fn all_unknown(env: &Environment) -> Result<Self, StorageError> {
        StorageDescriptor::from_environment(env, |_| LivenessState::Unknown)
    }

    /// Record that `path` (and everything below it) is initialized at `at`.
    pub fn initialize(&mut self, path: &ResourcePath, at: Span) -> Result<(), StorageError> {
        let new = LivenessState::initialized_at(at);
        self.update(path, |state| *state = state.overwritten_with(&new))
    }

    /// Record that `path` (and everything below it) is finalized at `at`.
    pub fn finalize(&mut self, path: &ResourcePath, at: Span) -> Result<(), StorageError> {
        let new = LivenessState::finalized_at(at);
        self.update(path, |state| *state = state.overwritten_with(&new))
    }

    /// Leaf-wise meet.
    #[must_use]
    pub fn meet(&self, other: &Self) -> Self {
        self.zip_with(other, LivenessState::meet)
    }
}
