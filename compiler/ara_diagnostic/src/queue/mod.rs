//! Append-only diagnostic buffer.
//!
//! Every verification pass owns one queue. Passes emit in a deterministic
//! order (by variable name, then by position), so the queue keeps insertion
//! order instead of re-sorting.
//!
//! Features:
//! - Error limits to prevent overwhelming output
//! - Suppression of an error identical to the previous one
//! - `ErrorGuaranteed` proof that errors were emitted

use std::hash::{Hash, Hasher};

use crate::{Diagnostic, ErrorCode, ErrorGuaranteed};

#[inline]
fn message_hash(msg: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    msg.hash(&mut hasher);
    hasher.finish()
}

/// Configuration for diagnostic processing.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticConfig {
    /// Maximum number of errors kept per queue (0 = unlimited).
    pub error_limit: usize,
    /// Drop an error whose location and message equal the previous error's.
    pub deduplicate: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            error_limit: 100,
            deduplicate: true,
        }
    }
}

impl DiagnosticConfig {
    /// Create a config with no limits (for testing).
    pub fn unlimited() -> Self {
        DiagnosticConfig {
            error_limit: 0,
            deduplicate: false,
        }
    }
}

/// Queue collecting the diagnostics of one pass.
///
/// ```text
/// let mut queue = DiagnosticQueue::with_config(config);
/// queue.add(diagnostic);
/// if queue.has_errors().is_some() { /* skip dependent passes */ }
/// let diagnostics = queue.flush();
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticQueue {
    diagnostics: Vec<Diagnostic>,
    /// Count of errors kept.
    error_count: usize,
    /// Errors dropped because the limit was reached.
    suppressed: usize,
    /// Last (primary span start/end, message hash) for dedup.
    last_error: Option<(Option<(u32, u32)>, u64)>,
    config: DiagnosticConfig,
}

impl Default for DiagnosticQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticQueue {
    /// Create a new diagnostic queue with default configuration.
    pub fn new() -> Self {
        Self::with_config(DiagnosticConfig::default())
    }

    /// Create a diagnostic queue with custom configuration.
    pub fn with_config(config: DiagnosticConfig) -> Self {
        DiagnosticQueue {
            diagnostics: Vec::new(),
            error_count: 0,
            suppressed: 0,
            last_error: None,
            config,
        }
    }

    /// Add a diagnostic.
    ///
    /// Returns `true` if the diagnostic was added, `false` if it was filtered.
    pub fn add(&mut self, diag: Diagnostic) -> bool {
        if self.limit_reached() {
            self.suppressed += 1;
            return false;
        }

        let key = (
            diag.primary_span().map(|span| (span.start, span.end)),
            message_hash(&diag.message),
        );
        if self.config.deduplicate && self.last_error == Some(key) {
            return false;
        }
        self.last_error = Some(key);
        self.error_count += 1;

        self.diagnostics.push(diag);
        true
    }

    /// Check if the error limit has been reached.
    pub fn limit_reached(&self) -> bool {
        self.config.error_limit > 0 && self.error_count >= self.config.error_limit
    }

    /// Get the number of errors collected.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Check if any errors were emitted and get proof if so.
    pub fn has_errors(&self) -> Option<ErrorGuaranteed> {
        ErrorGuaranteed::from_error_count(self.error_count)
    }

    /// Return the diagnostics in insertion order and clear the queue.
    ///
    /// If errors were dropped by the limit, a trailing "too many errors"
    /// diagnostic says so.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        let mut result: Vec<Diagnostic> = self.diagnostics.drain(..).collect();
        if self.suppressed > 0 {
            result.push(too_many_errors(self.config.error_limit, self.suppressed));
        }

        self.error_count = 0;
        self.suppressed = 0;
        self.last_error = None;

        result
    }
}

/// Create a "too many errors" diagnostic.
#[cold]
pub fn too_many_errors(limit: usize, suppressed: usize) -> Diagnostic {
    Diagnostic::error(ErrorCode::E9002)
        .with_message(format!(
            "stopped after {limit} errors, {suppressed} more not shown"
        ))
        .with_note("raise `DiagnosticConfig::error_limit` to see all of them")
}
