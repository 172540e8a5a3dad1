//! Diagnostic system for the Ara verifier.
//!
//! Every diagnostic carries:
//! - an error code for searchability
//! - a short message (what went wrong)
//! - a primary span (where it went wrong)
//! - secondary labels and notes (which initializers, finalizers or
//!   declarations contributed)
//!
//! Rendering to a terminal is left to the caller; `Display` gives a plain
//! one-diagnostic-per-block text form.
//!
//! # Error Guarantees
//!
//! [`ErrorGuaranteed`] is type-level proof that at least one error was
//! emitted. The verifier checks it to skip passes whose prerequisites failed.
//!
//! ```text
//! let mut queue = DiagnosticQueue::new();
//! if let Some(_guarantee) = queue.has_errors() { /* skip liveness */ }
//! ```

mod diagnostic;
mod error_code;
mod guarantee;
pub mod queue;

pub use diagnostic::{Diagnostic, Label};
pub use error_code::ErrorCode;
pub use guarantee::ErrorGuaranteed;
pub use queue::{DiagnosticConfig, DiagnosticQueue};
