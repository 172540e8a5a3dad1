//! Shared data for the Ara verifier.
//!
//! - [`Span`], [`Name`], [`Ident`]: source positions and identifiers
//! - [`Direction`]: forward/backward, for control flow and for dataflow
//! - [`ast`]: the instruction-level syntax tree produced by the parser
//! - [`types`]: resolved structural types and per-routine environments
//!
//! Nothing in this crate analyses anything; it only describes programs.

pub mod ast;
mod direction;
mod name;
mod span;
pub mod types;

pub use direction::Direction;
pub use name::{Ident, Name};
pub use span::Span;
pub use types::{Environment, Member, Type, TypeError, TypeTable};
