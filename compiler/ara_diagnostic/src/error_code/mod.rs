//! Error codes for all verifier diagnostics.
//!
//! Each error code is a unique identifier (e.g., `E1001`) with the first digit
//! indicating the pass that reports it.

use std::fmt;

/// Error codes for all verifier diagnostics.
///
/// Format: E#### where first digit indicates pass:
/// - E1xxx: Control graph construction
/// - E2xxx: Declarations
/// - E3xxx: Resource liveness
/// - E4xxx: Memory resource marking
/// - E9xxx: Internal verifier errors
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Control Graph Errors (E1xxx)
    /// Entry point while a block is still open
    E1001,
    /// Instruction outside of any block
    E1002,
    /// Label defined twice as an entry point
    E1003,
    /// Label defined twice as an exit point
    E1004,
    /// Entry label without a matching exit point
    E1005,
    /// Exit label without a matching entry point
    E1006,

    // Declaration Errors (E2xxx)
    /// Parameter declared multiple times
    E2001,
    /// Variable without a resolved type
    E2002,
    /// Routine defined multiple times
    E2003,

    // Liveness Errors (E3xxx)
    /// Conflicting initializers and finalizers
    E3001,
    /// Finalization of a resource that is not initialized
    E3002,
    /// Initialization of a resource that is already initialized
    E3003,
    /// Use of a resource that is not initialized
    E3004,
    /// Output parameter not initialized at routine end
    E3005,
    /// Variable not finalized at routine end
    E3006,

    // Memory Errors (E4xxx)
    /// Memory resource destroyed twice in one instruction
    E4001,
    /// Memory resource created twice in one instruction
    E4002,
    /// Memory resource created but not destroyed
    E4003,
    /// Memory resource destroyed but not created
    E4004,
    /// Memory access through a non-reference or mismatched shape
    E4005,

    // Internal Errors (E9xxx)
    /// Internal verifier error
    E9001,
    /// Too many errors
    E9002,
}

impl ErrorCode {
    /// All error codes, for exhaustive iteration and parsing.
    pub const ALL: &[ErrorCode] = &[
        ErrorCode::E1001,
        ErrorCode::E1002,
        ErrorCode::E1003,
        ErrorCode::E1004,
        ErrorCode::E1005,
        ErrorCode::E1006,
        ErrorCode::E2001,
        ErrorCode::E2002,
        ErrorCode::E2003,
        ErrorCode::E3001,
        ErrorCode::E3002,
        ErrorCode::E3003,
        ErrorCode::E3004,
        ErrorCode::E3005,
        ErrorCode::E3006,
        ErrorCode::E4001,
        ErrorCode::E4002,
        ErrorCode::E4003,
        ErrorCode::E4004,
        ErrorCode::E4005,
        ErrorCode::E9001,
        ErrorCode::E9002,
    ];

    /// Get the string representation of this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            ErrorCode::E1004 => "E1004",
            ErrorCode::E1005 => "E1005",
            ErrorCode::E1006 => "E1006",
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E3001 => "E3001",
            ErrorCode::E3002 => "E3002",
            ErrorCode::E3003 => "E3003",
            ErrorCode::E3004 => "E3004",
            ErrorCode::E3005 => "E3005",
            ErrorCode::E3006 => "E3006",
            ErrorCode::E4001 => "E4001",
            ErrorCode::E4002 => "E4002",
            ErrorCode::E4003 => "E4003",
            ErrorCode::E4004 => "E4004",
            ErrorCode::E4005 => "E4005",
            ErrorCode::E9001 => "E9001",
            ErrorCode::E9002 => "E9002",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse an error code string like `"E3001"`.
///
/// Case-insensitive. Derived from [`ErrorCode::ALL`] and [`ErrorCode::as_str()`].
impl std::str::FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        Self::ALL
            .iter()
            .find(|code| code.as_str() == upper)
            .copied()
            .ok_or(())
    }
}
