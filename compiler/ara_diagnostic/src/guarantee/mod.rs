//! Type-level proof that an error was reported.

use std::fmt;

/// Proof that at least one error diagnostic was emitted.
///
/// Cannot be constructed outside this crate except through
/// [`ErrorGuaranteed::from_error_count`], so holding one means some pass
/// really did report an error. The verifier uses it to decide which
/// dependent passes to skip.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ErrorGuaranteed(());

impl ErrorGuaranteed {
    pub(crate) fn new() -> Self {
        ErrorGuaranteed(())
    }

    /// `Some` if `count` is non-zero.
    pub fn from_error_count(count: usize) -> Option<Self> {
        (count > 0).then(Self::new)
    }
}

impl fmt::Display for ErrorGuaranteed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("error(s) emitted")
    }
}
