//! Verification options.

use ara_diagnostic::DiagnosticConfig;
use bitflags::bitflags;

bitflags! {
    /// Passes whose internal structures are written to the `debug` log.
    ///
    /// Dumps go through `tracing`, so they only appear when a subscriber is
    /// installed (see [`crate::init_tracing`]).
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct DumpPasses: u8 {
        /// Block list with labels and edges.
        const GRAPH = 1 << 0;
        /// IN and OUT descriptor of every block.
        const LIVENESS = 1 << 1;
        /// Marking trees of every instruction.
        const MEMORY = 1 << 2;
    }
}

/// Settings for one verification run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VerifyOptions {
    /// Limits applied to every pass's diagnostic queue.
    pub diagnostics: DiagnosticConfig,
    pub dump: DumpPasses,
}

impl VerifyOptions {
    /// No error limit and no deduplication; every diagnostic is kept.
    pub fn unlimited() -> Self {
        VerifyOptions {
            diagnostics: DiagnosticConfig::unlimited(),
            dump: DumpPasses::empty(),
        }
    }

    #[must_use]
    pub fn with_dump(mut self, dump: DumpPasses) -> Self {
        self.dump = dump;
        self
    }
}
