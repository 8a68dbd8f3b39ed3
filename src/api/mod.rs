//! Library-facing engine session API.
//!
//! [`EngineSession`] is the entry point for embedders and for the CLI: it
//! resolves an engine endpoint once with [`EngineSession::start`], then routes
//! any number of commands through [`EngineSession::execute`]. Progress and
//! results are broadcast to subscribers as [`EngineEvent`]s.
//!
//! Nothing here prints or exits the process. [`CommandOutcome`] maps results
//! onto exit codes for callers that need them.
//!
//! [`EngineEvent`]: crate::engine::EngineEvent

mod session;

pub use session::{Collaborators, EngineSession};

use crate::engine::ExecutionResult;

/// Outcome of a dockshim command, for mapping onto a process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command completed successfully (exit code 0).
    Success,
    /// No engine endpoint could be resolved.
    EngineUnavailable,
    /// The routed engine command failed or could not be attempted.
    CommandFailed,
}

impl CommandOutcome {
    /// Process exit code for this outcome.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::CommandFailed => 1,
            Self::EngineUnavailable => 2,
        }
    }

    /// Map a start result onto an outcome.
    #[must_use]
    pub const fn from_start(started: bool) -> Self {
        if started {
            Self::Success
        } else {
            Self::EngineUnavailable
        }
    }
}

impl From<&ExecutionResult> for CommandOutcome {
    fn from(result: &ExecutionResult) -> Self {
        if result.success {
            Self::Success
        } else {
            Self::CommandFailed
        }
    }
}
