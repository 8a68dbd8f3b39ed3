//! Canary probing of candidate engine endpoints.
//!
//! A probe runs `<client> [connection] run <canary image>` and declares the
//! endpoint reachable only when the canary greeting appears on stdout. Launch
//! failures, timeouts and mismatched output are all "not reachable"; none of
//! them escape as errors.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::mode::{Candidate, Invocation};
use super::runner::CommandRunner;
use crate::error::EngineError;

/// Text the canary image prints when the engine ran it.
pub const CANARY_GREETING: &str = "HELLO FROM DOCKER!";

/// Classified result of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The canary greeting was observed.
    Reachable,
    /// The client ran but the greeting was not observed.
    Unreachable {
        /// Exit status and trimmed stderr, for logging.
        reason: String,
    },
    /// The probe exceeded its deadline.
    TimedOut {
        /// The deadline that elapsed.
        after: Duration,
    },
    /// The client could not be launched or waited on.
    Failed {
        /// A description of the failure.
        reason: String,
    },
}

impl ProbeOutcome {
    /// Returns `true` only for [`Self::Reachable`].
    #[must_use]
    pub const fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reachable => f.write_str("reachable"),
            Self::Unreachable { reason } => write!(f, "unreachable ({reason})"),
            Self::TimedOut { after } => write!(f, "timed out after {after:?}"),
            Self::Failed { reason } => write!(f, "failed ({reason})"),
        }
    }
}

/// Returns `true` when `stdout` carries the canary greeting.
///
/// Trailing whitespace is ignored and the comparison is case-insensitive.
#[must_use]
pub fn contains_canary_greeting(stdout: &str) -> bool {
    stdout
        .trim_end()
        .to_uppercase()
        .contains(CANARY_GREETING)
}

/// Runs the canary workload against candidates.
#[derive(Clone)]
pub struct EngineProbe {
    runner: Arc<dyn CommandRunner>,
    canary_image: String,
    timeout: Duration,
}

impl fmt::Debug for EngineProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineProbe")
            .field("canary_image", &self.canary_image)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl EngineProbe {
    /// Create a probe that runs `canary_image` with a per-probe `timeout`.
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        canary_image: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            canary_image: canary_image.into(),
            timeout,
        }
    }

    /// The invocation used to probe `candidate`.
    #[must_use]
    pub fn canary_invocation(&self, candidate: &Candidate) -> Invocation {
        candidate.invocation(["run", self.canary_image.as_str()])
    }

    /// Probe `candidate` once.
    pub async fn probe(&self, candidate: &Candidate) -> ProbeOutcome {
        let invocation = self.canary_invocation(candidate);
        debug!(%invocation, "probing engine candidate");

        let outcome = match self.runner.run(invocation, self.timeout).await {
            Ok(output) if contains_canary_greeting(&output.stdout) => ProbeOutcome::Reachable,
            Ok(output) => ProbeOutcome::Unreachable {
                reason: output.exit_code.map_or_else(
                    || format!("terminated by signal: {}", output.stderr.trim()),
                    |code| format!("exit code {code}: {}", output.stderr.trim()),
                ),
            },
            Err(EngineError::TimedOut { timeout, .. }) => ProbeOutcome::TimedOut { after: timeout },
            Err(other) => ProbeOutcome::Failed {
                reason: other.to_string(),
            },
        };

        debug!(%candidate, %outcome, "probe finished");
        outcome
    }
}
