//! Routing engine commands to the resolved endpoint.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use super::command_line;
use super::mode::{Candidate, Connection, Invocation, OperatingMode};
use super::provision::Artifact;
use super::runner::{CommandRunner, ProcessOutput};
use crate::error::EngineError;

/// Outcome of one routed command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// `true` iff the command exited with status zero.
    pub success: bool,
    /// Trimmed stdout on success, trimmed stderr on failure, or `None` when
    /// the command could not be attempted.
    pub output: Option<String>,
}

impl ExecutionResult {
    /// A failure for a command that never ran.
    #[must_use]
    pub const fn not_attempted() -> Self {
        Self {
            success: false,
            output: None,
        }
    }

    /// Classify a finished process.
    #[must_use]
    pub fn from_output(output: &ProcessOutput) -> Self {
        if output.success() {
            Self {
                success: true,
                output: Some(output.stdout.trim().to_owned()),
            }
        } else {
            Self {
                success: false,
                output: Some(output.stderr.trim().to_owned()),
            }
        }
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "ok" } else { "failed" };
        match &self.output {
            None => f.write_str(status),
            Some(output) => write!(f, "{status}: {output}"),
        }
    }
}

/// Rewrites engine commands for the active mode and runs them.
#[derive(Clone)]
pub struct CommandRouter {
    runner: Arc<dyn CommandRunner>,
    client_binary: Utf8PathBuf,
    port: u16,
    timeout: Duration,
}

impl fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRouter")
            .field("client_binary", &self.client_binary)
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CommandRouter {
    /// Create a router using `client_binary` for host modes.
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        client_binary: impl Into<Utf8PathBuf>,
        port: u16,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            client_binary: client_binary.into(),
            port,
            timeout,
        }
    }

    /// The client and connection used for `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoActiveEngine`] for [`OperatingMode::NoEngine`]
    /// and [`EngineError::DeploymentMissing`] for the private mode without a
    /// deployment.
    pub fn candidate(
        &self,
        mode: OperatingMode,
        deployment: Option<&Utf8Path>,
    ) -> Result<Candidate, EngineError> {
        match mode {
            OperatingMode::HostEngineHostClient => {
                Ok(Candidate::new(self.client_binary.clone(), Connection::Default))
            }
            OperatingMode::HostEngineViaPort => Ok(Candidate::new(
                self.client_binary.clone(),
                Connection::LocalPort(self.port),
            )),
            OperatingMode::PrivateEngineViaPort => {
                let dir = deployment.ok_or(EngineError::DeploymentMissing)?;
                Ok(Candidate::new(
                    Artifact::Client.path_in(dir),
                    Connection::LocalPort(self.port),
                ))
            }
            OperatingMode::NoEngine => Err(EngineError::NoActiveEngine),
        }
    }

    /// The invocation that runs `command` in `mode`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::candidate`], or
    /// [`EngineError::MalformedCommand`] when `command` cannot be split.
    pub fn invocation(
        &self,
        mode: OperatingMode,
        deployment: Option<&Utf8Path>,
        command: &str,
    ) -> Result<Invocation, EngineError> {
        let candidate = self.candidate(mode, deployment)?;
        let args = command_line::split(command)?;
        Ok(candidate.invocation(args))
    }

    /// Run `command` in `mode`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::invocation`] and of the command runner.
    /// A command that runs and fails is an `Ok` failure result, not an error.
    pub async fn execute(
        &self,
        mode: OperatingMode,
        deployment: Option<&Utf8Path>,
        command: &str,
    ) -> Result<ExecutionResult, EngineError> {
        let invocation = self.invocation(mode, deployment, command)?;
        debug!(%mode, %invocation, "routing engine command");

        let output = self.runner.run(invocation, self.timeout).await?;
        let result = ExecutionResult::from_output(&output);
        info!(
            %mode,
            success = result.success,
            exit_code = ?output.exit_code,
            "engine command finished"
        );
        Ok(result)
    }
}
