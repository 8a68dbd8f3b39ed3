//! Running engine client subprocesses to completion.
//!
//! [`CommandRunner`] is the seam between engine logic and the host's process
//! launcher, so probes and routed commands can be unit-tested without a real
//! engine installed.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use super::mode::Invocation;
use crate::error::EngineError;

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, or `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Everything the process wrote to stdout.
    pub stdout: String,
    /// Everything the process wrote to stderr.
    pub stderr: String,
}

impl ProcessOutput {
    /// Returns `true` when the process exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Boxed future returned by [`CommandRunner::run`].
pub type RunFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ProcessOutput, EngineError>> + Send + 'a>>;

/// Behaviour required to run a subprocess and capture its output.
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` to completion, giving up after `timeout`.
    fn run<'a>(&'a self, invocation: Invocation, timeout: Duration) -> RunFuture<'a>;
}

/// Runs invocations as real child processes via `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run<'a>(&'a self, invocation: Invocation, timeout: Duration) -> RunFuture<'a> {
        Box::pin(async move { run_to_completion(&invocation, timeout).await })
    }
}

async fn run_to_completion(
    invocation: &Invocation,
    timeout: Duration,
) -> Result<ProcessOutput, EngineError> {
    let program = invocation.program().to_string();
    let mut command = Command::new(invocation.program());
    command
        .args(invocation.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // Dropping the wait future on timeout must not leak the child.
        .kill_on_drop(true);
    hide_window(&mut command);

    let child = command.spawn().map_err(|e| EngineError::LaunchFailed {
        program: program.clone(),
        message: e.to_string(),
    })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| EngineError::TimedOut {
            program: program.clone(),
            timeout,
        })?
        .map_err(|e| EngineError::WaitFailed {
            program,
            message: e.to_string(),
        })?;

    Ok(ProcessOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Keep engine subprocesses from opening console windows.
#[cfg(windows)]
pub(crate) fn hide_window(command: &mut Command) {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

/// Keep engine subprocesses from opening console windows.
#[cfg(not(windows))]
pub(crate) const fn hide_window(_command: &mut Command) {}
