//! Ownership of the privately started engine daemon.
//!
//! The supervisor launches the provisioned daemon in the background, bound to
//! every interface on the engine port, and keeps the only handle to it. A
//! second start while a daemon is owned and alive launches nothing. Readiness
//! is a bounded poll of the daemon's API that stops early if the process
//! dies.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bollard::Docker;
use camino::Utf8Path;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::mode::{Invocation, daemon_bind_args};
use super::provision::Artifact;
use super::runner::hide_window;
use crate::error::EngineError;

/// How long [`DaemonSupervisor::stop`] waits for the daemon to exit.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Interval between exit checks while stopping.
const STOP_POLL: Duration = Duration::from_millis(50);

/// A live daemon process.
pub trait DaemonProcess: Send {
    /// Operating-system process ID, when known.
    fn id(&self) -> Option<u32>;

    /// Returns `true` once the process has exited.
    fn has_exited(&mut self) -> bool;

    /// Ask the process to terminate without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DaemonTerminateFailed`] when the signal cannot
    /// be delivered.
    fn terminate(&mut self) -> Result<(), EngineError>;
}

/// Launches daemon processes.
pub trait DaemonLauncher: Send + Sync {
    /// Start `invocation` in the background.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DaemonLaunchFailed`] when the process cannot be
    /// spawned.
    fn launch(&self, invocation: Invocation) -> Result<Box<dyn DaemonProcess>, EngineError>;
}

/// Boxed future returned by [`ReadinessCheck::check`].
pub type ReadinessFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>>;

/// Checks whether a daemon's API answers on a local port.
pub trait ReadinessCheck: Send + Sync {
    /// Check once, giving up after `timeout`.
    fn check<'a>(&'a self, port: u16, timeout: Duration) -> ReadinessFuture<'a>;
}

/// Pings the engine API over HTTP on the loopback interface.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingReadiness;

impl ReadinessCheck for PingReadiness {
    fn check<'a>(&'a self, port: u16, timeout: Duration) -> ReadinessFuture<'a> {
        Box::pin(async move { ping(port, timeout).await })
    }
}

async fn ping(port: u16, timeout: Duration) -> Result<(), EngineError> {
    let url = format!("http://127.0.0.1:{port}");
    let docker = Docker::connect_with_http(
        &url,
        timeout.as_secs().max(1),
        bollard::API_DEFAULT_VERSION,
    )
    .map_err(|e| EngineError::HealthCheckFailed {
        message: e.to_string(),
    })?;

    tokio::time::timeout(timeout, docker.ping())
        .await
        .map_err(|_| EngineError::HealthCheckTimeout { timeout })?
        .map_err(|e| EngineError::HealthCheckFailed {
            message: e.to_string(),
        })?;
    Ok(())
}

/// Spawns daemons as detached child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemDaemonLauncher {
    elevate_with: Option<String>,
}

impl SystemDaemonLauncher {
    /// Create a launcher, optionally wrapping every launch in `elevate_with`
    /// (for example `sudo`).
    #[must_use]
    pub const fn new(elevate_with: Option<String>) -> Self {
        Self { elevate_with }
    }

    fn command_for(&self, invocation: &Invocation) -> Command {
        let mut command = self.elevate_with.as_deref().map_or_else(
            || Command::new(invocation.program()),
            |elevator| {
                let mut elevated = Command::new(elevator);
                elevated.arg(invocation.program());
                elevated
            },
        );
        command.args(invocation.args());
        command
    }
}

impl DaemonLauncher for SystemDaemonLauncher {
    fn launch(&self, invocation: Invocation) -> Result<Box<dyn DaemonProcess>, EngineError> {
        let mut command = self.command_for(&invocation);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        hide_window(&mut command);

        let child = command.spawn().map_err(|e| EngineError::DaemonLaunchFailed {
            program: invocation.program().to_string(),
            message: e.to_string(),
        })?;
        Ok(Box::new(ChildDaemon { child }))
    }
}

struct ChildDaemon {
    child: Child,
}

impl DaemonProcess for ChildDaemon {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn has_exited(&mut self) -> bool {
        // An error from try_wait means the status can no longer be observed.
        !matches!(self.child.try_wait(), Ok(None))
    }

    fn terminate(&mut self) -> Result<(), EngineError> {
        let pid = self.child.id();
        self.child
            .start_kill()
            .map_err(|e| EngineError::DaemonTerminateFailed {
                pid,
                message: e.to_string(),
            })
    }
}

/// Result of [`DaemonSupervisor::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStart {
    /// A new daemon was launched.
    Started {
        /// Its process ID, when known.
        pid: Option<u32>,
    },
    /// An owned daemon was still alive; nothing was launched.
    AlreadyRunning {
        /// Its process ID, when known.
        pid: Option<u32>,
    },
}

/// Result of [`DaemonSupervisor::await_ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The daemon's API answered.
    Ready,
    /// The daemon exited, or none is owned.
    Exited,
    /// The deadline passed without an answer.
    TimedOut,
}

/// Owns at most one live private daemon.
pub struct DaemonSupervisor {
    launcher: Arc<dyn DaemonLauncher>,
    readiness: Arc<dyn ReadinessCheck>,
    port: u16,
    handle: Mutex<Option<Box<dyn DaemonProcess>>>,
}

impl fmt::Debug for DaemonSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaemonSupervisor")
            .field("port", &self.port)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// The invocation that starts the daemon from `deployment` bound to `port`.
#[must_use]
pub fn daemon_invocation(deployment: &Utf8Path, port: u16) -> Invocation {
    Invocation::new(Artifact::Daemon.path_in(deployment), daemon_bind_args(port))
}

impl DaemonSupervisor {
    /// Create a supervisor for daemons bound to `port`.
    pub fn new(
        launcher: Arc<dyn DaemonLauncher>,
        readiness: Arc<dyn ReadinessCheck>,
        port: u16,
    ) -> Self {
        Self {
            launcher,
            readiness,
            port,
            handle: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn DaemonProcess>>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` while an owned daemon is alive.
    pub fn is_running(&self) -> bool {
        let mut guard = self.lock();
        let alive = guard.as_mut().is_some_and(|process| !process.has_exited());
        if !alive {
            *guard = None;
        }
        alive
    }

    /// Launch the daemon from `deployment` unless one is already owned.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DeploymentMissing`] without a deployment, or
    /// the launcher's error. Nothing is recorded on failure.
    pub fn start(&self, deployment: Option<&Utf8Path>) -> Result<DaemonStart, EngineError> {
        let dir = deployment.ok_or(EngineError::DeploymentMissing)?;
        let mut guard = self.lock();

        if let Some(process) = guard.as_mut() {
            if !process.has_exited() {
                let pid = process.id();
                debug!(?pid, "engine daemon already running");
                return Ok(DaemonStart::AlreadyRunning { pid });
            }
            debug!("previous engine daemon has exited");
        }

        let invocation = daemon_invocation(dir, self.port);
        info!(%invocation, "starting private engine daemon");
        let process = self.launcher.launch(invocation)?;
        let pid = process.id();
        *guard = Some(process);
        Ok(DaemonStart::Started { pid })
    }

    /// Poll the daemon's API until it answers, the daemon exits, or
    /// `timeout` elapses.
    pub async fn await_ready(&self, timeout: Duration, poll: Duration) -> Readiness {
        let deadline = Instant::now() + timeout;

        loop {
            if !self.is_running() {
                warn!("engine daemon exited before becoming ready");
                return Readiness::Exited;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(?timeout, "engine daemon readiness timed out");
                return Readiness::TimedOut;
            }

            let attempt = poll.min(remaining).max(Duration::from_millis(1));
            match self.readiness.check(self.port, attempt).await {
                Ok(()) => {
                    info!(port = self.port, "engine daemon is ready");
                    return Readiness::Ready;
                }
                Err(error) => debug!(%error, "engine daemon not ready yet"),
            }

            let until_deadline = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(poll.min(until_deadline)).await;
        }
    }

    /// Terminate the owned daemon and wait briefly for it to exit.
    ///
    /// Returns `false` when nothing is owned or termination fails.
    pub async fn stop(&self) -> bool {
        let Some(mut process) = self.lock().take() else {
            debug!("no engine daemon to stop");
            return false;
        };

        let pid = process.id();
        if let Err(error) = process.terminate() {
            warn!(%error, "failed to stop engine daemon");
            return false;
        }

        let deadline = Instant::now() + STOP_GRACE;
        while !process.has_exited() {
            if Instant::now() >= deadline {
                warn!(?pid, "engine daemon did not exit after termination");
                return true;
            }
            tokio::time::sleep(STOP_POLL).await;
        }
        info!(?pid, "engine daemon stopped");
        true
    }

    /// Terminate the owned daemon without waiting. Errors are logged and
    /// swallowed.
    pub fn kill_now(&self) {
        if let Some(mut process) = self.lock().take()
            && let Err(error) = process.terminate()
        {
            warn!(%error, "failed to terminate engine daemon");
        }
    }
}
