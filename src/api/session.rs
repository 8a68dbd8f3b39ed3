//! The engine session: one resolution, many routed commands.

use std::fmt;
use std::sync::Arc;

use camino::Utf8PathBuf;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};

use crate::engine::{
    BinaryProvisioner, BundleDirectory, CommandRouter, CommandRunner, DaemonLauncher,
    DaemonSupervisor, EngineEvent, EngineProbe, EngineSettings, EventBus, ExecutionResult,
    ModeResolver, OperatingMode, PayloadSource, PingReadiness, ReadinessCheck,
    SystemCommandRunner, SystemDaemonLauncher,
};
use crate::error::EngineError;

/// The host-facing implementations a session talks through.
#[derive(Clone)]
pub struct Collaborators {
    /// Runs client subprocesses.
    pub runner: Arc<dyn CommandRunner>,
    /// Spawns the private daemon.
    pub launcher: Arc<dyn DaemonLauncher>,
    /// Checks whether the private daemon answers.
    pub readiness: Arc<dyn ReadinessCheck>,
    /// Supplies the private artifacts.
    pub payloads: Arc<dyn PayloadSource>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

impl Collaborators {
    /// Real processes, a bollard ping, and artifacts read from the configured
    /// payload directory or, failing that, the executable's own directory.
    #[must_use]
    pub fn system(settings: &EngineSettings) -> Self {
        let bundle = settings.payload_dir.as_ref().map_or_else(
            || {
                BundleDirectory::beside_current_exe().unwrap_or_else(|error| {
                    warn!(%error, "cannot locate bundled artifacts; using working directory");
                    BundleDirectory::new(".")
                })
            },
            |dir| BundleDirectory::new(dir.clone()),
        );
        Self {
            runner: Arc::new(SystemCommandRunner),
            launcher: Arc::new(SystemDaemonLauncher::new(settings.elevate_with.clone())),
            readiness: Arc::new(PingReadiness),
            payloads: Arc::new(bundle),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    mode: OperatingMode,
    deployment: Option<Utf8PathBuf>,
}

/// Locates or provisions an engine endpoint and routes commands to it.
///
/// `start` and `execute` are mutually exclusive: while a resolution runs,
/// `execute` fails fast instead of waiting. Concurrent `execute` calls
/// against a settled mode run in parallel.
pub struct EngineSession {
    settings: EngineSettings,
    probe: EngineProbe,
    provisioner: BinaryProvisioner,
    supervisor: DaemonSupervisor,
    router: CommandRouter,
    events: EventBus,
    state: RwLock<SessionState>,
}

impl fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSession")
            .field("settings", &self.settings)
            .field("supervisor", &self.supervisor)
            .finish_non_exhaustive()
    }
}

impl EngineSession {
    /// Create a session backed by the host system.
    #[must_use]
    pub fn new(settings: EngineSettings) -> Self {
        let collaborators = Collaborators::system(&settings);
        Self::with_collaborators(settings, collaborators)
    }

    /// Create a session talking through `collaborators`.
    #[must_use]
    pub fn with_collaborators(settings: EngineSettings, collaborators: Collaborators) -> Self {
        let Collaborators {
            runner,
            launcher,
            readiness,
            payloads,
        } = collaborators;
        Self {
            probe: EngineProbe::new(
                Arc::clone(&runner),
                settings.canary_image.clone(),
                settings.probe_timeout,
            ),
            provisioner: BinaryProvisioner::new(payloads, settings.deployment_base.clone()),
            supervisor: DaemonSupervisor::new(launcher, readiness, settings.port),
            router: CommandRouter::new(
                runner,
                settings.client_binary.clone(),
                settings.port,
                settings.command_timeout,
            ),
            events: EventBus::new(),
            state: RwLock::new(SessionState::default()),
            settings,
        }
    }

    /// The settings this session was built from.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Receive progress and result events from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Resolve an engine endpoint.
    ///
    /// Returns `true` when the resolved mode is anything but
    /// [`OperatingMode::NoEngine`]. Re-running replaces the active mode.
    /// When resolution fails, a private daemon it started is stopped again.
    pub async fn start(&self) -> bool {
        let mut state = self.state.write().await;
        let resolver = ModeResolver::new(
            &self.settings,
            &self.probe,
            &self.provisioner,
            &self.supervisor,
            &self.events,
        );
        let mode = resolver.resolve(&mut state.deployment).await;
        state.mode = mode;
        mode.is_reachable()
    }

    /// Stop the privately started daemon.
    ///
    /// Returns `false` when no daemon is owned or termination fails. The
    /// active mode is left unchanged.
    pub async fn stop(&self) -> bool {
        self.supervisor.stop().await
    }

    /// Run `command` against the active endpoint and broadcast the result.
    ///
    /// Failures that prevent the command from running, including an
    /// in-flight resolution, yield a failure with no output.
    pub async fn execute(&self, command: &str) -> ExecutionResult {
        let result = match self.try_execute(command).await {
            Ok(result) => result,
            Err(error) => {
                warn!(%error, command, "engine command not attempted");
                ExecutionResult::not_attempted()
            }
        };
        self.events.result(result.clone());
        result
    }

    /// Run `command` against the active endpoint without broadcasting.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ResolutionInProgress`] while `start` runs,
    /// [`EngineError::NoActiveEngine`] before a successful `start`,
    /// [`EngineError::MalformedCommand`] for an unsplittable command, and
    /// launch or timeout errors from the client subprocess.
    pub async fn try_execute(&self, command: &str) -> Result<ExecutionResult, EngineError> {
        let state = self
            .state
            .try_read()
            .map_err(|_| EngineError::ResolutionInProgress)?;
        self.router
            .execute(state.mode, state.deployment.as_deref(), command)
            .await
    }

    /// Terminate the private daemon immediately, swallowing errors.
    ///
    /// Intended for host shutdown paths that cannot await.
    pub fn on_exit_or_failure(&self) {
        debug!("terminating private engine daemon on exit");
        self.supervisor.kill_now();
    }

    /// The mode settled by the last `start`.
    pub async fn active_mode(&self) -> OperatingMode {
        self.state.read().await.mode
    }

    /// The deployment directory, once artifacts have been provisioned.
    pub async fn deployment_path(&self) -> Option<Utf8PathBuf> {
        self.state.read().await.deployment.clone()
    }

    /// Returns `true` while a privately started daemon is alive.
    #[must_use]
    pub fn is_daemon_running(&self) -> bool {
        self.supervisor.is_running()
    }
}
