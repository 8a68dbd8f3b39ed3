//! The engine discovery state machine.
//!
//! Resolution walks a fixed sequence of candidates and stops at the first one
//! whose canary probe succeeds:
//!
//! 1. system client, default connection
//! 2. system client, `-H :<port>`
//! 3. provision the private artifacts, then retry (2)
//! 4. start the private daemon, wait for readiness, then try the private
//!    client on `-H :<port>`
//!
//! No stage failure aborts resolution. Every resolution ends in exactly one
//! terminal progress notification. A private daemon that was started but
//! never answered the canary is stopped before resolution reports
//! [`OperatingMode::NoEngine`].

use camino::Utf8PathBuf;
use tracing::{info, warn};

use super::events::{EventBus, Progress};
use super::mode::{Candidate, Connection, OperatingMode};
use super::probe::EngineProbe;
use super::provision::{Artifact, BinaryProvisioner};
use super::settings::EngineSettings;
use super::supervisor::{DaemonStart, DaemonSupervisor, Readiness};

/// Drives probe, provisioner and supervisor to an [`OperatingMode`].
#[derive(Debug, Clone, Copy)]
pub struct ModeResolver<'a> {
    settings: &'a EngineSettings,
    probe: &'a EngineProbe,
    provisioner: &'a BinaryProvisioner,
    supervisor: &'a DaemonSupervisor,
    events: &'a EventBus,
}

impl<'a> ModeResolver<'a> {
    /// Borrow the components of one engine session.
    #[must_use]
    pub const fn new(
        settings: &'a EngineSettings,
        probe: &'a EngineProbe,
        provisioner: &'a BinaryProvisioner,
        supervisor: &'a DaemonSupervisor,
        events: &'a EventBus,
    ) -> Self {
        Self {
            settings,
            probe,
            provisioner,
            supervisor,
            events,
        }
    }

    fn host_default(&self) -> Candidate {
        Candidate::new(self.settings.client_binary.clone(), Connection::Default)
    }

    fn host_port(&self) -> Candidate {
        Candidate::new(
            self.settings.client_binary.clone(),
            Connection::LocalPort(self.settings.port),
        )
    }

    async fn reachable(&self, candidate: &Candidate) -> bool {
        self.events.progress(Progress::CheckingMode);
        self.probe.probe(candidate).await.is_reachable()
    }

    /// Resolve the operating mode.
    ///
    /// `deployment` is the session's deployment directory; it is filled in
    /// the first time artifacts are provisioned and reused afterwards.
    pub async fn resolve(&self, deployment: &mut Option<Utf8PathBuf>) -> OperatingMode {
        if self.reachable(&self.host_default()).await {
            return self.finish(OperatingMode::HostEngineHostClient);
        }
        if self.reachable(&self.host_port()).await {
            return self.finish(OperatingMode::HostEngineViaPort);
        }

        self.events.progress(Progress::FirstStageDeployment);
        self.provision(deployment).await;

        if self.reachable(&self.host_port()).await {
            return self.finish(OperatingMode::HostEngineViaPort);
        }

        self.events.progress(Progress::SecondStageDeployment);
        let Some(dir) = deployment.as_deref() else {
            warn!("no deployment directory; private engine cannot start");
            return self.finish(OperatingMode::NoEngine);
        };

        match self.supervisor.start(Some(dir)) {
            Ok(start) => {
                if let DaemonStart::Started { pid } = start {
                    info!(?pid, "private engine daemon launched");
                }
                let readiness = self
                    .supervisor
                    .await_ready(self.settings.readiness_timeout, self.settings.readiness_poll)
                    .await;
                if readiness != Readiness::Ready {
                    warn!(?readiness, "private engine daemon is not answering");
                }
            }
            Err(error) => warn!(%error, "private engine daemon failed to launch"),
        }

        let private = Candidate::new(
            Artifact::Client.path_in(dir),
            Connection::LocalPort(self.settings.port),
        );
        if self.reachable(&private).await {
            return self.finish(OperatingMode::PrivateEngineViaPort);
        }
        if self.supervisor.stop().await {
            info!("stopped private engine daemon that never answered");
        }
        self.finish(OperatingMode::NoEngine)
    }

    async fn provision(&self, deployment: &mut Option<Utf8PathBuf>) {
        match self.provisioner.provision(deployment.as_deref()) {
            Ok(report) => {
                for (artifact, error) in &report.failed {
                    warn!(%artifact, %error, "artifact missing from deployment");
                }
                *deployment = Some(report.path);
            }
            Err(error) => warn!(%error, "could not create deployment directory"),
        }
        if !self.settings.settle_delay.is_zero() {
            tokio::time::sleep(self.settings.settle_delay).await;
        }
    }

    fn finish(&self, mode: OperatingMode) -> OperatingMode {
        if mode.is_reachable() {
            info!(%mode, "container engine resolved");
            self.events.progress(Progress::Ready(mode));
        } else {
            warn!("no container engine could be reached");
            self.events.progress(Progress::CouldNotStart);
        }
        mode
    }
}
