//! Runtime engine settings derived from [`AppConfig`].

use std::time::Duration;

use camino::Utf8PathBuf;

use crate::config::{
    AppConfig, DEFAULT_CANARY_IMAGE, DEFAULT_CLIENT_BINARY, DEFAULT_ENGINE_PORT, DaemonConfig,
    DeploymentConfig, EngineConfig,
};

/// Everything the engine components need, in runtime units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// System client binary, resolved through `PATH` when relative.
    pub client_binary: Utf8PathBuf,
    /// TCP port for port-based candidates and the private daemon.
    pub port: u16,
    /// Image run by the reachability canary.
    pub canary_image: String,
    /// Deadline for one reachability probe.
    pub probe_timeout: Duration,
    /// Deadline for one routed command.
    pub command_timeout: Duration,
    /// Directory under which deployments are created.
    pub deployment_base: Utf8PathBuf,
    /// Directory holding bundled artifacts, when configured.
    pub payload_dir: Option<Utf8PathBuf>,
    /// Pause after materializing artifacts.
    pub settle_delay: Duration,
    /// How long to wait for a started daemon to answer.
    pub readiness_timeout: Duration,
    /// Interval between readiness polls.
    pub readiness_poll: Duration,
    /// Optional elevation program wrapped around the daemon launch.
    pub elevate_with: Option<String>,
}

impl EngineSettings {
    fn build(
        client_binary: &str,
        payload_dir: Option<&str>,
        engine: &EngineConfig,
        deployment: &DeploymentConfig,
        daemon: &DaemonConfig,
    ) -> Self {
        Self {
            client_binary: Utf8PathBuf::from(client_binary),
            port: engine.port,
            canary_image: engine.canary_image.clone(),
            probe_timeout: Duration::from_secs(engine.probe_timeout_secs),
            command_timeout: Duration::from_secs(engine.command_timeout_secs),
            deployment_base: deployment
                .base_dir
                .clone()
                .unwrap_or_else(default_deployment_base),
            payload_dir: payload_dir
                .filter(|dir| !dir.is_empty())
                .map(Utf8PathBuf::from),
            settle_delay: Duration::from_millis(deployment.settle_millis),
            readiness_timeout: Duration::from_secs(daemon.readiness_timeout_secs),
            readiness_poll: Duration::from_millis(daemon.readiness_poll_millis),
            elevate_with: daemon
                .elevate_with
                .clone()
                .filter(|program| !program.is_empty()),
        }
    }
}

impl From<&AppConfig> for EngineSettings {
    fn from(config: &AppConfig) -> Self {
        Self::build(
            config.client_binary(),
            config.payload_dir.as_deref(),
            &config.engine,
            &config.deployment,
            &config.daemon,
        )
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::build(
            DEFAULT_CLIENT_BINARY,
            None,
            &EngineConfig::default(),
            &DeploymentConfig::default(),
            &DaemonConfig::default(),
        )
    }
}

fn default_deployment_base() -> Utf8PathBuf {
    let temp = std::env::temp_dir();
    Utf8PathBuf::from_path_buf(temp)
        .unwrap_or_else(|path| Utf8PathBuf::from(path.to_string_lossy().into_owned()))
}
