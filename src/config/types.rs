//! Configuration data types for dockshim.

use camino::Utf8PathBuf;
use clap::ValueEnum;
use ortho_config::{OrthoConfig, OrthoResult, PostMergeContext, PostMergeHook};
use serde::{Deserialize, Serialize};

/// Default system client binary name.
pub const DEFAULT_CLIENT_BINARY: &str = "docker";

/// Default TCP port the private daemon binds and port candidates target.
pub const DEFAULT_ENGINE_PORT: u16 = 5555;

/// Default image used by the reachability canary.
pub const DEFAULT_CANARY_IMAGE: &str = "hello-world";

/// Engine endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// TCP port used by port-based candidates and the private daemon.
    pub port: u16,

    /// Image run by the reachability canary.
    pub canary_image: String,

    /// Deadline for a single reachability probe.
    pub probe_timeout_secs: u64,

    /// Deadline for a routed engine command.
    pub command_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_ENGINE_PORT,
            canary_image: String::from(DEFAULT_CANARY_IMAGE),
            probe_timeout_secs: 120,
            command_timeout_secs: 600,
        }
    }
}

/// Private deployment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Directory under which the random deployment directory is created.
    ///
    /// Falls back to the operating system's temporary directory.
    pub base_dir: Option<Utf8PathBuf>,

    /// Pause after materializing artifacts, in milliseconds.
    pub settle_millis: u64,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            settle_millis: 500,
        }
    }
}

/// Private daemon configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// How long to wait for a started daemon to answer.
    pub readiness_timeout_secs: u64,

    /// Interval between readiness polls, in milliseconds.
    pub readiness_poll_millis: u64,

    /// Program used to elevate the daemon launch (for example `sudo`).
    pub elevate_with: Option<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            readiness_timeout_secs: 30,
            readiness_poll_millis: 500,
            elevate_with: None,
        }
    }
}

/// Supported logging output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single line output.
    #[default]
    Compact,
    /// Structured JSON suitable for ingestion by logging stacks.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: String::from("info"),
            format: LogFormat::Compact,
        }
    }
}

/// Root application configuration.
///
/// This structure is loaded from configuration files, environment variables,
/// and command-line arguments with layered precedence. The precedence order
/// (lowest to highest) is: defaults, configuration file, environment variables,
/// command-line arguments.
///
/// Configuration files are discovered in this order:
/// 1. Path specified via `DOCKSHIM_CONFIG_PATH` environment variable
/// 2. `.dockshim.toml` in the current working directory
/// 3. `.dockshim.toml` in the home directory
/// 4. `~/.config/dockshim/config.toml` (XDG default)
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "DOCKSHIM",
    post_merge_hook,
    discovery(
        app_name = "dockshim",
        env_var = "DOCKSHIM_CONFIG_PATH",
        config_file_name = "config.toml",
        dotfile_name = ".dockshim.toml",
        config_cli_long = "config",
        config_cli_visible = true,
    )
)]
pub struct AppConfig {
    /// The system-installed engine client binary.
    pub client_binary: Option<String>,

    /// Directory holding the bundled engine artifacts.
    pub payload_dir: Option<String>,

    /// Engine endpoint configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub engine: EngineConfig,

    /// Private deployment configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub deployment: DeploymentConfig,

    /// Private daemon configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub daemon: DaemonConfig,

    /// Logging configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub log: LogConfig,
}

impl AppConfig {
    /// Returns the configured system client, or `docker`.
    #[must_use]
    pub fn client_binary(&self) -> &str {
        self.client_binary
            .as_deref()
            .filter(|binary| !binary.is_empty())
            .unwrap_or(DEFAULT_CLIENT_BINARY)
    }
}

impl PostMergeHook for AppConfig {
    fn post_merge(&mut self, _ctx: &PostMergeContext) -> OrthoResult<()> {
        if self.engine.port == 0 {
            self.engine.port = DEFAULT_ENGINE_PORT;
        }
        if self.daemon.readiness_poll_millis == 0 {
            self.daemon.readiness_poll_millis = DaemonConfig::default().readiness_poll_millis;
        }
        Ok(())
    }
}
