//! Configuration system for dockshim.
//!
//! Configuration structures and CLI definitions. Loading and precedence
//! merging is handled by `ortho_config`: CLI flags override environment
//! variables, which override configuration files, which override defaults.
//!
//! The configuration file is expected at `~/.config/dockshim/config.toml` by
//! default.
//!
//! # Example Configuration
//!
//! ```toml
//! client_binary = "docker"
//! payload_dir = "/opt/dockshim/bundle"
//!
//! [engine]
//! port = 5555
//! canary_image = "hello-world"
//! probe_timeout_secs = 120
//! command_timeout_secs = 600
//!
//! [deployment]
//! base_dir = "/var/tmp"
//! settle_millis = 500
//!
//! [daemon]
//! readiness_timeout_secs = 30
//! readiness_poll_millis = 500
//! elevate_with = "sudo"
//!
//! [log]
//! filter = "dockshim=debug"
//! format = "json"
//! ```

mod cli;
mod loader;
mod types;

#[cfg(test)]
mod tests;

pub use cli::{Cli, Commands, ExecArgs};
pub use loader::{env_var_names, load_config};
pub use types::{
    AppConfig, DEFAULT_CANARY_IMAGE, DEFAULT_CLIENT_BINARY, DEFAULT_ENGINE_PORT, DaemonConfig,
    DeploymentConfig, EngineConfig, LogConfig, LogFormat,
};
