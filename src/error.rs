//! Semantic error types for the dockshim library.
//!
//! Conditions a caller might inspect or retry are modelled as `thiserror`
//! enums. Opaque errors (`eyre::Report`) are reserved for the binary boundary.
//!
//! The engine session itself never lets these escape its public contract:
//! `start`, `stop` and `execute` collapse them into booleans and
//! [`ExecutionResult`](crate::engine::ExecutionResult) values. They surface
//! through the lower-level component APIs and through
//! [`EngineSession::try_execute`](crate::api::EngineSession::try_execute).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or parsed.
    #[error("failed to parse configuration file: {message}")]
    ParseError {
        /// A description of the parse error.
        message: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// The `OrthoConfig` library returned an error during configuration loading.
    ///
    /// This wraps errors from the layered configuration system, including:
    /// - Configuration file parsing errors
    /// - Environment variable parsing errors
    /// - CLI argument parsing errors
    #[error("configuration loading failed: {0}")]
    OrthoConfig(Arc<ortho_config::OrthoError>),
}

/// Errors raised while talking to, or managing, a container engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A subprocess could not be launched at all.
    #[error("failed to launch '{program}': {message}")]
    LaunchFailed {
        /// The program that failed to launch.
        program: String,
        /// A description of the launch failure.
        message: String,
    },

    /// Waiting for a subprocess to finish failed.
    #[error("failed waiting for '{program}': {message}")]
    WaitFailed {
        /// The program being waited on.
        program: String,
        /// A description of the failure.
        message: String,
    },

    /// A subprocess did not finish before its deadline.
    #[error("'{program}' did not finish within {timeout:?}")]
    TimedOut {
        /// The program that timed out.
        program: String,
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// A raw command string could not be split into arguments.
    #[error("malformed command line: {reason}")]
    MalformedCommand {
        /// Why the command line was rejected.
        reason: String,
    },

    /// No engine endpoint has been resolved.
    #[error("no container engine is active")]
    NoActiveEngine,

    /// An operation required a deployment directory that does not exist yet.
    #[error("no private engine deployment exists")]
    DeploymentMissing,

    /// Engine resolution is running and the session state is locked.
    #[error("engine resolution is in progress")]
    ResolutionInProgress,

    /// The private daemon could not be launched.
    #[error("failed to launch engine daemon '{program}': {message}")]
    DaemonLaunchFailed {
        /// The daemon binary.
        program: String,
        /// A description of the failure.
        message: String,
    },

    /// The daemon's API endpoint did not answer correctly.
    #[error("container engine health check failed: {message}")]
    HealthCheckFailed {
        /// A description of the health check failure.
        message: String,
    },

    /// The daemon's API endpoint did not answer in time.
    #[error("container engine health check timed out after {timeout:?}")]
    HealthCheckTimeout {
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// The owned private daemon could not be terminated.
    #[error("failed to terminate engine daemon (pid {pid:?}): {message}")]
    DaemonTerminateFailed {
        /// The daemon process ID, when known.
        pid: Option<u32>,
        /// A description of the failure.
        message: String,
    },
}

/// Errors that can occur during filesystem operations.
#[derive(Debug, Error)]
pub enum FilesystemError {
    /// A file or directory was not found.
    #[error("path not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Permission denied when accessing a path.
    #[error("permission denied: {path}")]
    PermissionDenied {
        /// The path that could not be accessed.
        path: PathBuf,
    },

    /// An I/O error occurred.
    #[error("I/O error at '{path}': {message}")]
    IoError {
        /// The path where the error occurred.
        path: PathBuf,
        /// A description of the I/O error.
        message: String,
    },

    /// The payload source has no bytes for an engine artifact.
    #[error("payload for '{artifact}' is unavailable: {message}")]
    PayloadUnavailable {
        /// The artifact file name.
        artifact: String,
        /// A description of the failure.
        message: String,
    },
}

impl FilesystemError {
    /// Classify an I/O error raised at `path`.
    pub(crate) fn from_io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path_buf = path.into();
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path: path_buf },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path: path_buf },
            _ => Self::IoError {
                path: path_buf,
                message: error.to_string(),
            },
        }
    }
}

/// Top-level error type for dockshim.
///
/// Aggregates the domain errors so library code can use a single `Result`
/// alias. The binary converts it to `eyre::Report` for reporting.
#[derive(Debug, Error)]
pub enum ShimError {
    /// An error occurred during configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred while managing or talking to an engine.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// An error occurred during filesystem operations.
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// A specialised `Result` type for dockshim operations.
pub type Result<T> = std::result::Result<T, ShimError>;
