//! Container engine discovery, provisioning and command routing.
//!
//! Components, leaf first:
//!
//! - [`BinaryProvisioner`] writes the private client, daemon and proxy
//!   executables into a deployment directory.
//! - [`DaemonSupervisor`] owns the privately started daemon.
//! - [`EngineProbe`] runs a canary container against a candidate endpoint.
//! - [`ModeResolver`] walks the candidates in order and settles on an
//!   [`OperatingMode`].
//! - [`CommandRouter`] rewrites engine commands for the active mode and runs
//!   them.
//!
//! Subprocesses and daemons are reached through the [`CommandRunner`],
//! [`DaemonLauncher`] and [`ReadinessCheck`] traits.

pub mod command_line;
mod events;
mod mode;
mod probe;
mod provision;
mod resolver;
mod router;
mod runner;
mod settings;
mod supervisor;

#[cfg(test)]
pub(crate) mod test_support;

pub use events::{EngineEvent, EventBus, Progress};
pub use mode::{Candidate, Connection, Invocation, OperatingMode, daemon_bind_args};
pub use probe::{CANARY_GREETING, EngineProbe, ProbeOutcome, contains_canary_greeting};
pub use provision::{
    Artifact, BinaryProvisioner, BundleDirectory, InMemoryPayloads, PayloadSource,
    ProvisionReport,
};
pub use resolver::ModeResolver;
pub use router::{CommandRouter, ExecutionResult};
pub use runner::{CommandRunner, ProcessOutput, RunFuture, SystemCommandRunner};
pub use settings::EngineSettings;
pub use supervisor::{
    DaemonLauncher, DaemonProcess, DaemonStart, DaemonSupervisor, PingReadiness, Readiness,
    ReadinessCheck, ReadinessFuture, SystemDaemonLauncher, daemon_invocation,
};
