//! Locate, or provision, a container engine endpoint and route commands to it.
//!
//! `dockshim` probes a fixed sequence of engine configurations on the host:
//! the system client on its default connection, then the system client on a
//! local TCP port. When neither answers it writes a private copy of the
//! engine binaries to disk, starts a private daemon on that port, and probes
//! again. Whichever endpoint answers first becomes the active
//! [`OperatingMode`](engine::OperatingMode), and every subsequent command is
//! rewritten to reach it.
//!
//! # Modules
//!
//! - [`api`]: The [`EngineSession`](api::EngineSession) entry point
//! - [`config`]: Configuration system with layered precedence (CLI > env > file > defaults)
//! - [`engine`]: Probing, provisioning, daemon supervision and command routing
//! - [`error`]: Semantic error types for the library
//! - [`telemetry`]: Structured logging setup

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod telemetry;
