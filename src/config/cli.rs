//! Command-line argument definitions for dockshim.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Command-line interface for dockshim.
#[derive(Debug, Parser)]
#[command(name = "dockshim")]
#[command(
    author,
    version,
    about = "Locate or provision a container engine and route commands to it"
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// System engine client binary.
    #[arg(long, global = true)]
    pub client_binary: Option<String>,

    /// Directory holding the bundled engine artifacts.
    #[arg(long, global = true)]
    pub payload_dir: Option<String>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve an engine endpoint and report the operating mode.
    Status,

    /// Resolve an engine endpoint and run one engine command against it.
    Exec(ExecArgs),

    /// Resolve an engine endpoint and run one engine command per stdin line.
    Session,
}

/// Arguments for the `exec` subcommand.
#[derive(Debug, Parser)]
pub struct ExecArgs {
    /// Engine command to run, for example `ps -a`.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}
