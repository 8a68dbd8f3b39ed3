//! `dockshim` application entry point.
//!
//! Resolves a container engine endpoint, then reports the mode, runs one
//! command, or runs one command per stdin line. It uses `eyre` for opaque
//! error handling at the application boundary, converting domain-specific
//! errors into human-readable reports.
//!
//! Configuration is loaded with layered precedence via `OrthoConfig`:
//! 1. Application defaults
//! 2. Configuration file (`~/.config/dockshim/config.toml` or path from `DOCKSHIM_CONFIG_PATH`)
//! 3. Environment variables (`DOCKSHIM_*`)
//! 4. Command-line arguments

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use dockshim::api::{CommandOutcome, EngineSession};
use dockshim::config::{Cli, Commands, ExecArgs, load_config};
use dockshim::engine::{EngineEvent, EngineSettings, command_line};
use dockshim::telemetry;
use eyre::{Report, Result as EyreResult};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

/// Exit code used when interrupted by Ctrl-C.
const INTERRUPTED: u8 = 130;

/// Application entry point.
///
/// Loads configuration, installs telemetry, then dispatches to the
/// subcommand. A Ctrl-C terminates any private daemon before exiting.
#[tokio::main]
async fn main() -> EyreResult<ExitCode> {
    // Parse CLI first (for subcommand dispatch and global options).
    let cli = Cli::parse();

    // Load configuration with layered precedence: defaults < file < env < CLI.
    let config = load_config(&cli).map_err(Report::from)?;
    telemetry::initialise(&config.log).map_err(Report::from)?;

    let session = Arc::new(EngineSession::new(EngineSettings::from(&config)));
    let printer = tokio::spawn(print_progress(session.subscribe()));

    let outcome = tokio::select! {
        outcome = run(&cli.command, &session) => outcome?,
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(Report::from)?;
            session.on_exit_or_failure();
            printer.abort();
            return Ok(ExitCode::from(INTERRUPTED));
        }
    };

    session.stop().await;
    printer.abort();
    Ok(ExitCode::from(outcome.exit_code()))
}

/// Execute the CLI command against a fresh session.
async fn run(command: &Commands, session: &EngineSession) -> EyreResult<CommandOutcome> {
    if !session.start().await {
        return Ok(CommandOutcome::EngineUnavailable);
    }
    match command {
        Commands::Status => Ok(report_status(session).await),
        Commands::Exec(args) => Ok(exec_once(session, args).await),
        Commands::Session => run_session(session).await,
    }
}

/// Print the resolved operating mode.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
async fn report_status(session: &EngineSession) -> CommandOutcome {
    println!("{}", session.active_mode().await);
    if let Some(path) = session.deployment_path().await {
        println!("deployment: {path}");
    }
    CommandOutcome::Success
}

/// Run one engine command and print its output.
async fn exec_once(session: &EngineSession, args: &ExecArgs) -> CommandOutcome {
    let result = session.execute(&command_line::join(&args.command)).await;
    print_output(result.output.as_deref(), result.success);
    CommandOutcome::from(&result)
}

/// Run one engine command per stdin line until end of input.
///
/// The outcome is a failure when any command failed.
async fn run_session(session: &EngineSession) -> EyreResult<CommandOutcome> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut outcome = CommandOutcome::Success;

    while let Some(line) = lines.next_line().await.map_err(Report::from)? {
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        let result = session.execute(command).await;
        print_output(result.output.as_deref(), result.success);
        if !result.success {
            outcome = CommandOutcome::CommandFailed;
        }
    }
    Ok(outcome)
}

#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
#[expect(clippy::print_stderr, reason = "CLI output is the intended behaviour")]
fn print_output(output: Option<&str>, success: bool) {
    match output.filter(|text| !text.is_empty()) {
        Some(text) if success => println!("{text}"),
        Some(text) => eprintln!("{text}"),
        None => {}
    }
}

/// Echo resolution progress to stderr until the channel closes.
#[expect(clippy::print_stderr, reason = "progress is user-facing CLI output")]
async fn print_progress(mut events: broadcast::Receiver<EngineEvent>) {
    loop {
        match events.recv().await {
            Ok(EngineEvent::Progress(progress)) => eprintln!("{progress}"),
            Ok(EngineEvent::Result(_)) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
