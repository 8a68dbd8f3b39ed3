//! Assertion helpers for engine session behavioural tests.

use std::sync::PoisonError;
use std::sync::atomic::Ordering;

use dockshim::engine::{ExecutionResult, Progress};
use rstest_bdd_macros::then;

use super::StepResult;
use super::state::EngineSessionState;
use super::steps::{runtime, session};

fn started(engine_session_state: &EngineSessionState) -> StepResult<bool> {
    engine_session_state
        .started
        .get()
        .ok_or_else(|| String::from("session start result should be set"))
}

fn last_result(engine_session_state: &EngineSessionState) -> StepResult<ExecutionResult> {
    engine_session_state
        .result
        .get()
        .ok_or_else(|| String::from("execution result should be set"))
}

fn progress(engine_session_state: &EngineSessionState) -> StepResult<Vec<Progress>> {
    engine_session_state
        .progress
        .get()
        .ok_or_else(|| String::from("progress events should be recorded"))
}

#[then("the session start succeeds")]
fn start_succeeds(engine_session_state: &EngineSessionState) -> StepResult<()> {
    if started(engine_session_state)? {
        Ok(())
    } else {
        Err(String::from("expected start to succeed"))
    }
}

#[then("the session start fails")]
fn start_fails(engine_session_state: &EngineSessionState) -> StepResult<()> {
    if started(engine_session_state)? {
        Err(String::from("expected start to fail"))
    } else {
        Ok(())
    }
}

#[then("the operating mode is {expected}")]
fn operating_mode_is(
    engine_session_state: &EngineSessionState,
    expected: String,
) -> StepResult<()> {
    let engine = session(engine_session_state)?;
    let mode = runtime()?.block_on(engine.active_mode());
    if mode.as_str() == expected {
        Ok(())
    } else {
        Err(format!("expected mode {expected}, got {mode}"))
    }
}

#[then("no deployment directory exists")]
fn no_deployment(engine_session_state: &EngineSessionState) -> StepResult<()> {
    let engine = session(engine_session_state)?;
    match runtime()?.block_on(engine.deployment_path()) {
        None => Ok(()),
        Some(path) => Err(format!("expected no deployment, got {path}")),
    }
}

#[then("a deployment directory exists")]
fn deployment_exists(engine_session_state: &EngineSessionState) -> StepResult<()> {
    let engine = session(engine_session_state)?;
    let path = runtime()?
        .block_on(engine.deployment_path())
        .ok_or_else(|| String::from("expected a deployment directory"))?;
    if path.is_dir() {
        Ok(())
    } else {
        Err(format!("deployment {path} is not a directory"))
    }
}

#[then("the daemon was launched {count} times")]
fn daemon_launched(engine_session_state: &EngineSessionState, count: usize) -> StepResult<()> {
    let launches = engine_session_state
        .launches
        .get()
        .ok_or_else(|| String::from("launch counter should be set"))?
        .load(Ordering::SeqCst);
    if launches == count {
        Ok(())
    } else {
        Err(format!("expected {count} launches, got {launches}"))
    }
}

#[then("the private daemon is running")]
fn daemon_running(engine_session_state: &EngineSessionState) -> StepResult<()> {
    if session(engine_session_state)?.is_daemon_running() {
        Ok(())
    } else {
        Err(String::from("expected the private daemon to be running"))
    }
}

#[then("the private daemon is not running")]
fn daemon_not_running(engine_session_state: &EngineSessionState) -> StepResult<()> {
    if session(engine_session_state)?.is_daemon_running() {
        Err(String::from("expected the private daemon to be stopped"))
    } else {
        Ok(())
    }
}

#[then("exactly {count} terminal progress event was published")]
fn terminal_events(engine_session_state: &EngineSessionState, count: usize) -> StepResult<()> {
    let terminal = progress(engine_session_state)?
        .into_iter()
        .filter(|stage| stage.is_terminal())
        .count();
    if terminal == count {
        Ok(())
    } else {
        Err(format!("expected {count} terminal events, got {terminal}"))
    }
}

#[then("the last progress event is {expected}")]
fn last_progress_is(
    engine_session_state: &EngineSessionState,
    expected: String,
) -> StepResult<()> {
    let last = progress(engine_session_state)?
        .last()
        .map(ToString::to_string)
        .ok_or_else(|| String::from("no progress events were published"))?;
    if last == expected {
        Ok(())
    } else {
        Err(format!("expected last progress '{expected}', got '{last}'"))
    }
}

#[then("the command fails without output")]
fn command_fails_without_output(engine_session_state: &EngineSessionState) -> StepResult<()> {
    let result = last_result(engine_session_state)?;
    if result == ExecutionResult::not_attempted() {
        Ok(())
    } else {
        Err(format!("expected a failure without output, got {result:?}"))
    }
}

#[then("the command succeeds with output {expected}")]
fn command_succeeds_with(
    engine_session_state: &EngineSessionState,
    expected: String,
) -> StepResult<()> {
    let result = last_result(engine_session_state)?;
    if result.success && result.output.as_deref() == Some(expected.as_str()) {
        Ok(())
    } else {
        Err(format!("expected success with '{expected}', got {result:?}"))
    }
}

#[then("the command fails with output {expected}")]
fn command_fails_with(
    engine_session_state: &EngineSessionState,
    expected: String,
) -> StepResult<()> {
    let result = last_result(engine_session_state)?;
    if !result.success && result.output.as_deref() == Some(expected.as_str()) {
        Ok(())
    } else {
        Err(format!("expected failure with '{expected}', got {result:?}"))
    }
}

#[then("the routed arguments are {expected}")]
fn routed_arguments_are(
    engine_session_state: &EngineSessionState,
    expected: String,
) -> StepResult<()> {
    let routed = engine_session_state
        .routed
        .get()
        .ok_or_else(|| String::from("routed log should be set"))?;
    let last = routed
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .last()
        .map(|args| args.join(" "))
        .ok_or_else(|| String::from("no command was routed"))?;
    if last == expected {
        Ok(())
    } else {
        Err(format!("expected routed arguments '{expected}', got '{last}'"))
    }
}

#[then("the stop reports {expected}")]
fn stop_reports(engine_session_state: &EngineSessionState, expected: bool) -> StepResult<()> {
    let stopped = engine_session_state
        .stopped
        .get()
        .ok_or_else(|| String::from("stop result should be set"))?;
    if stopped == expected {
        Ok(())
    } else {
        Err(format!("expected stop to report {expected}, got {stopped}"))
    }
}
