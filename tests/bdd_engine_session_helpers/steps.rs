//! Given/when steps for engine session scenarios.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use camino::Utf8PathBuf;
use dockshim::api::{Collaborators, EngineSession};
use dockshim::engine::{EngineEvent, EngineSettings};
use rstest_bdd_macros::{given, when};

use super::StepResult;
use super::fakes::{EngineWorld, FakeLauncher, FakeReadiness, FakeRunner, RoutedLog, payloads};
use super::state::EngineSessionState;

fn update_world(engine_session_state: &EngineSessionState, change: impl FnOnce(&mut EngineWorld)) {
    let mut world = engine_session_state.world.get().unwrap_or_default();
    change(&mut world);
    engine_session_state.world.set(world);
}

pub(crate) fn runtime() -> StepResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| format!("failed to create runtime: {e}"))
}

/// Return the scenario's session, building it from the world on first use.
pub(crate) fn session(engine_session_state: &EngineSessionState) -> StepResult<Arc<EngineSession>> {
    if let Some(existing) = engine_session_state.session.get() {
        return Ok(existing);
    }

    let world = engine_session_state.world.get().unwrap_or_default();
    let temp_dir =
        Arc::new(tempfile::tempdir().map_err(|e| format!("failed to create temp dir: {e}"))?);
    let deployment_base = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf())
        .map_err(|path| format!("temp dir is not UTF-8: {}", path.display()))?;

    let launches = Arc::new(AtomicUsize::new(0));
    let routed = RoutedLog::default();
    let settings = EngineSettings {
        deployment_base,
        settle_delay: Duration::ZERO,
        readiness_timeout: Duration::from_secs(1),
        readiness_poll: Duration::from_millis(10),
        ..EngineSettings::default()
    };
    let collaborators = Collaborators {
        runner: Arc::new(FakeRunner::new(
            world.clone(),
            Arc::clone(&launches),
            Arc::clone(&routed),
        )),
        launcher: Arc::new(FakeLauncher::new(world.launch_fails, Arc::clone(&launches))),
        readiness: Arc::new(FakeReadiness),
        payloads: Arc::new(payloads()),
    };
    let built = Arc::new(EngineSession::with_collaborators(settings, collaborators));

    engine_session_state.temp_dir.set(temp_dir);
    engine_session_state.launches.set(launches);
    engine_session_state.routed.set(routed);
    engine_session_state.session.set(Arc::clone(&built));
    Ok(built)
}

#[given("the host engine answers on its default connection")]
fn host_engine_answers_on_default(engine_session_state: &EngineSessionState) {
    update_world(engine_session_state, |world| world.host_default = true);
}

#[given("the host engine answers on the local port")]
fn host_engine_answers_on_port(engine_session_state: &EngineSessionState) {
    update_world(engine_session_state, |world| world.host_port = true);
}

#[given("the private daemon answers once launched")]
fn private_daemon_answers(engine_session_state: &EngineSessionState) {
    update_world(engine_session_state, |world| world.private_answers = true);
}

#[given("the daemon launch fails")]
fn daemon_launch_fails(engine_session_state: &EngineSessionState) {
    update_world(engine_session_state, |world| {
        world.private_answers = true;
        world.launch_fails = true;
    });
}

#[given("engine commands print {stdout}")]
fn engine_commands_print(engine_session_state: &EngineSessionState, stdout: String) {
    update_world(engine_session_state, |world| {
        world.reply.exit_code = 0;
        world.reply.stdout = format!("{stdout}\n");
    });
}

#[given("engine commands fail with {stderr}")]
fn engine_commands_fail(engine_session_state: &EngineSessionState, stderr: String) {
    update_world(engine_session_state, |world| {
        world.reply.exit_code = 1;
        world.reply.stderr = format!("{stderr}\n");
    });
}

#[when("the session starts")]
fn session_starts(engine_session_state: &EngineSessionState) -> StepResult<()> {
    let engine = session(engine_session_state)?;
    let mut events = engine.subscribe();

    let started = runtime()?.block_on(engine.start());

    let mut progress = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let EngineEvent::Progress(stage) = event {
            progress.push(stage);
        }
    }
    engine_session_state.progress.set(progress);
    engine_session_state.started.set(started);
    Ok(())
}

#[when("the command {command} is executed")]
fn command_is_executed(
    engine_session_state: &EngineSessionState,
    command: String,
) -> StepResult<()> {
    let engine = session(engine_session_state)?;
    let result = runtime()?.block_on(engine.execute(&command));
    engine_session_state.result.set(result);
    Ok(())
}

#[when("the session stops")]
fn session_stops(engine_session_state: &EngineSessionState) -> StepResult<()> {
    let engine = session(engine_session_state)?;
    let stopped = runtime()?.block_on(engine.stop());
    engine_session_state.stopped.set(stopped);
    Ok(())
}
