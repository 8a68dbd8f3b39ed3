//! Scenario state for engine session behavioural tests.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use dockshim::api::EngineSession;
use dockshim::engine::{ExecutionResult, Progress};
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use tempfile::TempDir;

use super::fakes::{EngineWorld, RoutedLog};

/// State shared across engine session scenario steps.
#[derive(Default, ScenarioState)]
pub(crate) struct EngineSessionState {
    /// Which endpoints answer and how commands reply.
    pub(crate) world: Slot<EngineWorld>,

    /// Base directory for deployments.
    pub(crate) temp_dir: Slot<Arc<TempDir>>,

    /// Session under test, built on first use.
    pub(crate) session: Slot<Arc<EngineSession>>,

    /// Number of successful daemon launches.
    pub(crate) launches: Slot<Arc<AtomicUsize>>,

    /// Arguments of every routed command.
    pub(crate) routed: Slot<RoutedLog>,

    /// Result of the last `start`.
    pub(crate) started: Slot<bool>,

    /// Result of the last `stop`.
    pub(crate) stopped: Slot<bool>,

    /// Result of the last executed command.
    pub(crate) result: Slot<ExecutionResult>,

    /// Progress events observed during `start`.
    pub(crate) progress: Slot<Vec<Progress>>,
}

#[fixture]
pub(crate) fn engine_session_state() -> EngineSessionState {
    let state = EngineSessionState::default();
    state.world.set(EngineWorld::default());
    state
}
