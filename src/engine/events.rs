//! Progress and result notifications.
//!
//! Events are broadcast over a `tokio::sync::broadcast` channel. Sending never
//! blocks and never fails the caller: with no subscribers the event is simply
//! dropped, and slow subscribers observe a lag instead of back-pressure.

use std::fmt;

use tokio::sync::broadcast;
use tracing::trace;

use super::mode::OperatingMode;
use super::router::ExecutionResult;

/// Buffered events per subscriber before the oldest are dropped.
const EVENT_CAPACITY: usize = 64;

/// Human-readable stage of engine resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// A candidate is about to be probed.
    CheckingMode,
    /// Private artifacts are being materialized.
    FirstStageDeployment,
    /// The private daemon is being started.
    SecondStageDeployment,
    /// Resolution finished with a reachable endpoint.
    Ready(OperatingMode),
    /// Resolution finished without a reachable endpoint.
    CouldNotStart,
}

impl Progress {
    /// Returns `true` for the two notifications that end a resolution.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready(_) | Self::CouldNotStart)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckingMode => f.write_str("Checking engine operating mode.."),
            Self::FirstStageDeployment => f.write_str("First stage deployment.."),
            Self::SecondStageDeployment => f.write_str("Second stage deployment.."),
            Self::Ready(mode) => write!(f, "Engine ready ({mode})"),
            Self::CouldNotStart => f.write_str("Engine could not start"),
        }
    }
}

/// A notification raised by an engine session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Resolution progress.
    Progress(Progress),
    /// The outcome of one routed command.
    Result(ExecutionResult),
}

/// Fan-out of [`EngineEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Receive every event sent from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Broadcast a progress notification.
    pub fn progress(&self, progress: Progress) {
        self.send(EngineEvent::Progress(progress));
    }

    /// Broadcast a command result.
    pub fn result(&self, result: ExecutionResult) {
        self.send(EngineEvent::Result(result));
    }

    fn send(&self, event: EngineEvent) {
        if let Err(broadcast::error::SendError(dropped)) = self.sender.send(event) {
            trace!(event = ?dropped, "no event subscribers");
        }
    }
}
