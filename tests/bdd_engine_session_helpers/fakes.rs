//! Scripted host collaborators for engine session scenarios.
//!
//! The fakes answer canary probes from an [`EngineWorld`] description, so a
//! scenario decides which candidate endpoints are reachable without a real
//! engine installed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dockshim::engine::{
    Artifact, CommandRunner, DaemonLauncher, DaemonProcess, InMemoryPayloads, Invocation,
    ProcessOutput, ReadinessCheck, ReadinessFuture, RunFuture,
};
use dockshim::error::EngineError;

const HOST_CLIENT: &str = "docker";
const CANARY_IMAGE: &str = "hello-world";

/// Reply returned for every routed (non-canary) command.
#[derive(Debug, Clone, Default)]
pub(crate) struct CommandReply {
    pub(crate) exit_code: i32,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

/// Which endpoints answer, and how routed commands behave.
#[derive(Debug, Clone, Default)]
pub(crate) struct EngineWorld {
    pub(crate) host_default: bool,
    pub(crate) host_port: bool,
    pub(crate) private_answers: bool,
    pub(crate) launch_fails: bool,
    pub(crate) reply: CommandReply,
}

/// Shared record of routed command arguments.
pub(crate) type RoutedLog = Arc<Mutex<Vec<Vec<String>>>>;

fn output(exit_code: i32, stdout: &str, stderr: &str) -> ProcessOutput {
    ProcessOutput {
        exit_code: Some(exit_code),
        stdout: String::from(stdout),
        stderr: String::from(stderr),
    }
}

/// Answers probes from the world and records routed commands.
pub(crate) struct FakeRunner {
    world: EngineWorld,
    launches: Arc<AtomicUsize>,
    routed: RoutedLog,
}

impl FakeRunner {
    pub(crate) const fn new(
        world: EngineWorld,
        launches: Arc<AtomicUsize>,
        routed: RoutedLog,
    ) -> Self {
        Self {
            world,
            launches,
            routed,
        }
    }

    fn answer(&self, invocation: &Invocation) -> ProcessOutput {
        let args = invocation.args();
        if args.last().map(String::as_str) != Some(CANARY_IMAGE) {
            self.routed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(args.to_vec());
            let reply = &self.world.reply;
            return output(reply.exit_code, &reply.stdout, &reply.stderr);
        }

        let host_client = invocation.program().as_str() == HOST_CLIENT;
        let via_port = args.iter().any(|arg| arg == "-H");
        let reachable = match (host_client, via_port) {
            (true, false) => self.world.host_default,
            (true, true) => self.world.host_port,
            (false, _) => {
                self.world.private_answers && self.launches.load(Ordering::SeqCst) > 0
            }
        };

        if reachable {
            output(0, "Hello from Docker!\n", "")
        } else {
            output(1, "", "Cannot connect to the Docker daemon\n")
        }
    }
}

impl CommandRunner for FakeRunner {
    fn run<'a>(&'a self, invocation: Invocation, _timeout: Duration) -> RunFuture<'a> {
        let reply = self.answer(&invocation);
        Box::pin(async move { Ok(reply) })
    }
}

/// Counts launches and optionally refuses them.
pub(crate) struct FakeLauncher {
    fails: bool,
    launches: Arc<AtomicUsize>,
}

impl FakeLauncher {
    pub(crate) const fn new(fails: bool, launches: Arc<AtomicUsize>) -> Self {
        Self { fails, launches }
    }
}

impl DaemonLauncher for FakeLauncher {
    fn launch(&self, invocation: Invocation) -> Result<Box<dyn DaemonProcess>, EngineError> {
        if self.fails {
            return Err(EngineError::DaemonLaunchFailed {
                program: invocation.program().to_string(),
                message: String::from("permission denied"),
            });
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeDaemon { alive: true }))
    }
}

/// A daemon that lives until terminated.
struct FakeDaemon {
    alive: bool,
}

impl DaemonProcess for FakeDaemon {
    fn id(&self) -> Option<u32> {
        Some(4242)
    }

    fn has_exited(&mut self) -> bool {
        !self.alive
    }

    fn terminate(&mut self) -> Result<(), EngineError> {
        self.alive = false;
        Ok(())
    }
}

/// Readiness that always answers.
pub(crate) struct FakeReadiness;

impl ReadinessCheck for FakeReadiness {
    fn check<'a>(&'a self, _port: u16, _timeout: Duration) -> ReadinessFuture<'a> {
        Box::pin(async { Ok(()) })
    }
}

/// Payload bytes for every artifact.
pub(crate) fn payloads() -> InMemoryPayloads {
    InMemoryPayloads::new()
        .with(Artifact::Client, b"client".to_vec())
        .with(Artifact::Daemon, b"daemon".to_vec())
        .with(Artifact::NetworkProxy, b"proxy".to_vec())
}
