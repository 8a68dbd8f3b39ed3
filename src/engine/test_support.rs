//! Shared `mockall` doubles for the engine collaborator traits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mockall::mock;

use super::mode::Invocation;
use super::provision::{Artifact, PayloadSource};
use super::runner::{CommandRunner, ProcessOutput, RunFuture};
use super::supervisor::{DaemonLauncher, DaemonProcess, ReadinessCheck, ReadinessFuture};
use crate::error::{EngineError, FilesystemError};

mock! {
    pub Runner {}

    impl CommandRunner for Runner {
        fn run<'a>(&'a self, invocation: Invocation, timeout: Duration) -> RunFuture<'a>;
    }
}

mock! {
    pub Launcher {}

    impl DaemonLauncher for Launcher {
        fn launch(&self, invocation: Invocation) -> Result<Box<dyn DaemonProcess>, EngineError>;
    }
}

mock! {
    pub Process {}

    impl DaemonProcess for Process {
        fn id(&self) -> Option<u32>;
        fn has_exited(&mut self) -> bool;
        fn terminate(&mut self) -> Result<(), EngineError>;
    }
}

mock! {
    pub Readiness {}

    impl ReadinessCheck for Readiness {
        fn check<'a>(&'a self, port: u16, timeout: Duration) -> ReadinessFuture<'a>;
    }
}

mock! {
    pub Payloads {}

    impl PayloadSource for Payloads {
        fn payload(&self, artifact: Artifact) -> Result<Vec<u8>, FilesystemError>;
    }
}

/// A finished process with the given exit code and streams.
pub(crate) fn output(code: i32, stdout: &str, stderr: &str) -> ProcessOutput {
    ProcessOutput {
        exit_code: Some(code),
        stdout: String::from(stdout),
        stderr: String::from(stderr),
    }
}

/// A daemon that stays alive until terminated.
pub(crate) fn live_process(pid: Option<u32>) -> Box<dyn DaemonProcess> {
    let exited = Arc::new(AtomicBool::new(false));
    let observed = Arc::clone(&exited);
    let mut process = MockProcess::new();
    process.expect_id().return_const(pid);
    process
        .expect_has_exited()
        .returning(move || observed.load(Ordering::SeqCst));
    process.expect_terminate().returning(move || {
        exited.store(true, Ordering::SeqCst);
        Ok(())
    });
    Box::new(process)
}

/// A daemon that died right after launch.
pub(crate) fn exited_process() -> Box<dyn DaemonProcess> {
    let mut process = MockProcess::new();
    process.expect_id().return_const(None::<u32>);
    process.expect_has_exited().return_const(true);
    process.expect_terminate().returning(|| Ok(()));
    Box::new(process)
}
