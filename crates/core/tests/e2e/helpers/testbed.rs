//! Temp-dir backed orchestrator fixture.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use suitectl_core::{
    BoxFuture, ControllerSettings, Environment, Orchestrator, ProcessError, ProcessRunner,
    RunningSuiteLedger, SuiteController, SuiteDescriptor, SuiteRegistry,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use super::commands::RecordingCommands;

/// Environment whose own up/down are never reached; phase commands do the work.
pub struct NoopEnvironment;

impl Environment for NoopEnvironment {
    fn up<'a>(&'a self, _: &'a Path) -> BoxFuture<'a, Result<(), ProcessError>> {
        Box::pin(async { Ok(()) })
    }

    fn down<'a>(&'a self, _: &'a Path) -> BoxFuture<'a, Result<(), ProcessError>> {
        Box::pin(async { Ok(()) })
    }
}

pub fn descriptor() -> SuiteDescriptor {
    SuiteDescriptor::new(Arc::new(NoopEnvironment))
}

/// Orchestrator wired to a temp ledger and [`RecordingCommands`].
pub struct TestBed {
    pub dir: TempDir,
    pub commands: Arc<RecordingCommands>,
    pub interrupt: CancellationToken,
    pub orchestrator: Orchestrator,
}

#[allow(dead_code)]
impl TestBed {
    /// Register `names` (in the given order) with stock descriptors.
    pub fn new(names: &[&str]) -> Self {
        Self::with_suites(names.iter().map(|n| (*n, descriptor())).collect())
    }

    pub fn with_suites(suites: Vec<(&str, SuiteDescriptor)>) -> Self {
        let mut registry = SuiteRegistry::new();
        for (name, descriptor) in suites {
            registry.register(name, descriptor).expect("register suite");
        }

        let dir = TempDir::new().expect("temp dir");
        let commands = RecordingCommands::new();
        let interrupt = CancellationToken::new();
        let controller = SuiteController::new(
            Arc::new(registry),
            RunningSuiteLedger::new(dir.path().join(".suite")),
            commands.clone(),
        )
        .with_runner(ProcessRunner::new(false))
        .with_settings(ControllerSettings {
            default_test_timeout: Duration::from_secs(60),
            readiness_interval: Duration::from_millis(10),
            suite_root: dir.path().join("suites"),
        })
        .with_interrupt(interrupt.clone());

        Self {
            dir,
            commands,
            interrupt,
            orchestrator: Orchestrator::new(controller),
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.dir.path().join(".suite")
    }

    pub fn ledger(&self) -> RunningSuiteLedger {
        RunningSuiteLedger::new(self.ledger_path())
    }

    pub fn running(&self) -> Option<String> {
        self.ledger().read().expect("ledger should be readable")
    }

    /// Cancel the interrupt token after `delay`.
    pub fn interrupt_after(&self, delay: Duration) {
        let token = self.interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            token.cancel();
        });
    }
}
