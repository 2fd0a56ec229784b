//! Environment driver and readiness probe abstractions.
//!
//! A suite's setup and teardown capabilities are an [`Environment`]
//! implementation. Production suites use [`ComposeEnvironment`], which
//! drives `docker compose` over the suite's definition files; tests plug in
//! closures or mocks.
//!
//! ```text
//! ┌──────────────────┐      up/down       ┌────────────────────┐
//! │ suite-phase cmd  │ ─────────────────▶ │ Environment (trait)│
//! └──────────────────┘                    └─────────┬──────────┘
//!                                                   │
//!                                   ┌───────────────┴─────────┐
//!                                   ▼                         ▼
//!                          ComposeEnvironment          test doubles
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::ProcessError;
use crate::process::{CommandSpec, ProcessRunner};

/// Boxed, `Send` future returned by the dyn-compatible traits in this module.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Upper bound for a single readiness probe attempt.
const PROBE_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Setup/teardown capability of a suite.
pub trait Environment: Send + Sync {
    /// Bring the environment up. `suite_path` holds the suite's artifacts.
    fn up<'a>(&'a self, suite_path: &'a Path) -> BoxFuture<'a, Result<(), ProcessError>>;

    /// Tear the environment down.
    fn down<'a>(&'a self, suite_path: &'a Path) -> BoxFuture<'a, Result<(), ProcessError>>;

    /// Long-running command to attach to while the environment is served
    /// (log following, for instance).
    fn attach_command(&self, _suite_path: &Path) -> Option<CommandSpec> {
        None
    }
}

/// Externally supplied check confirming the environment accepts traffic.
pub trait ReadinessProbe: Send + Sync {
    fn probe(&self) -> BoxFuture<'_, bool>;
}

/// Result of [`wait_until_ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
    Interrupted,
}

/// Poll `probe` every `interval` until it succeeds, `timeout` elapses or
/// `cancel` fires.
pub async fn wait_until_ready(
    probe: &dyn ReadinessProbe,
    timeout: Duration,
    interval: Duration,
    cancel: &CancellationToken,
) -> Readiness {
    let poll = async {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            if probe.probe().await {
                debug!(attempt, "readiness probe succeeded");
                return;
            }
            debug!(attempt, "environment not ready yet");
            tokio::time::sleep(interval).await;
        }
    };

    tokio::select! {
        biased;
        res = tokio::time::timeout(timeout, poll) => match res {
            Ok(()) => Readiness::Ready,
            Err(_) => Readiness::TimedOut,
        },
        _ = cancel.cancelled() => Readiness::Interrupted,
    }
}

/// `docker compose` environment over a list of definition files.
#[derive(Debug, Clone)]
pub struct ComposeEnvironment {
    files: Vec<String>,
    working_dir: PathBuf,
    runner: ProcessRunner,
}

impl ComposeEnvironment {
    pub fn new(files: Vec<String>, working_dir: impl Into<PathBuf>, runner: ProcessRunner) -> Self {
        Self {
            files,
            working_dir: working_dir.into(),
            runner,
        }
    }

    fn compose(&self, suite_path: &Path) -> CommandSpec {
        let mut spec = CommandSpec::new("docker").arg("compose");
        for file in &self.files {
            spec = spec.arg("-f").arg(file.as_str());
        }
        spec.current_dir(&self.working_dir)
            .env("SUITE_PATH", suite_path.display().to_string())
    }

    /// Command used by [`Environment::up`].
    pub fn up_command(&self, suite_path: &Path) -> CommandSpec {
        self.compose(suite_path).args(["up", "-d"])
    }

    /// Command used by [`Environment::down`].
    pub fn down_command(&self, suite_path: &Path) -> CommandSpec {
        self.compose(suite_path).arg("down")
    }
}

impl Environment for ComposeEnvironment {
    fn up<'a>(&'a self, suite_path: &'a Path) -> BoxFuture<'a, Result<(), ProcessError>> {
        Box::pin(async move {
            let cmd = self.up_command(suite_path);
            info!(command = %cmd, "starting environment");
            self.runner.run(&cmd).await
        })
    }

    fn down<'a>(&'a self, suite_path: &'a Path) -> BoxFuture<'a, Result<(), ProcessError>> {
        Box::pin(async move {
            let cmd = self.down_command(suite_path);
            info!(command = %cmd, "stopping environment");
            self.runner.run(&cmd).await
        })
    }

    fn attach_command(&self, suite_path: &Path) -> Option<CommandSpec> {
        Some(self.compose(suite_path).args(["logs", "-f"]))
    }
}

/// Readiness probe that runs a shell command; exit 0 means ready.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    command: CommandSpec,
    runner: ProcessRunner,
}

impl CommandProbe {
    pub fn new(command: CommandSpec, runner: ProcessRunner) -> Self {
        Self { command, runner }
    }
}

impl ReadinessProbe for CommandProbe {
    fn probe(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            match self
                .runner
                .run_with_timeout(&self.command, PROBE_ATTEMPT_TIMEOUT)
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    debug!(command = %self.command, error = %e, "readiness probe failed");
                    false
                }
            }
        })
    }
}
