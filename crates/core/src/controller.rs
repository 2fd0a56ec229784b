//! Suite lifecycle controller -- setup, readiness, tests and teardown.
//!
//! The controller owns the running-suite ledger and is the only component
//! that mutates it. It drives one suite at a time through:
//!
//! ```text
//!   Idle ──set_up──▶ SettingUp ──ok──▶ Running ──tear_down──▶ TearingDown ──▶ Idle
//!                        │                                         ▲
//!                        └──────────── failure / interrupt ────────┘
//! ```
//!
//! Phase commands come from a [`PhaseCommands`] implementation. In
//! production [`SelfInvokingCommands`] re-runs the current executable with
//! the hidden `suite-phase` subcommand, which ends up in
//! [`run_environment_phase`] on the child side. Every phase command runs in
//! its own process group, so a timeout or interrupt kills the whole tree.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{SUITE_PLACEHOLDER, SuitectlConfig, TIMEOUT_PLACEHOLDER};
use crate::environment::{Readiness, wait_until_ready};
use crate::error::{Phase, SuiteError};
use crate::ledger::RunningSuiteLedger;
use crate::process::{CommandSpec, ProcessRunner};
use crate::registry::{SuiteDescriptor, SuiteRegistry};

/// Lifecycle state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteState {
    Idle,
    SettingUp,
    Running,
    TearingDown,
}

impl fmt::Display for SuiteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::SettingUp => write!(f, "setting_up"),
            Self::Running => write!(f, "running"),
            Self::TearingDown => write!(f, "tearing_down"),
        }
    }
}

/// Environment phase executed by a `suite-phase` child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentPhase {
    Setup,
    Teardown,
}

impl EnvironmentPhase {
    pub fn phase(self) -> Phase {
        match self {
            Self::Setup => Phase::Setup,
            Self::Teardown => Phase::Teardown,
        }
    }

    /// Subcommand argument (`setup` / `teardown`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Teardown => "teardown",
        }
    }
}

/// Flags forwarded to the test command as environment variables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestOptions {
    /// Export `HEADLESS=y`.
    pub headless: bool,
    /// Export `ONLY_FORBIDDEN=y`.
    pub only_forbidden: bool,
}

/// Builds the external commands for each phase.
pub trait PhaseCommands: Send + Sync {
    /// Command bringing the suite's environment up or down.
    fn environment_command(&self, phase: EnvironmentPhase, suite: &str) -> CommandSpec;

    /// Command running the suite's tests under `timeout`.
    fn test_command(&self, suite: &str, timeout: Duration, options: &TestOptions) -> CommandSpec;
}

/// Production [`PhaseCommands`]: environment phases re-invoke `program`
/// (normally the running `suitectl` binary), tests run the configured
/// shell template.
#[derive(Debug, Clone)]
pub struct SelfInvokingCommands {
    program: PathBuf,
    config_path: Option<PathBuf>,
    test_template: String,
    working_dir: PathBuf,
}

impl SelfInvokingCommands {
    pub fn new(
        program: impl Into<PathBuf>,
        config_path: Option<PathBuf>,
        test_template: impl Into<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            config_path,
            test_template: test_template.into(),
            working_dir: working_dir.into(),
        }
    }

    /// Commands for `config`, re-invoking `program` with `config_path`.
    pub fn from_config(
        program: impl Into<PathBuf>,
        config_path: Option<PathBuf>,
        config: &SuitectlConfig,
    ) -> Self {
        Self::new(
            program,
            config_path,
            config.runner.test_command.clone(),
            config.working_dir(),
        )
    }
}

impl PhaseCommands for SelfInvokingCommands {
    fn environment_command(&self, phase: EnvironmentPhase, suite: &str) -> CommandSpec {
        let mut spec = CommandSpec::new(self.program.display().to_string());
        if let Some(config) = &self.config_path {
            spec = spec.arg("--config").arg(config.display().to_string());
        }
        spec.args(["suite-phase", phase.as_str(), suite])
    }

    fn test_command(&self, suite: &str, timeout: Duration, options: &TestOptions) -> CommandSpec {
        let mut spec = CommandSpec::shell(render_test_command(&self.test_template, suite, timeout))
            .current_dir(&self.working_dir);
        if options.headless {
            spec = spec.env("HEADLESS", "y");
        }
        if options.only_forbidden {
            spec = spec.env("ONLY_FORBIDDEN", "y");
        }
        spec
    }
}

/// Fill the `{suite}` and `{timeout}` placeholders of a test command template.
///
/// The timeout is rendered in whole seconds with an `s` suffix (`60s`).
pub fn render_test_command(template: &str, suite: &str, timeout: Duration) -> String {
    template
        .replace(SUITE_PLACEHOLDER, suite)
        .replace(TIMEOUT_PLACEHOLDER, &format!("{}s", timeout.as_secs()))
}

/// Test bound: explicit override, then the suite's own bound, then `default`.
/// Zero values count as unset.
pub fn resolve_test_timeout(
    override_timeout: Option<Duration>,
    descriptor_timeout: Duration,
    default: Duration,
) -> Duration {
    override_timeout
        .filter(|t| !t.is_zero())
        .or_else(|| Some(descriptor_timeout).filter(|t| !t.is_zero()))
        .unwrap_or(default)
}

/// Controller tuning taken from `[general]` and `[runner]`.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub default_test_timeout: Duration,
    pub readiness_interval: Duration,
    /// Directory holding one sub-directory per suite.
    pub suite_root: PathBuf,
}

impl ControllerSettings {
    pub fn from_config(config: &SuitectlConfig) -> Self {
        Self {
            default_test_timeout: config.runner.default_test_timeout(),
            readiness_interval: config.runner.readiness_interval(),
            suite_root: config.working_dir().join(&config.general.suites_dir),
        }
    }

    pub fn suite_path(&self, name: &str) -> PathBuf {
        self.suite_root.join(name)
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            default_test_timeout: Duration::from_secs(60),
            readiness_interval: Duration::from_secs(1),
            suite_root: PathBuf::from("suites"),
        }
    }
}

/// Drives suites through their lifecycle and keeps the ledger in sync.
pub struct SuiteController {
    registry: Arc<SuiteRegistry>,
    ledger: RunningSuiteLedger,
    commands: Arc<dyn PhaseCommands>,
    runner: ProcessRunner,
    settings: ControllerSettings,
    interrupt: CancellationToken,
    state: SuiteState,
}

impl SuiteController {
    pub fn new(
        registry: Arc<SuiteRegistry>,
        ledger: RunningSuiteLedger,
        commands: Arc<dyn PhaseCommands>,
    ) -> Self {
        Self {
            registry,
            ledger,
            commands,
            runner: ProcessRunner::default(),
            settings: ControllerSettings::default(),
            interrupt: CancellationToken::new(),
            state: SuiteState::Idle,
        }
    }

    pub fn with_runner(mut self, runner: ProcessRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_settings(mut self, settings: ControllerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Token observed by cancellable phases (setup, readiness, tests, serve).
    pub fn with_interrupt(mut self, interrupt: CancellationToken) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn registry(&self) -> &SuiteRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &RunningSuiteLedger {
        &self.ledger
    }

    pub fn state(&self) -> SuiteState {
        self.state
    }

    /// Bring `name` up, wait for readiness and record it as running.
    ///
    /// The ledger must be empty or already name `name`; another recorded
    /// suite is a `ConflictingSuite` and nothing is launched.
    ///
    /// On any failure the environment is torn down before the original
    /// error is returned; a teardown failure is only logged.
    pub async fn set_up(&mut self, name: &str) -> Result<(), SuiteError> {
        let descriptor = self.registry.get(name)?.clone();
        if let Some(running) = self.ledger.read()?.filter(|running| running != name) {
            return Err(SuiteError::ConflictingSuite {
                running,
                requested: name.to_owned(),
            });
        }

        self.transition(name, SuiteState::SettingUp);
        match self.bring_up(name, &descriptor).await {
            Ok(()) => {
                self.transition(name, SuiteState::Running);
                info!(suite = name, "environment is ready");
                Ok(())
            }
            Err(err) => {
                if err.is_interrupted() {
                    warn!(suite = name, "setup interrupted, tearing down environment");
                } else {
                    warn!(suite = name, error = %err, "setup failed, tearing down environment");
                }
                if let Err(teardown_err) = self.tear_down(name).await {
                    error!(
                        suite = name,
                        error = %teardown_err,
                        "error occurred during teardown"
                    );
                }
                Err(err)
            }
        }
    }

    async fn bring_up(&self, name: &str, descriptor: &SuiteDescriptor) -> Result<(), SuiteError> {
        let cmd = self.commands.environment_command(EnvironmentPhase::Setup, name);
        info!(
            suite = name,
            timeout_secs = descriptor.setup_timeout.as_secs(),
            "setting up environment"
        );
        self.runner
            .run_cancellable(&cmd, descriptor.setup_timeout, &self.interrupt)
            .await
            .map_err(|e| SuiteError::from_process(name, Phase::Setup, e))?;

        if let Some(probe) = &descriptor.readiness {
            let waited = descriptor.effective_readiness_timeout();
            info!(
                suite = name,
                timeout_secs = waited.as_secs(),
                "waiting for environment readiness"
            );
            match wait_until_ready(
                probe.as_ref(),
                waited,
                self.settings.readiness_interval,
                &self.interrupt,
            )
            .await
            {
                Readiness::Ready => {}
                Readiness::TimedOut => {
                    return Err(SuiteError::NotReady {
                        suite: name.to_owned(),
                        waited,
                    });
                }
                Readiness::Interrupted => {
                    return Err(SuiteError::Interrupted {
                        suite: name.to_owned(),
                        phase: Phase::Readiness,
                    });
                }
            }
        }

        self.ledger.write(name)
    }

    /// Tear `name` down and clear the ledger.
    ///
    /// Teardown ignores the interrupt token. The ledger is cleared even when
    /// the teardown command fails; the command's error is returned first.
    pub async fn tear_down(&mut self, name: &str) -> Result<(), SuiteError> {
        let timeout = self.registry.get(name)?.effective_teardown_timeout();

        self.transition(name, SuiteState::TearingDown);
        let cmd = self
            .commands
            .environment_command(EnvironmentPhase::Teardown, name);
        info!(
            suite = name,
            timeout_secs = timeout.as_secs(),
            "tearing down environment"
        );
        let outcome = self
            .runner
            .run_with_timeout(&cmd, timeout)
            .await
            .map_err(|e| SuiteError::from_process(name, Phase::Teardown, e));
        let cleared = self.ledger.clear();
        self.transition(name, SuiteState::Idle);

        outcome?;
        cleared
    }

    /// Run the suite's tests against an environment that is already up.
    pub async fn run_tests(
        &self,
        name: &str,
        timeout_override: Option<Duration>,
        options: &TestOptions,
    ) -> Result<(), SuiteError> {
        let descriptor = self.registry.get(name)?;
        let timeout = resolve_test_timeout(
            timeout_override,
            descriptor.test_timeout,
            self.settings.default_test_timeout,
        );
        let cmd = self.commands.test_command(name, timeout, options);
        info!(
            suite = name,
            timeout_secs = timeout.as_secs(),
            headless = options.headless,
            only_forbidden = options.only_forbidden,
            "running tests"
        );
        self.runner
            .run_cancellable(&cmd, timeout, &self.interrupt)
            .await
            .map_err(|e| SuiteError::from_process(name, Phase::Test, e))?;
        info!(suite = name, "tests passed");
        Ok(())
    }

    /// Set `name` up, stay attached until interrupted, then tear it down.
    pub async fn serve(&mut self, name: &str) -> Result<(), SuiteError> {
        self.set_up(name).await?;

        let suite_path = self.settings.suite_path(name);
        let attach = self
            .registry
            .get(name)?
            .environment
            .attach_command(&suite_path);
        let attached = match attach {
            Some(cmd) => self
                .runner
                .run_until_interrupted(&cmd, self.interrupt.cancelled())
                .await
                .map_err(|e| SuiteError::from_process(name, Phase::Attach, e)),
            None => {
                info!(suite = name, "environment is up, hit Ctrl+C to shut down");
                self.interrupt.cancelled().await;
                Ok(())
            }
        };
        if let Err(e) = &attached {
            warn!(suite = name, error = %e, "attach failed, tearing down environment");
        }

        let torn = self.tear_down(name).await;
        attached?;
        torn
    }

    fn transition(&mut self, name: &str, next: SuiteState) {
        if self.state != next {
            info!(suite = name, from = %self.state, to = %next, "suite state changed");
            self.state = next;
        }
    }
}

/// Child side of a `suite-phase` invocation: run the environment's own
/// setup or teardown for `name`.
pub async fn run_environment_phase(
    registry: &SuiteRegistry,
    phase: EnvironmentPhase,
    name: &str,
    suite_path: &Path,
) -> Result<(), SuiteError> {
    let descriptor = registry.get(name)?;
    info!(
        suite = name,
        phase = phase.as_str(),
        suite_path = %suite_path.display(),
        "running environment phase"
    );
    let result = match phase {
        EnvironmentPhase::Setup => descriptor.environment.up(suite_path).await,
        EnvironmentPhase::Teardown => descriptor.environment.down(suite_path).await,
    };
    result.map_err(|e| SuiteError::from_process(name, phase.phase(), e))
}
