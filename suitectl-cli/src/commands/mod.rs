//! Command handlers -- one module per subcommand group

pub mod config;
pub mod lifecycle;
pub mod list;
pub mod phase;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use suitectl_core::config::SuitectlConfig;
use suitectl_core::controller::{ControllerSettings, SelfInvokingCommands, SuiteController};
use suitectl_core::ledger::RunningSuiteLedger;
use suitectl_core::policy::Orchestrator;
use suitectl_core::process::ProcessRunner;
use suitectl_core::registry::SuiteRegistry;
use suitectl_core::signal::spawn_interrupt_listener;

use crate::error::CliError;
use crate::logging::init_tracing;

/// Loaded configuration plus the interrupt token shared by all phases.
pub struct Context {
    pub config: SuitectlConfig,
    pub config_path: PathBuf,
    pub interrupt: CancellationToken,
}

impl Context {
    /// Load and validate the configuration, then initialize logging.
    ///
    /// With `interruptible`, SIGINT/SIGTERM cancel [`Context::interrupt`]
    /// instead of killing the process.
    pub async fn load(
        config_path: PathBuf,
        log_level: Option<String>,
        interruptible: bool,
    ) -> Result<Self, CliError> {
        let mut config = SuitectlConfig::load(&config_path).await?;
        if let Some(level) = log_level {
            config.general.log_level = level;
            config.validate()?;
        }
        init_tracing(&config.general).map_err(|e| CliError::Command(e.to_string()))?;
        debug!(config = %config_path.display(), suites = config.suites.len(), "configuration loaded");

        let interrupt = CancellationToken::new();
        if interruptible {
            spawn_interrupt_listener(interrupt.clone())?;
        }

        Ok(Self {
            config,
            config_path,
            interrupt,
        })
    }

    pub fn registry(&self) -> Result<SuiteRegistry, CliError> {
        Ok(SuiteRegistry::from_config(&self.config)?)
    }

    /// Registry for a `suite-phase` child. Environment commands stay in this
    /// process's group so the parent's group kill reaches them.
    pub fn phase_registry(&self) -> Result<SuiteRegistry, CliError> {
        let runner =
            ProcessRunner::new(self.config.runner.forward_output).in_caller_process_group();
        Ok(SuiteRegistry::from_config_with_runner(&self.config, runner)?)
    }

    pub fn ledger(&self) -> RunningSuiteLedger {
        RunningSuiteLedger::new(self.config.ledger_path())
    }

    /// Orchestrator whose environment phases re-invoke this executable.
    pub fn orchestrator(&self) -> Result<Orchestrator, CliError> {
        let registry = Arc::new(self.registry()?);
        let program = std::env::current_exe()?;
        let commands =
            SelfInvokingCommands::from_config(program, Some(self.config_path.clone()), &self.config);

        let controller = SuiteController::new(registry, self.ledger(), Arc::new(commands))
            .with_runner(ProcessRunner::new(self.config.runner.forward_output))
            .with_settings(ControllerSettings::from_config(&self.config))
            .with_interrupt(self.interrupt.clone());
        Ok(Orchestrator::new(controller))
    }
}
