//! Suite registry -- name to descriptor table.
//!
//! The registry is filled once at startup by explicit [`SuiteRegistry::register`]
//! calls (or [`SuiteRegistry::from_config`]) and then shared read-only,
//! typically as `Arc<SuiteRegistry>`.
//!
//! Names are kept in a `BTreeMap`, so [`SuiteRegistry::names`] is sorted;
//! the "run all suites" policy depends on that order.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{SuiteConfig, SuitectlConfig};
use crate::environment::{CommandProbe, ComposeEnvironment, Environment, ReadinessProbe};
use crate::error::SuiteError;
use crate::process::{CommandSpec, ProcessRunner};

/// Everything the controller needs to drive one suite.
#[derive(Clone)]
pub struct SuiteDescriptor {
    /// Setup and teardown capability.
    pub environment: Arc<dyn Environment>,
    /// Readiness check run after a successful setup.
    pub readiness: Option<Arc<dyn ReadinessProbe>>,
    pub setup_timeout: Duration,
    /// Zero means "use the setup timeout".
    pub teardown_timeout: Duration,
    /// Zero means "use the runner default".
    pub test_timeout: Duration,
    /// Zero means "use the setup timeout".
    pub readiness_timeout: Duration,
    pub description: Option<String>,
}

impl SuiteDescriptor {
    /// Descriptor with the stock timeouts (5 min setup, 2 min teardown).
    pub fn new(environment: Arc<dyn Environment>) -> Self {
        Self {
            environment,
            readiness: None,
            setup_timeout: Duration::from_secs(300),
            teardown_timeout: Duration::from_secs(120),
            test_timeout: Duration::ZERO,
            readiness_timeout: Duration::ZERO,
            description: None,
        }
    }

    pub fn with_readiness(mut self, probe: Arc<dyn ReadinessProbe>) -> Self {
        self.readiness = Some(probe);
        self
    }

    pub fn with_setup_timeout(mut self, timeout: Duration) -> Self {
        self.setup_timeout = timeout;
        self
    }

    pub fn with_teardown_timeout(mut self, timeout: Duration) -> Self {
        self.teardown_timeout = timeout;
        self
    }

    pub fn with_test_timeout(mut self, timeout: Duration) -> Self {
        self.test_timeout = timeout;
        self
    }

    pub fn with_readiness_timeout(mut self, timeout: Duration) -> Self {
        self.readiness_timeout = timeout;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Bound applied to the teardown command.
    pub fn effective_teardown_timeout(&self) -> Duration {
        if self.teardown_timeout.is_zero() {
            self.setup_timeout
        } else {
            self.teardown_timeout
        }
    }

    /// Bound applied to readiness polling.
    pub fn effective_readiness_timeout(&self) -> Duration {
        if self.readiness_timeout.is_zero() {
            self.setup_timeout
        } else {
            self.readiness_timeout
        }
    }

    /// Build a compose-backed descriptor from a `[[suites]]` entry.
    pub fn from_config(
        suite: &SuiteConfig,
        config: &SuitectlConfig,
        runner: ProcessRunner,
    ) -> Self {
        let environment = ComposeEnvironment::new(
            suite.compose_files.clone(),
            config.working_dir(),
            runner,
        );
        let mut descriptor = Self::new(Arc::new(environment))
            .with_setup_timeout(Duration::from_secs(suite.setup_timeout_secs))
            .with_teardown_timeout(Duration::from_secs(suite.teardown_timeout_secs))
            .with_test_timeout(Duration::from_secs(suite.test_timeout_secs))
            .with_readiness_timeout(Duration::from_secs(suite.readiness_timeout_secs));

        if let Some(ready) = suite.ready_command.as_deref().filter(|c| !c.trim().is_empty()) {
            let probe = CommandProbe::new(
                CommandSpec::shell(ready).current_dir(config.working_dir()),
                // Probe chatter stays off the terminal.
                ProcessRunner::new(false),
            );
            descriptor = descriptor.with_readiness(Arc::new(probe));
        }
        if !suite.description.trim().is_empty() {
            descriptor = descriptor.with_description(suite.description.trim());
        }
        descriptor
    }
}

impl fmt::Debug for SuiteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteDescriptor")
            .field("readiness", &self.readiness.is_some())
            .field("setup_timeout", &self.setup_timeout)
            .field("teardown_timeout", &self.teardown_timeout)
            .field("test_timeout", &self.test_timeout)
            .field("readiness_timeout", &self.readiness_timeout)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Suite registry.
#[derive(Debug, Default)]
pub struct SuiteRegistry {
    suites: BTreeMap<String, SuiteDescriptor>,
}

impl SuiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every `[[suites]]` entry in file order.
    pub fn from_config(config: &SuitectlConfig) -> Result<Self, SuiteError> {
        Self::from_config_with_runner(config, ProcessRunner::new(config.runner.forward_output))
    }

    /// Like [`from_config`](Self::from_config), with `runner` driving the
    /// environments' own commands.
    pub fn from_config_with_runner(
        config: &SuitectlConfig,
        runner: ProcessRunner,
    ) -> Result<Self, SuiteError> {
        let mut registry = Self::new();
        for suite in &config.suites {
            registry.register(
                suite.name.clone(),
                SuiteDescriptor::from_config(suite, config, runner),
            )?;
        }
        tracing::debug!(suites = registry.len(), "suite registry initialized");
        Ok(registry)
    }

    /// Register a suite. A name may only be registered once.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        descriptor: SuiteDescriptor,
    ) -> Result<(), SuiteError> {
        let name = name.into();
        if self.suites.contains_key(&name) {
            return Err(SuiteError::DuplicateSuite(name));
        }
        self.suites.insert(name, descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&SuiteDescriptor, SuiteError> {
        self.suites
            .get(name)
            .ok_or_else(|| SuiteError::UnknownSuite(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.suites.contains_key(name)
    }

    /// Registered names in lexicographic order.
    pub fn names(&self) -> Vec<String> {
        self.suites.keys().cloned().collect()
    }

    /// Iterate `(name, descriptor)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SuiteDescriptor)> {
        self.suites.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }
}
