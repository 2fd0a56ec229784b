//! Configuration -- `suitectl.toml` parsing and runtime settings.
//!
//! [`SuitectlConfig`] is the top-level structure. The `[[suites]]` array
//! declares every suite; [`SuiteRegistry::from_config`] registers them in
//! file order.
//!
//! # Loading precedence
//! 1. CLI flags (applied by the binary)
//! 2. Environment variables (`SUITECTL_GENERAL_LOG_LEVEL=debug` form)
//! 3. Configuration file (`suitectl.toml`)
//! 4. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), suitectl_core::error::SuiteError> {
//! use suitectl_core::config::SuitectlConfig;
//!
//! let config = SuitectlConfig::load("suitectl.toml").await?;
//! let config = SuitectlConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```
//!
//! [`SuiteRegistry::from_config`]: crate::registry::SuiteRegistry::from_config

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, SuiteError};

/// Placeholder replaced by the suite name in the test command template.
pub const SUITE_PLACEHOLDER: &str = "{suite}";
/// Placeholder replaced by the rendered timeout (`60s`) in the test command template.
pub const TIMEOUT_PLACEHOLDER: &str = "{timeout}";

/// suitectl configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuitectlConfig {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Test runner and readiness polling settings
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Suite declarations, registered in file order
    #[serde(default)]
    pub suites: Vec<SuiteConfig>,
}

impl SuitectlConfig {
    /// Load from a TOML file, apply environment overrides and validate.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SuiteError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file without environment overrides.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SuiteError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::ReadFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        Self::parse(&content)
    }

    /// Parse a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, SuiteError> {
        toml::from_str(toml_str).map_err(|e| {
            ConfigError::ParseFailed {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Override values from environment variables.
    ///
    /// Naming rule: `SUITECTL_{SECTION}_{FIELD}`, e.g. `SUITECTL_GENERAL_LEDGER_FILE`.
    /// Suites are not overridable from the environment.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SUITECTL_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SUITECTL_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.ledger_file, "SUITECTL_GENERAL_LEDGER_FILE");
        override_string(&mut self.general.suites_dir, "SUITECTL_GENERAL_SUITES_DIR");
        override_string(&mut self.general.working_dir, "SUITECTL_GENERAL_WORKING_DIR");

        // Runner
        override_string(&mut self.runner.test_command, "SUITECTL_RUNNER_TEST_COMMAND");
        override_u64(
            &mut self.runner.default_test_timeout_secs,
            "SUITECTL_RUNNER_DEFAULT_TEST_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.runner.readiness_interval_ms,
            "SUITECTL_RUNNER_READINESS_INTERVAL_MS",
        );
        override_bool(
            &mut self.runner.forward_output,
            "SUITECTL_RUNNER_FORWARD_OUTPUT",
        );
    }

    /// Validate field values.
    pub fn validate(&self) -> Result<(), SuiteError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.general.ledger_file.trim().is_empty() {
            return Err(invalid("general.ledger_file", "must not be empty"));
        }

        if !self.runner.test_command.contains(SUITE_PLACEHOLDER) {
            return Err(invalid(
                "runner.test_command",
                format!("must contain the {SUITE_PLACEHOLDER} placeholder"),
            ));
        }

        if self.runner.default_test_timeout_secs == 0 {
            return Err(invalid(
                "runner.default_test_timeout_secs",
                "must be greater than zero",
            ));
        }

        if self.runner.readiness_interval_ms == 0 {
            return Err(invalid(
                "runner.readiness_interval_ms",
                "must be greater than zero",
            ));
        }

        let mut seen = HashSet::new();
        for (idx, suite) in self.suites.iter().enumerate() {
            let field = |name: &str| format!("suites[{idx}].{name}");

            if suite.name.trim().is_empty() {
                return Err(invalid(&field("name"), "must not be empty"));
            }
            if suite.name.chars().any(char::is_whitespace) {
                return Err(invalid(&field("name"), "must not contain whitespace"));
            }
            if !seen.insert(suite.name.as_str()) {
                return Err(invalid(
                    &field("name"),
                    format!("duplicate suite name '{}'", suite.name),
                ));
            }
            if suite.setup_timeout_secs == 0 {
                return Err(invalid(
                    &field("setup_timeout_secs"),
                    "must be greater than zero",
                ));
            }
            if suite.compose_files.is_empty() {
                return Err(invalid(
                    &field("compose_files"),
                    "at least one environment definition file is required",
                ));
            }
        }

        Ok(())
    }

    /// Look up a suite declaration by name.
    pub fn suite(&self, name: &str) -> Option<&SuiteConfig> {
        self.suites.iter().find(|s| s.name == name)
    }

    /// Ledger file path, resolved against the working directory.
    pub fn ledger_path(&self) -> PathBuf {
        self.working_dir().join(&self.general.ledger_file)
    }

    /// Working directory used for environment commands and the ledger.
    pub fn working_dir(&self) -> PathBuf {
        PathBuf::from(&self.general.working_dir)
    }

    /// Directory holding a suite's environment-definition artifacts.
    pub fn suite_path(&self, name: &str) -> PathBuf {
        self.working_dir().join(&self.general.suites_dir).join(name)
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> SuiteError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format (json, pretty)
    pub log_format: String,
    /// Running-suite ledger file, relative to `working_dir`
    pub ledger_file: String,
    /// Directory containing one sub-directory per suite, relative to `working_dir`
    pub suites_dir: String,
    /// Working directory for environment commands
    pub working_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
            ledger_file: ".suite".to_owned(),
            suites_dir: "suites".to_owned(),
            working_dir: ".".to_owned(),
        }
    }
}

/// Test runner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Shell template for the test command (`{suite}` and `{timeout}` placeholders)
    pub test_command: String,
    /// Test bound used when neither an override nor a suite value is set
    pub default_test_timeout_secs: u64,
    /// Delay between readiness probe attempts (milliseconds)
    pub readiness_interval_ms: u64,
    /// Forward child stdout/stderr to the terminal
    pub forward_output: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            test_command: "go test ./internal/suites -timeout {timeout} -run '^(Test{suite}Suite)$'"
                .to_owned(),
            default_test_timeout_secs: 60,
            readiness_interval_ms: 1000,
            forward_output: true,
        }
    }
}

impl RunnerConfig {
    pub fn default_test_timeout(&self) -> Duration {
        Duration::from_secs(self.default_test_timeout_secs)
    }

    pub fn readiness_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_interval_ms)
    }
}

/// One `[[suites]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Unique suite name
    pub name: String,
    /// Free-text description shown by `list`
    pub description: String,
    /// Bound for the setup phase (seconds)
    pub setup_timeout_secs: u64,
    /// Bound for the teardown phase (seconds, 0 = use the setup bound)
    pub teardown_timeout_secs: u64,
    /// Bound for the test phase (seconds, 0 = runner default)
    pub test_timeout_secs: u64,
    /// Bound for readiness polling (seconds, 0 = use the setup bound)
    pub readiness_timeout_secs: u64,
    /// Environment definition files, relative to the working directory
    pub compose_files: Vec<String>,
    /// Shell command that exits 0 once the environment accepts traffic
    pub ready_command: Option<String>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            setup_timeout_secs: 300,
            teardown_timeout_secs: 120,
            test_timeout_secs: 0,
            readiness_timeout_secs: 0,
            compose_files: Vec::new(),
            ready_command: None,
        }
    }
}

// --- environment override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
