//! Error types for suite orchestration.
//!
//! [`SuiteError`] is the top-level error surfaced by the controller and the
//! orchestration policy. [`ProcessError`] describes how a single external
//! command failed and is mapped into [`SuiteError`] once the failing phase
//! and suite are known.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

/// Lifecycle phase that launched an external command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Bringing the suite environment up.
    Setup,
    /// Waiting for a freshly started environment to accept traffic.
    Readiness,
    /// Running the suite's tests.
    Test,
    /// Tearing the suite environment down.
    Teardown,
    /// Attached to a served environment until interrupted.
    Attach,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => write!(f, "setup"),
            Self::Readiness => write!(f, "readiness"),
            Self::Test => write!(f, "test"),
            Self::Teardown => write!(f, "teardown"),
            Self::Attach => write!(f, "attach"),
        }
    }
}

/// Top-level suite orchestration error.
#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    /// The name is not present in the registry.
    #[error("suite named '{0}' does not exist")]
    UnknownSuite(String),

    /// A suite with the same name was registered twice.
    #[error("suite '{0}' is already registered")]
    DuplicateSuite(String),

    /// The ledger records a different running suite.
    #[error(
        "running suite ({running}) is different than suite requested ({requested}); tear down the running suite and retry"
    )]
    ConflictingSuite { running: String, requested: String },

    /// Teardown was requested without a name while no suite is running.
    #[error("no running suite")]
    NoRunningSuite,

    /// A phase exceeded its bound and its process group was killed.
    #[error("{phase} of suite '{suite}' timed out after {}s", timeout.as_secs())]
    Timeout {
        suite: String,
        phase: Phase,
        timeout: Duration,
    },

    /// A phase command exited non-zero or could not be launched.
    #[error("{phase} of suite '{suite}' failed: {reason}")]
    ProcessFailure {
        suite: String,
        phase: Phase,
        reason: String,
    },

    /// An operator interrupt arrived while the phase was running.
    #[error("{phase} of suite '{suite}' was interrupted")]
    Interrupted { suite: String, phase: Phase },

    /// The readiness probe never succeeded within its bound.
    #[error("suite '{suite}' was not ready after {}s", waited.as_secs())]
    NotReady { suite: String, waited: Duration },

    /// The running-suite ledger could not be read or written.
    #[error("running-suite ledger {}: {source}", path.display())]
    Ledger {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration problem.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl SuiteError {
    /// Attach suite and phase context to a process-level failure.
    pub fn from_process(suite: &str, phase: Phase, err: ProcessError) -> Self {
        match err {
            ProcessError::Timeout { timeout } => Self::Timeout {
                suite: suite.to_owned(),
                phase,
                timeout,
            },
            ProcessError::Interrupted => Self::Interrupted {
                suite: suite.to_owned(),
                phase,
            },
            other => Self::ProcessFailure {
                suite: suite.to_owned(),
                phase,
                reason: other.to_string(),
            },
        }
    }

    /// Whether the error was caused by an operator interrupt.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}

/// Failure of a single external command.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The command could not be started.
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited unsuccessfully.
    #[error("'{program}' exited with {status}")]
    Failed { program: String, status: ExitStatus },

    /// The command was killed after exceeding its bound.
    #[error("timeout of {}s reached", timeout.as_secs())]
    Timeout { timeout: Duration },

    /// The command was killed because of an operator interrupt.
    #[error("interrupted")]
    Interrupted,

    /// Waiting on the child failed.
    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// Configuration file could not be read.
    #[error("failed to read config {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    /// TOML could not be parsed.
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A field holds an invalid value.
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
