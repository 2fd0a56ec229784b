//! CLI-specific error types and exit code mapping

use suitectl_core::error::SuiteError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from suitectl-core.
    #[error("{0}")]
    Suite(#[from] SuiteError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                   |
    /// |------|-------------------------------------------|
    /// | 0    | Success                                   |
    /// | 1    | Phase failure / general command error     |
    /// | 2    | Configuration error                       |
    /// | 3    | Unknown suite                             |
    /// | 4    | Conflicting suite or no running suite     |
    /// | 5    | Phase timed out                           |
    /// | 10   | IO error (ledger, stdout)                 |
    /// | 130  | Interrupted                               |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) => 1,
            Self::Suite(e) => match e {
                SuiteError::Config(_) | SuiteError::DuplicateSuite(_) => 2,
                SuiteError::UnknownSuite(_) => 3,
                SuiteError::ConflictingSuite { .. } | SuiteError::NoRunningSuite => 4,
                SuiteError::Timeout { .. } => 5,
                SuiteError::Ledger { .. } => 10,
                SuiteError::Interrupted { .. } => 130,
                SuiteError::ProcessFailure { .. } | SuiteError::NotReady { .. } => 1,
            },
        }
    }
}
