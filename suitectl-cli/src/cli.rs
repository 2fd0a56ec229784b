//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// suitectl -- set up, test and tear down isolated test-suite environments.
///
/// Use `suitectl <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "suitectl", version, about, long_about = None)]
pub struct Cli {
    /// Path to the suitectl.toml configuration file.
    #[arg(short, long, global = true, default_value = "suitectl.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available suites.
    List,

    /// Show the running suite.
    Status,

    /// Set up a suite environment and leave it running.
    Setup(SuiteArgs),

    /// Tear down a suite environment (default: the running suite).
    Teardown(TeardownArgs),

    /// Run the tests of a suite, or of every suite when none is running or given.
    Test(TestArgs),

    /// Set up a suite, stay attached until Ctrl+C, then tear it down.
    Serve(SuiteArgs),

    /// Manage configuration.
    Config(ConfigArgs),

    /// Run one environment phase of a suite in this process.
    #[command(hide = true)]
    SuitePhase(SuitePhaseArgs),
}

// ---- setup / serve ----

#[derive(Args, Debug)]
pub struct SuiteArgs {
    /// Suite name (see `suitectl list`).
    pub suite: String,
}

// ---- teardown ----

#[derive(Args, Debug)]
pub struct TeardownArgs {
    /// Suite name; defaults to the running suite.
    pub suite: Option<String>,
}

// ---- test ----

#[derive(Args, Debug)]
pub struct TestArgs {
    /// Suite name; defaults to the running suite, or every suite.
    pub suite: Option<String>,

    /// Run browser tests headless (exports HEADLESS=y).
    #[arg(long)]
    pub headless: bool,

    /// Only run tests marked as forbidden (exports ONLY_FORBIDDEN=y).
    #[arg(long)]
    pub only_forbidden: bool,

    /// Override the test timeout, in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

// ---- config ----

/// Manage suitectl configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, runner, suites).
        #[arg(long)]
        section: Option<String>,
    },
}

// ---- suite-phase ----

#[derive(Args, Debug)]
pub struct SuitePhaseArgs {
    pub phase: PhaseArg,
    pub suite: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PhaseArg {
    Setup,
    Teardown,
}
