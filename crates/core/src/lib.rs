#![doc = include_str!("../README.md")]

pub mod config;
pub mod controller;
pub mod environment;
pub mod error;
pub mod ledger;
pub mod policy;
pub mod process;
pub mod registry;
pub mod signal;

// --- re-exports ---

// errors
pub use error::{ConfigError, Phase, ProcessError, SuiteError};

// configuration
pub use config::{GeneralConfig, RunnerConfig, SuiteConfig, SuitectlConfig};

// process execution
pub use process::{CommandSpec, ProcessRunner};

// environments and readiness
pub use environment::{
    BoxFuture, CommandProbe, ComposeEnvironment, Environment, Readiness, ReadinessProbe,
    wait_until_ready,
};

// registry and ledger
pub use ledger::RunningSuiteLedger;
pub use registry::{SuiteDescriptor, SuiteRegistry};

// lifecycle
pub use controller::{
    ControllerSettings, EnvironmentPhase, PhaseCommands, SelfInvokingCommands, SuiteController,
    SuiteState, TestOptions, run_environment_phase,
};
pub use policy::{Orchestrator, SetupOutcome, SuiteStatus};
