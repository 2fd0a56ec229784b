//! Hidden `suitectl suite-phase` command handler
//!
//! Runs in the child process the parent spawns for setup and teardown.
//! The parent owns the bound: on timeout or interrupt it kills this
//! process group, which the environment commands share.

use suitectl_core::controller::{EnvironmentPhase, run_environment_phase};

use crate::cli::{PhaseArg, SuitePhaseArgs};
use crate::commands::Context;
use crate::error::CliError;

/// Execute the `suite-phase` command.
pub async fn execute(args: SuitePhaseArgs, ctx: &Context) -> Result<(), CliError> {
    let registry = ctx.phase_registry()?;
    let phase = match args.phase {
        PhaseArg::Setup => EnvironmentPhase::Setup,
        PhaseArg::Teardown => EnvironmentPhase::Teardown,
    };
    let suite_path = ctx.config.suite_path(&args.suite);

    run_environment_phase(&registry, phase, &args.suite, &suite_path).await?;
    Ok(())
}
