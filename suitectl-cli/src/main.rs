//! suitectl -- test-suite environment orchestrator.
//!
//! Exit codes are listed on [`CliError::exit_code`].

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;

use crate::cli::{Cli, Commands};
use crate::commands::Context;
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let writer = OutputWriter::new(cli.output);

    if let Err(e) = run(cli, &writer).await {
        tracing::error!(error = %e, "command failed");
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    let Cli {
        config,
        log_level,
        command,
        ..
    } = cli;
    let load = |interruptible: bool| Context::load(config.clone(), log_level.clone(), interruptible);

    match command {
        Commands::Config(args) => commands::config::execute(args, &config, writer).await,
        Commands::List => commands::list::execute(&load(false).await?, writer),
        Commands::Status => commands::status::execute(&load(false).await?, writer),
        Commands::Setup(args) => commands::lifecycle::setup(args, &load(true).await?, writer).await,
        Commands::Teardown(args) => {
            commands::lifecycle::teardown(args, &load(true).await?, writer).await
        }
        Commands::Test(args) => commands::lifecycle::test(args, &load(true).await?, writer).await,
        Commands::Serve(args) => commands::lifecycle::serve(args, &load(true).await?, writer).await,
        // The parent kills this process group; no signal handling here.
        Commands::SuitePhase(args) => commands::phase::execute(args, &load(false).await?).await,
    }
}
