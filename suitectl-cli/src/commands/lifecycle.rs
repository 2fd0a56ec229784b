//! `suitectl setup | teardown | test | serve` command handlers

use std::io::Write;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use suitectl_core::controller::TestOptions;
use suitectl_core::policy::SetupOutcome;

use crate::cli::{SuiteArgs, TeardownArgs, TestArgs};
use crate::commands::Context;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `setup` command.
pub async fn setup(args: SuiteArgs, ctx: &Context, writer: &OutputWriter) -> Result<(), CliError> {
    let mut orchestrator = ctx.orchestrator()?;
    let outcome = match orchestrator.setup(&args.suite).await? {
        SetupOutcome::Started => "started",
        SetupOutcome::AlreadyRunning => "already running",
    };
    writer.render(&ActionReport::new("setup", Some(args.suite), outcome))
}

/// Execute the `teardown` command.
pub async fn teardown(
    args: TeardownArgs,
    ctx: &Context,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut orchestrator = ctx.orchestrator()?;
    let name = orchestrator.teardown(args.suite.as_deref()).await?;
    writer.render(&ActionReport::new("teardown", Some(name), "torn down"))
}

/// Execute the `test` command.
pub async fn test(args: TestArgs, ctx: &Context, writer: &OutputWriter) -> Result<(), CliError> {
    let options = TestOptions {
        headless: args.headless,
        only_forbidden: args.only_forbidden,
    };
    let timeout = args.timeout.map(Duration::from_secs);

    let mut orchestrator = ctx.orchestrator()?;
    let target = match (&args.suite, orchestrator.status()?.running) {
        (Some(name), _) => Some(name.clone()),
        (None, running) => running,
    };
    if target.is_none() {
        info!("no suite given or running, running all suites");
    }

    orchestrator
        .test(args.suite.as_deref(), timeout, &options)
        .await?;
    writer.render(&ActionReport::new("test", target, "passed"))
}

/// Execute the `serve` command.
pub async fn serve(args: SuiteArgs, ctx: &Context, writer: &OutputWriter) -> Result<(), CliError> {
    let mut orchestrator = ctx.orchestrator()?;
    orchestrator.serve(&args.suite).await?;
    writer.render(&ActionReport::new("serve", Some(args.suite), "stopped"))
}

/// Result line of a lifecycle command.
#[derive(Debug, Serialize)]
pub struct ActionReport {
    pub action: &'static str,
    /// `None` when every suite was run.
    pub suite: Option<String>,
    pub outcome: &'static str,
}

impl ActionReport {
    fn new(action: &'static str, suite: Option<String>, outcome: &'static str) -> Self {
        Self {
            action,
            suite,
            outcome,
        }
    }
}

impl Render for ActionReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let target = self.suite.as_deref().unwrap_or("all suites");
        writeln!(
            w,
            "{} {} {}: {}",
            "✓".green().bold(),
            self.action,
            target.bold(),
            self.outcome
        )
    }
}
