//! `suitectl status` command handler

use std::io::Write;

use serde::Serialize;

use crate::commands::Context;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `status` command.
pub fn execute(ctx: &Context, writer: &OutputWriter) -> Result<(), CliError> {
    let status = ctx.orchestrator()?.status()?;

    let report = StatusReport {
        ledger: ctx.config.ledger_path().display().to_string(),
        running: status.running,
        registered: status.registered,
    };
    writer.render(&report)
}

#[derive(Serialize)]
pub struct StatusReport {
    pub ledger: String,
    pub running: Option<String>,
    pub registered: bool,
}

impl Render for StatusReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        match &self.running {
            Some(name) if self.registered => {
                writeln!(w, "Running suite: {}", name.green().bold())?;
            }
            Some(name) => {
                writeln!(
                    w,
                    "Running suite: {} ({})",
                    name.yellow().bold(),
                    "not registered".red()
                )?;
            }
            None => writeln!(w, "Running suite: {}", "none".dimmed())?,
        }
        writeln!(w, "Ledger: {}", self.ledger)?;

        Ok(())
    }
}
