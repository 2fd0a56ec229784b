//! `suitectl list` command handler

use std::io::Write;

use serde::Serialize;

use crate::commands::Context;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `list` command.
pub fn execute(ctx: &Context, writer: &OutputWriter) -> Result<(), CliError> {
    let registry = ctx.registry()?;
    let running = ctx.ledger().read()?;

    let suites = registry
        .iter()
        .map(|(name, descriptor)| SuiteEntry {
            name: name.to_owned(),
            description: descriptor.description.clone(),
            running: running.as_deref() == Some(name),
            setup_timeout_secs: descriptor.setup_timeout.as_secs(),
            teardown_timeout_secs: descriptor.effective_teardown_timeout().as_secs(),
            test_timeout_secs: descriptor.test_timeout.as_secs(),
        })
        .collect();

    writer.render(&SuiteList { suites })
}

#[derive(Serialize)]
pub struct SuiteList {
    pub suites: Vec<SuiteEntry>,
}

#[derive(Serialize)]
pub struct SuiteEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub running: bool,
    pub setup_timeout_secs: u64,
    pub teardown_timeout_secs: u64,
    /// 0 = runner default
    pub test_timeout_secs: u64,
}

impl Render for SuiteList {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.suites.is_empty() {
            writeln!(w, "{}", "no suites configured".yellow())?;
            return Ok(());
        }

        for suite in &self.suites {
            let marker = if suite.running {
                "running".green().bold()
            } else {
                "".normal()
            };
            match &suite.description {
                Some(desc) => writeln!(w, "{:<24} {:<8} {}", suite.name, marker, desc.dimmed())?,
                None => writeln!(w, "{:<24} {}", suite.name, marker)?,
            }
        }

        Ok(())
    }
}
