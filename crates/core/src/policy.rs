//! Orchestration policy -- which lifecycle cycle a request runs.
//!
//! | ledger      | requested   | action                                   |
//! |-------------|-------------|------------------------------------------|
//! | `Some(r)`   | `Some(s≠r)` | `ConflictingSuite`, nothing launched     |
//! | `Some(r)`   | `None`/`r`  | tests of `r` only                        |
//! | `None`      | `Some(s)`   | setup `s`, test, teardown                |
//! | `None`      | `None`      | every registered suite in name order     |
//!
//! Running every suite stops at the first failing suite.

use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::controller::{SuiteController, TestOptions};
use crate::error::SuiteError;

/// Ledger view reported by [`Orchestrator::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuiteStatus {
    /// Suite recorded in the ledger.
    pub running: Option<String>,
    /// Whether the recorded suite is still registered.
    pub registered: bool,
}

/// Result of [`Orchestrator::setup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    Started,
    AlreadyRunning,
}

/// Applies the orchestration rules on top of a [`SuiteController`].
pub struct Orchestrator {
    controller: SuiteController,
}

impl Orchestrator {
    pub fn new(controller: SuiteController) -> Self {
        Self { controller }
    }

    /// Run tests following the table in the module docs.
    pub async fn test(
        &mut self,
        requested: Option<&str>,
        timeout_override: Option<Duration>,
        options: &TestOptions,
    ) -> Result<(), SuiteError> {
        if let Some(name) = requested {
            self.ensure_registered(name)?;
        }

        match (self.controller.ledger().read()?, requested) {
            (Some(running), Some(name)) if running != name => Err(SuiteError::ConflictingSuite {
                running,
                requested: name.to_owned(),
            }),
            (Some(running), _) => {
                info!(suite = %running, "running suite detected, running its tests");
                self.controller
                    .run_tests(&running, timeout_override, options)
                    .await
            }
            (None, Some(name)) => self.run_cycle(name, timeout_override, options).await,
            (None, None) => self.run_all(timeout_override, options).await,
        }
    }

    async fn run_all(
        &mut self,
        timeout_override: Option<Duration>,
        options: &TestOptions,
    ) -> Result<(), SuiteError> {
        let names = self.controller.registry().names();
        info!(suites = names.len(), "start running all suites");
        for name in &names {
            self.run_cycle(name, timeout_override, options).await?;
        }
        info!("all suites passed successfully");
        Ok(())
    }

    /// Setup, test, teardown. The test outcome wins over a teardown failure.
    async fn run_cycle(
        &mut self,
        name: &str,
        timeout_override: Option<Duration>,
        options: &TestOptions,
    ) -> Result<(), SuiteError> {
        self.controller.set_up(name).await?;
        let tested = self
            .controller
            .run_tests(name, timeout_override, options)
            .await;
        if let Err(e) = self.controller.tear_down(name).await {
            error!(suite = name, error = %e, "error occurred during teardown");
        }
        tested
    }

    /// Bring `name` up unless it is already the running suite.
    pub async fn setup(&mut self, name: &str) -> Result<SetupOutcome, SuiteError> {
        self.ensure_registered(name)?;
        match self.controller.ledger().read()? {
            Some(running) if running == name => {
                info!(suite = name, "suite is already running");
                Ok(SetupOutcome::AlreadyRunning)
            }
            Some(running) => Err(SuiteError::ConflictingSuite {
                running,
                requested: name.to_owned(),
            }),
            None => {
                self.controller.set_up(name).await?;
                Ok(SetupOutcome::Started)
            }
        }
    }

    /// Tear down `requested`, or the running suite when none is given.
    ///
    /// Returns the name of the suite that was torn down.
    pub async fn teardown(&mut self, requested: Option<&str>) -> Result<String, SuiteError> {
        let running = self.controller.ledger().read()?;
        let name = match (requested, running) {
            (Some(name), Some(running)) if running != name => {
                self.ensure_registered(name)?;
                return Err(SuiteError::ConflictingSuite {
                    running,
                    requested: name.to_owned(),
                });
            }
            (Some(name), _) => {
                self.ensure_registered(name)?;
                name.to_owned()
            }
            (None, Some(running)) => {
                if !self.controller.registry().contains(&running) {
                    warn!(suite = %running, "ledger names an unregistered suite, clearing it");
                    self.controller.ledger().clear()?;
                    return Err(SuiteError::UnknownSuite(running));
                }
                running
            }
            (None, None) => return Err(SuiteError::NoRunningSuite),
        };

        self.controller.tear_down(&name).await?;
        Ok(name)
    }

    /// Serve `name` until interrupted. The ledger must be empty.
    pub async fn serve(&mut self, name: &str) -> Result<(), SuiteError> {
        self.ensure_registered(name)?;
        if let Some(running) = self.controller.ledger().read()? {
            return Err(SuiteError::ConflictingSuite {
                running,
                requested: name.to_owned(),
            });
        }
        self.controller.serve(name).await
    }

    pub fn status(&self) -> Result<SuiteStatus, SuiteError> {
        let running = self.controller.ledger().read()?;
        let registered = running
            .as_deref()
            .is_some_and(|name| self.controller.registry().contains(name));
        Ok(SuiteStatus {
            running,
            registered,
        })
    }

    fn ensure_registered(&self, name: &str) -> Result<(), SuiteError> {
        self.controller.registry().get(name).map(|_| ())
    }
}
