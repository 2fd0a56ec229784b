//! Recording [`PhaseCommands`] backed by shell snippets.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use suitectl_core::{CommandSpec, EnvironmentPhase, PhaseCommands, TestOptions};

/// Hands out `sh -c <snippet>` commands and records every request.
///
/// Keys are `"<phase>:<suite>"` (`setup:a`, `test:a`, `teardown:a`).
/// A key without a snippet runs `true`.
#[derive(Default)]
pub struct RecordingCommands {
    scripts: Mutex<HashMap<String, String>>,
    launches: Mutex<Vec<String>>,
    test_timeouts: Mutex<Vec<Duration>>,
    test_options: Mutex<Vec<TestOptions>>,
}

#[allow(dead_code)]
impl RecordingCommands {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `key` run `line` instead of `true`.
    pub fn script(&self, key: &str, line: &str) {
        self.scripts
            .lock()
            .expect("scripts lock")
            .insert(key.to_owned(), line.to_owned());
    }

    /// Every command requested so far, in order.
    pub fn launches(&self) -> Vec<String> {
        self.launches.lock().expect("launch lock").clone()
    }

    /// Timeouts handed to the test commands, in order.
    pub fn test_timeouts(&self) -> Vec<Duration> {
        self.test_timeouts.lock().expect("timeout lock").clone()
    }

    pub fn test_options(&self) -> Vec<TestOptions> {
        self.test_options.lock().expect("options lock").clone()
    }

    fn command(&self, key: String) -> CommandSpec {
        let line = self
            .scripts
            .lock()
            .expect("scripts lock")
            .get(&key)
            .cloned()
            .unwrap_or_else(|| "true".to_owned());
        self.launches.lock().expect("launch lock").push(key);
        CommandSpec::new("sh").arg("-c").arg(line)
    }
}

impl PhaseCommands for RecordingCommands {
    fn environment_command(&self, phase: EnvironmentPhase, suite: &str) -> CommandSpec {
        self.command(format!("{}:{suite}", phase.as_str()))
    }

    fn test_command(&self, suite: &str, timeout: Duration, options: &TestOptions) -> CommandSpec {
        self.test_timeouts
            .lock()
            .expect("timeout lock")
            .push(timeout);
        self.test_options.lock().expect("options lock").push(*options);
        self.command(format!("test:{suite}"))
    }
}
