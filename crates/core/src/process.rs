//! External command execution with time and cancellation policy.
//!
//! By default every command is spawned as the leader of its own process
//! group so that a timeout or interrupt can kill the whole tree (compose
//! wrappers, shells, test binaries) rather than only the direct child.
//!
//! A runner used *inside* such a supervised child must not start new groups,
//! otherwise its commands escape the parent's `killpg`. Build it with
//! [`ProcessRunner::in_caller_process_group`].
//!
//! # Outcomes
//!
//! | Situation                         | Result                          |
//! |-----------------------------------|---------------------------------|
//! | exit status 0                     | `Ok(())`                        |
//! | non-zero exit                     | `ProcessError::Failed`          |
//! | executable missing / not runnable | `ProcessError::Launch`          |
//! | bound exceeded                    | `ProcessError::Timeout`         |
//! | cancellation token fired          | `ProcessError::Interrupted`     |

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ProcessError;

/// Description of an external command.
///
/// Kept separate from [`tokio::process::Command`] so it can be cloned,
/// inspected in tests and rendered in log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
        }
    }

    /// `bash -c <line>`.
    pub fn shell(line: impl Into<String>) -> Self {
        Self::new("bash").arg("-c").arg(line)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add an environment variable on top of the inherited environment.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_envs(&self) -> &[(String, String)] {
        &self.envs
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    fn to_command(&self, forward_output: bool, own_process_group: bool) -> Command {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        // A child in its own process group cannot read the terminal.
        cmd.stdin(Stdio::null());
        if forward_output {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            if own_process_group {
                cmd.process_group(0);
            }
        }
        #[cfg(not(unix))]
        let _ = own_process_group;

        Command::from(cmd)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Runs [`CommandSpec`]s and enforces timeouts and interrupts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    forward_output: bool,
    caller_process_group: bool,
}

impl ProcessRunner {
    /// Create a runner.
    ///
    /// With `forward_output` the child's stdout/stderr go to the terminal,
    /// otherwise they are discarded.
    pub fn new(forward_output: bool) -> Self {
        Self {
            forward_output,
            caller_process_group: false,
        }
    }

    /// Spawn children in the caller's process group instead of a new one.
    ///
    /// Timeouts then only kill the direct child; the caller's own
    /// supervisor is expected to kill the shared group.
    pub fn in_caller_process_group(mut self) -> Self {
        self.caller_process_group = true;
        self
    }

    fn owns_process_group(&self) -> bool {
        !self.caller_process_group
    }

    /// Run a command to completion without a bound.
    pub async fn run(&self, spec: &CommandSpec) -> Result<(), ProcessError> {
        self.supervise(spec, None, None).await
    }

    /// Run a command, killing its process group once `timeout` elapses.
    pub async fn run_with_timeout(
        &self,
        spec: &CommandSpec,
        timeout: Duration,
    ) -> Result<(), ProcessError> {
        self.supervise(spec, Some(timeout), None).await
    }

    /// Like [`run_with_timeout`](Self::run_with_timeout), but also kills the
    /// process group when `cancel` fires.
    ///
    /// A command that has already exited wins over a simultaneous timeout or
    /// cancellation, so a just-completed successful run is reported as success.
    pub async fn run_cancellable(
        &self,
        spec: &CommandSpec,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), ProcessError> {
        self.supervise(spec, Some(timeout), Some(cancel)).await
    }

    /// Launch a long-running command and block until it fails or `interrupt`
    /// resolves.
    ///
    /// - Launch error or unsuccessful exit: returned immediately.
    /// - Successful exit: keeps waiting for `interrupt`, then returns `Ok`.
    /// - `interrupt` while the command runs: returns `Ok` and leaves the
    ///   command running.
    ///
    /// `interrupt` is first polled only after the command has been spawned.
    pub async fn run_until_interrupted<F>(
        &self,
        spec: &CommandSpec,
        interrupt: F,
    ) -> Result<(), ProcessError>
    where
        F: Future<Output = ()>,
    {
        let mut child = self.spawn(spec, false)?;
        let pid = child.id();
        info!(command = %spec, pid = ?pid, "hit Ctrl+C to shut down");

        tokio::pin!(interrupt);

        tokio::select! {
            biased;
            status = child.wait() => {
                exit_result(spec, status)?;
                debug!(command = %spec, "command finished, waiting for interrupt");
                interrupt.await;
                Ok(())
            }
            _ = &mut interrupt => {
                info!(command = %spec, pid = ?pid, "interrupt received, leaving command running");
                Ok(())
            }
        }
    }

    async fn supervise(
        &self,
        spec: &CommandSpec,
        timeout: Option<Duration>,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), ProcessError> {
        let mut child = self.spawn(spec, true)?;
        let owns_group = self.owns_process_group();
        debug!(
            command = %spec,
            pid = ?child.id(),
            timeout_secs = timeout.map(|t| t.as_secs()),
            "command started"
        );

        let deadline = async {
            match timeout {
                Some(t) => tokio::time::sleep(t).await,
                None => std::future::pending::<()>().await,
            }
        };
        let cancelled = async {
            match cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            status = child.wait() => exit_result(spec, status),
            _ = deadline => {
                let timeout = timeout.unwrap_or_default();
                warn!(
                    command = %spec,
                    timeout_secs = timeout.as_secs(),
                    "timeout reached, killing process"
                );
                terminate(&mut child, owns_group).await;
                Err(ProcessError::Timeout { timeout })
            }
            _ = cancelled => {
                warn!(command = %spec, "interrupted, killing process");
                terminate(&mut child, owns_group).await;
                Err(ProcessError::Interrupted)
            }
        }
    }

    fn spawn(&self, spec: &CommandSpec, kill_on_drop: bool) -> Result<Child, ProcessError> {
        let mut cmd = spec.to_command(self.forward_output, self.owns_process_group());
        cmd.kill_on_drop(kill_on_drop);
        cmd.spawn().map_err(|source| ProcessError::Launch {
            program: spec.program.clone(),
            source,
        })
    }
}

fn exit_result(
    spec: &CommandSpec,
    status: std::io::Result<ExitStatus>,
) -> Result<(), ProcessError> {
    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(ProcessError::Failed {
            program: spec.program.clone(),
            status,
        }),
        Err(source) => Err(ProcessError::Wait {
            program: spec.program.clone(),
            source,
        }),
    }
}

/// Kill the child (and its process group when it leads one), then reap it.
async fn terminate(child: &mut Child, owns_group: bool) {
    if let Some(pid) = child.id().filter(|_| owns_group) {
        if let Err(e) = kill_process_group(pid) {
            debug!(pid, error = %e, "failed to signal process group");
        }
    }
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "failed to kill child");
    }
    if let Err(e) = child.wait().await {
        warn!(error = %e, "failed to reap killed child");
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) -> std::io::Result<()> {
    // SAFETY: killpg(2) only delivers a signal; the child was spawned with
    // process_group(0) so its pid is also its process group id.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) -> std::io::Result<()> {
    Ok(())
}
