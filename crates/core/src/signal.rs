//! Operator interrupt handling.
//!
//! SIGINT/SIGTERM are turned into a [`CancellationToken`] that the
//! controller observes during cancellable phases. Teardown ignores it.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Install SIGINT/SIGTERM handlers and cancel `token` on the first signal.
///
/// Handlers are registered before this function returns, so a signal that
/// arrives right after the call is never missed.
///
/// # Errors
///
/// Returns an error if a signal handler cannot be installed.
#[cfg(unix)]
pub fn spawn_interrupt_listener(token: CancellationToken) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
            _ = token.cancelled() => return,
        };
        warn!(signal = name, "interrupt received");
        token.cancel();
    }))
}

#[cfg(not(unix))]
pub fn spawn_interrupt_listener(token: CancellationToken) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                    return;
                }
                warn!(signal = "ctrl_c", "interrupt received");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    }))
}
