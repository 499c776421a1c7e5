//! Termination signal handling.
//!
//! The request loop races a [`ShutdownSignal`] so an interrupted client still
//! flushes its latency records before exiting.

use std::io;
use std::thread;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{info, warn};

pub(crate) const SHUTDOWN_TARGET: &str = "relay::shutdown";

/// Source of shutdown notifications.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The listener thread ended without reporting.
    #[error("shutdown listener stopped unexpectedly")]
    ListenerLost,
}

/// Waits for SIGTERM, SIGINT, SIGQUIT or SIGHUP.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        if let Some(signal) = signals.forever().next() {
            info!(target: SHUTDOWN_TARGET, signal, "shutdown signal received");
        }
        Ok(())
    }
}

/// Resolves once `signal` fires.
///
/// The blocking wait runs on a detached thread rather than the runtime's
/// blocking pool, so an abandoned listener never delays runtime shutdown.
pub(crate) async fn wait_for<S>(signal: S) -> Result<(), ShutdownError>
where
    S: ShutdownSignal + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let spawned = thread::Builder::new()
        .name(String::from("relay-shutdown"))
        .spawn(move || {
            let _ = sender.send(signal.wait());
        });
    if let Err(source) = spawned {
        warn!(target: SHUTDOWN_TARGET, %source, "failed to spawn shutdown listener");
        return Err(ShutdownError::Install { source });
    }
    receiver.await.unwrap_or(Err(ShutdownError::ListenerLost))
}
