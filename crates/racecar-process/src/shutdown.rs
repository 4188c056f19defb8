//! Waits inside the daemon for the request to shut down.

use std::io;

use thiserror::Error;
use tracing::info;

const SHUTDOWN_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::shutdown");

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal {
    /// Blocks until shutdown should proceed.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The platform has no termination signals to wait on.
    #[error("platform does not support termination signals")]
    Unsupported,
}

/// Shutdown listener that waits for termination signals.
///
/// `SIGTERM` is the request `racecarctl stop` sends; `SIGINT` covers Ctrl-C
/// in the foreground.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl SystemShutdownSignal {
    /// Builds a new signal listener.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    #[cfg(unix)]
    fn wait(&self) -> Result<(), ShutdownError> {
        use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        info!(target: SHUTDOWN_TARGET, "waiting for shutdown signal");
        if let Some(signal) = signals.forever().next() {
            info!(
                target: SHUTDOWN_TARGET,
                signal,
                "shutdown signal received"
            );
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn wait(&self) -> Result<(), ShutdownError> {
        info!(target: SHUTDOWN_TARGET, "termination signals unavailable");
        Err(ShutdownError::Unsupported)
    }
}
