use std::io;
use std::path::PathBuf;

use racecar_config::ConfigError;
use racecar_process::{
    DaemonizeError, PidFileError, RedirectError, ShutdownError, TelemetryError,
};
use thiserror::Error;

use crate::consumer::{ConsumerError, LookupError};

/// Errors surfaced while launching a consumer.
///
/// Every variant is fatal and maps to exit code 1.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// No consumer name was given on the command line.
    #[error("no consumer specified")]
    MissingArgument,
    /// The consumer name is not registered.
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A live process is already recorded in the pidfile.
    #[error("racecar is already running (PID = {pid}, pidfile '{path}')")]
    AlreadyRunning {
        /// Recorded pid.
        pid: u32,
        /// Pidfile consulted.
        path: PathBuf,
    },
    /// Preparing or writing the pidfile failed.
    #[error(transparent)]
    PidFile(#[from] PidFileError),
    /// Redirecting the standard streams failed.
    #[error(transparent)]
    Redirect(#[from] RedirectError),
    /// Detaching from the terminal failed.
    #[error(transparent)]
    Daemonize(DaemonizeError),
    /// Waiting for the shutdown signal failed.
    #[error("failed to await shutdown signal: {0}")]
    Shutdown(#[from] ShutdownError),
    /// The consumer's start hook failed.
    #[error(transparent)]
    Consumer(#[from] ConsumerError),
    /// Telemetry could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// Writing launcher output failed.
    #[error("failed to write launcher output: {0}")]
    Output(#[source] io::Error),
}

impl From<DaemonizeError> for LaunchError {
    fn from(source: DaemonizeError) -> Self {
        match source {
            DaemonizeError::AlreadyRunning { pid, path } => Self::AlreadyRunning { pid, path },
            DaemonizeError::PidFile(error) => Self::PidFile(error),
            DaemonizeError::Redirect(error) => Self::Redirect(error),
            other => Self::Daemonize(other),
        }
    }
}
