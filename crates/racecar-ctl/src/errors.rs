use std::io;
use std::time::Duration;

use racecar_config::ConfigError;
use racecar_process::SignalError;
use thiserror::Error;

use crate::produce::DeliveryError;

/// Errors raised by `racecarctl` commands.
#[derive(Debug, Error)]
pub enum ControlError {
    /// `produce` was invoked without a topic.
    #[error("no topic specified")]
    MissingTopic,
    /// `produce` was invoked without a message value.
    #[error("no message value specified")]
    MissingValue,
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The termination request could not be delivered.
    #[error(transparent)]
    Signal(SignalError),
    /// The process outlived the stop timeout.
    #[error("Racecar process {pid} did not stop within {} seconds", timeout.as_secs())]
    StopTimeout {
        /// Pid still running.
        pid: u32,
        /// Time spent waiting.
        timeout: Duration,
    },
    /// Delivering a produced message failed.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    Io(#[source] io::Error),
}
