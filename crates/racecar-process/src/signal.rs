//! Graceful termination requests sent by the control utility.
//!
//! A single `SIGTERM` is delivered. The daemon is expected to finish its
//! run-loop on receipt; nothing here escalates to a forceful kill.

use std::io;

use thiserror::Error;

/// Errors raised while signalling the recorded process.
#[derive(Debug, Error)]
pub enum SignalError {
    /// The pid cannot name a single process.
    #[error("refusing to signal pid {pid}: {reason}")]
    InvalidPid {
        /// Rejected pid.
        pid: u32,
        /// Why the pid was rejected.
        reason: &'static str,
    },
    /// The process exited before the signal arrived.
    #[error("process {pid} does not exist")]
    NoSuchProcess {
        /// Target pid.
        pid: u32,
    },
    /// Delivery failed, typically for lack of permission.
    #[error("failed to signal process {pid}: {source}")]
    Delivery {
        /// Target pid.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The platform has no signal delivery.
    #[error("platform does not support process signalling")]
    Unsupported,
}

/// Delivers the graceful termination request.
pub trait Termination {
    /// Asks process `pid` to shut down.
    fn terminate(&self, pid: u32) -> Result<(), SignalError>;
}

/// Termination through `kill(2)` with `SIGTERM`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTermination;

impl Termination for SystemTermination {
    #[cfg(unix)]
    fn terminate(&self, pid: u32) -> Result<(), SignalError> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        if pid == 0 {
            return Err(SignalError::InvalidPid {
                pid,
                reason: "pid 0 addresses the whole process group",
            });
        }
        let raw = i32::try_from(pid).map_err(|_| SignalError::InvalidPid {
            pid,
            reason: "pid exceeds the platform pid range",
        })?;
        match kill(Pid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(SignalError::NoSuchProcess { pid }),
            Err(errno) => Err(SignalError::Delivery {
                pid,
                source: io::Error::from(errno),
            }),
        }
    }

    #[cfg(not(unix))]
    fn terminate(&self, pid: u32) -> Result<(), SignalError> {
        let _ = pid;
        Err(SignalError::Unsupported)
    }
}
