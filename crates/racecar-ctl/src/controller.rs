//! Status and stop flows driven from the recorded pidfile.

use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use racecar_process::{PidFile, ProcessRunState, SignalError, Termination, process_alive};
use tracing::{debug, info};

use crate::errors::ControlError;
use crate::output::ControlOutput;

pub(crate) const CONTROL_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::controller");

/// How long `stop` waits for the process to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopPolicy {
    /// Pause between liveness checks.
    pub interval: Duration,
    /// Upper bound on the whole wait.
    pub timeout: Duration,
}

impl Default for StopPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Result of a completed `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing was running; no signal was sent.
    NotRunning,
    /// The process exited after being signalled.
    Stopped {
        /// Pid that was stopped.
        pid: u32,
    },
}

/// Queries and stops the process recorded in a pidfile.
pub struct ProcessController<T> {
    pidfile: PathBuf,
    termination: T,
}

impl<T> ProcessController<T>
where
    T: Termination,
{
    /// Controls the process recorded at `pidfile`.
    #[must_use]
    pub fn new(pidfile: impl Into<PathBuf>, termination: T) -> Self {
        Self {
            pidfile: pidfile.into(),
            termination,
        }
    }

    /// Termination strategy in use.
    #[must_use]
    pub const fn termination(&self) -> &T {
        &self.termination
    }

    /// Prints the run state. Never fails for a missing or stale pidfile.
    pub fn status<W: Write, E: Write>(
        &self,
        output: &mut ControlOutput<W, E>,
    ) -> Result<ProcessRunState, ControlError> {
        let pidfile = PidFile::new(&self.pidfile);
        let state = pidfile.run_state();
        match state {
            ProcessRunState::Running { pid } => {
                output.stdout_line(format_args!("running (PID = {pid})"))?;
            }
            _ => output.stdout_line(format_args!("{}", pidfile.describe_status()))?,
        }
        Ok(state)
    }

    /// Sends one termination request and waits for the process to exit.
    ///
    /// Stopping a process that is not running succeeds without signalling.
    /// The wait never escalates; it fails with [`ControlError::StopTimeout`]
    /// once `policy.timeout` has elapsed. No pause overruns that deadline.
    pub fn stop<W: Write, E: Write>(
        &self,
        policy: StopPolicy,
        output: &mut ControlOutput<W, E>,
    ) -> Result<StopOutcome, ControlError> {
        let ProcessRunState::Running { pid } = PidFile::new(&self.pidfile).run_state() else {
            output.stdout_line(format_args!("Racecar is not currently running"))?;
            return Ok(StopOutcome::NotRunning);
        };

        info!(target: CONTROL_TARGET, pid, "sending SIGTERM");
        match self.termination.terminate(pid) {
            Ok(()) => {}
            Err(SignalError::NoSuchProcess { .. }) => {
                debug!(target: CONTROL_TARGET, pid, "process exited before the signal");
            }
            Err(error) => return Err(ControlError::Signal(error)),
        }

        // A timeout too large to represent waits without a deadline.
        let deadline = Instant::now().checked_add(policy.timeout);
        // The daemon removes its own pidfile, so the signalled pid is probed.
        while process_alive(pid) {
            let pause = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(ControlError::StopTimeout {
                            pid,
                            timeout: policy.timeout,
                        });
                    }
                    remaining.min(policy.interval)
                }
                None => policy.interval,
            };
            output.stdout_line(format_args!("Waiting for Racecar process to stop..."))?;
            thread::sleep(pause);
        }
        output.stdout_line(format_args!("Racecar stopped"))?;
        Ok(StopOutcome::Stopped { pid })
    }
}
