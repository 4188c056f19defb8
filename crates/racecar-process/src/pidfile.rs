//! On-disk record of the running daemon's process identifier.
//!
//! The file holds nothing but the decimal pid. Anything else (an empty file,
//! garbage, zero, or a value outside the platform's pid range) reads as "no
//! process recorded" rather than as an error. A stale file, whose pid is no
//! longer alive, is an expected state that callers report distinctly.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::files::{atomic_write, parent_directory, probe_writable};

const PIDFILE_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::pidfile");

/// Errors raised while writing or maintaining the pidfile.
#[derive(Debug, Error)]
pub enum PidFileError {
    /// The pidfile directory could not be created.
    #[error("failed to create pid file directory '{path}': {source}")]
    Directory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The pidfile could not be written.
    #[error("failed to write pid file '{path}': {source}")]
    Write {
        /// Pidfile path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A stale pidfile could not be removed.
    #[error("failed to remove stale pid file '{path}': {source}")]
    Cleanup {
        /// Pidfile path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Liveness of the process recorded in a pidfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRunState {
    /// No pidfile exists.
    NotRunning,
    /// The recorded process is alive.
    Running {
        /// Recorded pid.
        pid: u32,
    },
    /// The pidfile exists but no live process backs it.
    DeadButPidFileExists {
        /// Recorded pid, when the file held a valid one.
        pid: Option<u32>,
    },
}

impl ProcessRunState {
    /// Whether a live process is recorded.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// Handle onto a pidfile path with a lazily read pid.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    cached: OnceCell<Option<u32>>,
}

impl PidFile {
    /// Refers to the pidfile at `path` without touching the filesystem.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: OnceCell::new(),
        }
    }

    /// Pidfile location.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Recorded pid, read on first use and cached afterwards.
    #[must_use]
    pub fn read(&self) -> Option<u32> {
        *self.cached.get_or_init(|| read_pid(&self.path))
    }

    /// Drops the cached pid so the next [`Self::read`] consults the file.
    pub fn reload(&mut self) {
        self.cached = OnceCell::new();
    }

    /// Replaces the file contents with `pid`.
    pub fn write(&mut self, pid: u32) -> Result<(), PidFileError> {
        atomic_write(&self.path, format!("{pid}\n").as_bytes()).map_err(|source| {
            PidFileError::Write {
                path: self.path.clone(),
                source,
            }
        })?;
        self.cached = OnceCell::with_value(Some(pid));
        info!(
            target: PIDFILE_TARGET,
            pid,
            file = %self.path.display(),
            "pid file written"
        );
        Ok(())
    }

    /// Writes `pid` and hands back a guard that removes the file on drop.
    pub fn persist(mut self, pid: u32) -> Result<PidFileGuard, PidFileError> {
        self.write(pid)?;
        Ok(PidFileGuard {
            path: self.path,
            pid,
        })
    }

    /// Creates the parent directory and checks it accepts new files.
    pub fn prepare(&self) -> Result<(), PidFileError> {
        if let Ok(directory) = parent_directory(&self.path) {
            fs::create_dir_all(directory).map_err(|source| PidFileError::Directory {
                path: directory.to_path_buf(),
                source,
            })?;
        }
        probe_writable(&self.path).map_err(|source| PidFileError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Whether the recorded pid names a live process.
    #[must_use]
    pub fn is_process_alive(&self) -> bool {
        self.read().is_some_and(process_alive)
    }

    /// Derives the run state from the file and the process table.
    #[must_use]
    pub fn run_state(&self) -> ProcessRunState {
        if !self.path.exists() {
            return ProcessRunState::NotRunning;
        }
        match self.read() {
            Some(pid) if process_alive(pid) => ProcessRunState::Running { pid },
            pid => ProcessRunState::DeadButPidFileExists { pid },
        }
    }

    /// Human-readable summary used by `racecarctl status`.
    #[must_use]
    pub fn describe_status(&self) -> String {
        StatusDescription {
            path: &self.path,
            state: self.run_state(),
        }
        .to_string()
    }

    /// Deletes the file when it is stale. Returns whether it was removed.
    pub fn remove_if_stale(&mut self) -> Result<bool, PidFileError> {
        let ProcessRunState::DeadButPidFileExists { pid } = self.run_state() else {
            return Ok(false);
        };
        warn!(
            target: PIDFILE_TARGET,
            pid = ?pid,
            file = %self.path.display(),
            "recorded process not detected; removing stale pid file"
        );
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(PidFileError::Cleanup {
                    path: self.path.clone(),
                    source,
                });
            }
        }
        self.reload();
        Ok(true)
    }
}

struct StatusDescription<'a> {
    path: &'a Path,
    state: ProcessRunState,
}

impl fmt::Display for StatusDescription<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.display();
        match self.state {
            ProcessRunState::NotRunning => write!(formatter, "no pidfile at {path}"),
            ProcessRunState::Running { pid } => write!(formatter, "running (PID = {pid})"),
            ProcessRunState::DeadButPidFileExists { pid: Some(pid) } => write!(
                formatter,
                "pidfile {path} present but process {pid} is not running"
            ),
            ProcessRunState::DeadButPidFileExists { pid: None } => {
                write!(formatter, "pidfile {path} present but contains no valid pid")
            }
        }
    }
}

/// Removes the pidfile when the owning daemon exits cleanly.
///
/// The file is left alone if it no longer records the owner's pid, so a
/// daemon cannot delete a successor's record.
#[derive(Debug)]
pub struct PidFileGuard {
    path: PathBuf,
    pid: u32,
}

impl PidFileGuard {
    /// Pid recorded by this guard.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Pidfile location.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        if read_pid(&self.path) != Some(self.pid) {
            debug!(
                target: PIDFILE_TARGET,
                file = %self.path.display(),
                "pid file no longer owned; leaving it in place"
            );
            return;
        }
        match fs::remove_file(&self.path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => {
                warn!(
                    target: PIDFILE_TARGET,
                    file = %self.path.display(),
                    error = %error,
                    "failed to remove pid file"
                );
            }
            _ => {}
        }
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    parse_pid(&content)
}

fn parse_pid(content: &str) -> Option<u32> {
    content
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|pid| *pid != 0 && i32::try_from(*pid).is_ok())
}

/// Probes `pid` with a null signal.
///
/// A process owned by another user still counts as alive. Pid 0 and values
/// outside the platform range never name a single process.
#[cfg(unix)]
#[must_use]
pub fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw == 0 {
        return false;
    }
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => true,
        Err(Errno::ESRCH) => false,
        Err(errno) => {
            warn!(
                target: PIDFILE_TARGET,
                pid,
                error = %errno,
                "failed to probe recorded process; treating it as not running"
            );
            false
        }
    }
}

/// Looks `pid` up in the system process table.
///
/// Pid 0 never names a single process.
#[cfg(not(unix))]
#[must_use]
pub fn process_alive(pid: u32) -> bool {
    use sysinfo::{Pid, ProcessesToUpdate, System};

    if pid == 0 {
        return false;
    }
    let target = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
    let alive = system.process(target).is_some();
    debug!(target: PIDFILE_TARGET, pid, alive, "probed process table");
    alive
}
