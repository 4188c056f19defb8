//! Detaches the launcher into the background and sequences the steps around it.
//!
//! Startup order is fixed:
//!
//! 1. [`Daemon::check_not_already_running`] and
//!    [`Daemon::prepare_output_redirection`], while the terminal can still
//!    show the failure;
//! 2. [`Daemon::detach`];
//! 3. [`Daemon::apply_output_redirection`], before anything else is written;
//! 4. [`Daemon::persist_pid`], so the recorded pid is the detached child's.

use std::env;
use std::io;
use std::path::PathBuf;
use std::process::{self, Command, Stdio};

use racecar_config::{LifecycleConfig, OutputRedirectionTarget};
use thiserror::Error;
use tracing::info;

use crate::pidfile::{PidFile, PidFileError, PidFileGuard, ProcessRunState};
use crate::redirect::{OutputRedirector, RedirectError, open_target};

const DAEMON_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::daemon");

/// Environment marker set on a child spawned by [`SpawnDaemonizer`].
pub const DETACHED_ENV_VAR: &str = "RACECAR_DETACHED";

/// Errors surfaced while daemonising.
#[derive(Debug, Error)]
pub enum DaemonizeError {
    /// A live process is already recorded in the pidfile.
    #[error("racecar is already running with pid {pid} (pid file '{path}')")]
    AlreadyRunning {
        /// Pid recorded in the existing pidfile.
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
    /// The working directory could not be resolved.
    #[error("failed to resolve working directory: {source}")]
    WorkingDirectory {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// System-level daemonisation failed.
    #[cfg(unix)]
    #[error("failed to daemonise: {0}")]
    System(#[from] daemonize_me::DaemonError),
    /// Spawning the detached child failed.
    #[error("failed to spawn detached process '{binary}': {source}")]
    Spawn {
        /// Executable that was re-launched.
        binary: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Abstraction over daemonisation strategies.
pub trait Daemonizer {
    /// Detaches the process into the background.
    ///
    /// Returns only in the detached process; the invoking process exits
    /// successfully once detachment is confirmed.
    fn detach(&self, config: &LifecycleConfig) -> Result<(), DaemonizeError>;

    /// Whether this process is a detached child resuming a launch its
    /// parent already announced.
    fn resumed(&self) -> bool {
        false
    }
}

/// Daemoniser that double-forks through `daemonize-me`.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDaemonizer;

#[cfg(unix)]
impl SystemDaemonizer {
    /// Builds a new system daemoniser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl Daemonizer for SystemDaemonizer {
    fn detach(&self, config: &LifecycleConfig) -> Result<(), DaemonizeError> {
        use std::ffi::OsStr;

        use daemonize_me::Daemon as DaemonBuilder;

        let work_dir =
            env::current_dir().map_err(|source| DaemonizeError::WorkingDirectory { source })?;
        info!(
            target: DAEMON_TARGET,
            pidfile = %config.pidfile().display(),
            work_dir = %work_dir.display(),
            "daemonising into background"
        );
        DaemonBuilder::new()
            .work_dir(&work_dir)
            .name(OsStr::new("racecar"))
            .start()?;
        info!(
            target: DAEMON_TARGET,
            "daemon process detached; continuing in child"
        );
        Ok(())
    }
}

/// Daemoniser for platforms without `fork`.
///
/// Re-launches the current executable with the same arguments, its streams
/// already bound to the redirection target, and exits the parent. The child
/// sees [`DETACHED_ENV_VAR`] and treats detaching as done.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpawnDaemonizer;

impl Daemonizer for SpawnDaemonizer {
    fn detach(&self, config: &LifecycleConfig) -> Result<(), DaemonizeError> {
        if self.resumed() {
            info!(target: DAEMON_TARGET, "running as detached child");
            return Ok(());
        }
        let binary = env::current_exe().map_err(|source| DaemonizeError::Spawn {
            binary: PathBuf::new(),
            source,
        })?;
        let stdout = open_target(&config.output_target())?;
        let stderr = stdout.try_clone().map_err(|source| DaemonizeError::Spawn {
            binary: binary.clone(),
            source,
        })?;
        let mut command = Command::new(&binary);
        command
            .args(env::args_os().skip(1))
            .env(DETACHED_ENV_VAR, "1")
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
        }
        let child = command
            .spawn()
            .map_err(|source| DaemonizeError::Spawn { binary, source })?;
        info!(
            target: DAEMON_TARGET,
            pid = child.id(),
            "detached child spawned; parent exiting"
        );
        process::exit(0);
    }

    fn resumed(&self) -> bool {
        env::var_os(DETACHED_ENV_VAR).is_some()
    }
}

/// Daemoniser used by the binaries on this platform.
#[cfg(unix)]
pub type PlatformDaemonizer = SystemDaemonizer;

/// Daemoniser used by the binaries on this platform.
///
/// The spawned child re-runs the launch with [`DETACHED_ENV_VAR`] set and
/// skips the banner lines its parent printed before detaching.
#[cfg(not(unix))]
pub type PlatformDaemonizer = SpawnDaemonizer;

/// Startup sequence of a background launch.
pub struct Daemon<D, O> {
    pidfile: PidFile,
    daemonizer: D,
    redirector: O,
}

impl<D, O> Daemon<D, O>
where
    D: Daemonizer,
    O: OutputRedirector,
{
    /// Prepares a background launch recording its pid in `pidfile`.
    #[must_use]
    pub const fn new(pidfile: PidFile, daemonizer: D, redirector: O) -> Self {
        Self {
            pidfile,
            daemonizer,
            redirector,
        }
    }

    /// Pidfile the launch will own.
    #[must_use]
    pub const fn pidfile(&self) -> &PidFile {
        &self.pidfile
    }

    /// Refuses to start over a live recorded process.
    ///
    /// A stale pidfile is removed and the pidfile directory is created and
    /// probed, so an unwritable location fails while the terminal is still
    /// attached.
    pub fn check_not_already_running(&mut self) -> Result<(), DaemonizeError> {
        if let ProcessRunState::Running { pid } = self.pidfile.run_state() {
            info!(
                target: DAEMON_TARGET,
                pid,
                file = %self.pidfile.path().display(),
                "refusing to start: existing process alive"
            );
            return Err(DaemonizeError::AlreadyRunning {
                pid,
                path: self.pidfile.path().to_path_buf(),
            });
        }
        self.pidfile.remove_if_stale()?;
        self.pidfile.prepare()?;
        Ok(())
    }

    /// Opens the output target once so a bad log destination fails
    /// before detaching.
    pub fn prepare_output_redirection(
        &self,
        target: &OutputRedirectionTarget,
    ) -> Result<(), DaemonizeError> {
        self.redirector.prepare(target).map_err(DaemonizeError::from)
    }

    /// Detaches from the controlling terminal.
    pub fn detach(&self, config: &LifecycleConfig) -> Result<(), DaemonizeError> {
        self.daemonizer.detach(config)
    }

    /// Points stdout and stderr at `target`.
    pub fn apply_output_redirection(
        &self,
        target: &OutputRedirectionTarget,
    ) -> Result<(), DaemonizeError> {
        self.redirector.apply(target).map_err(DaemonizeError::from)
    }

    /// Records the current (detached) process in the pidfile.
    pub fn persist_pid(self) -> Result<PidFileGuard, DaemonizeError> {
        let pid = process::id();
        let guard = self.pidfile.persist(pid)?;
        Ok(guard)
    }
}
