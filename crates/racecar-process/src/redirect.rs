//! Points stdout and stderr away from the controlling terminal.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use racecar_config::OutputRedirectionTarget;
use thiserror::Error;
use tracing::debug;

const REDIRECT_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::redirect");

#[cfg(unix)]
const NULL_DEVICE: &str = "/dev/null";
#[cfg(not(unix))]
const NULL_DEVICE: &str = "NUL";

/// Errors raised while redirecting the standard streams.
#[derive(Debug, Error)]
pub enum RedirectError {
    /// The redirection target could not be opened.
    #[error("failed to open output destination '{path}': {source}")]
    Open {
        /// Destination path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Rebinding a standard stream failed.
    #[error("failed to redirect {stream}: {source}")]
    Rebind {
        /// Stream being redirected.
        stream: &'static str,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Strategy for detaching the standard streams from the terminal.
pub trait OutputRedirector {
    /// Rebinds stdout and stderr onto `target`.
    fn apply(&self, target: &OutputRedirectionTarget) -> Result<(), RedirectError>;

    /// Confirms `target` can be opened without touching the standard streams.
    ///
    /// A log file that does not exist yet is created empty.
    fn prepare(&self, target: &OutputRedirectionTarget) -> Result<(), RedirectError> {
        open_target(target).map(drop)
    }
}

/// Redirector that rebinds file descriptors 1 and 2.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOutputRedirector;

impl SystemOutputRedirector {
    /// Builds a new system redirector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl OutputRedirector for SystemOutputRedirector {
    fn apply(&self, target: &OutputRedirectionTarget) -> Result<(), RedirectError> {
        let destination = open_target(target)?;
        // Anything buffered so far belongs to the old destination.
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
        rebind(&destination)?;
        debug!(
            target: REDIRECT_TARGET,
            destination = ?target,
            "standard streams redirected"
        );
        Ok(())
    }
}

/// Opens the file stdout and stderr should be bound to.
pub fn open_target(target: &OutputRedirectionTarget) -> Result<File, RedirectError> {
    let path = match target {
        OutputRedirectionTarget::Suppressed => Path::new(NULL_DEVICE),
        OutputRedirectionTarget::RedirectedTo(path) => path.as_path(),
    };
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    options.open(path).map_err(|source| RedirectError::Open {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn rebind(destination: &File) -> Result<(), RedirectError> {
    use std::os::fd::AsRawFd;

    use nix::unistd::dup2;

    let source = destination.as_raw_fd();
    for (stream, fd) in [
        ("stdout", io::stdout().as_raw_fd()),
        ("stderr", io::stderr().as_raw_fd()),
    ] {
        dup2(source, fd).map_err(|errno| RedirectError::Rebind {
            stream,
            source: io::Error::from(errno),
        })?;
    }
    Ok(())
}

// The spawning daemoniser attaches the child's streams at spawn time.
#[cfg(not(unix))]
fn rebind(_destination: &File) -> Result<(), RedirectError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_target_creates_log_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("out.log");
        open_target(&OutputRedirectionTarget::RedirectedTo(path.clone()))
            .expect("log file should open");
        assert!(path.exists());
    }

    #[test]
    fn open_target_appends_to_existing_log() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("out.log");
        std::fs::write(&path, "first\n").expect("seed log");
        let mut file = open_target(&OutputRedirectionTarget::RedirectedTo(path.clone()))
            .expect("log file should open");
        file.write_all(b"second\n").expect("append");
        let content = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn open_target_reports_missing_directory() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("missing/out.log");
        let error = open_target(&OutputRedirectionTarget::RedirectedTo(path.clone()))
            .expect_err("missing directory should fail");
        let RedirectError::Open { path: reported, .. } = error else {
            panic!("expected open error, got {error:?}");
        };
        assert_eq!(reported, path);
    }

    #[test]
    fn suppressed_output_opens_null_device() {
        open_target(&OutputRedirectionTarget::Suppressed).expect("null device should open");
    }
}
