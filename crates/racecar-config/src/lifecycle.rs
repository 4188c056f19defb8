//! Lifecycle-affecting settings for a single invocation.

use std::env;
use std::path::{Path, PathBuf};

use crate::{ConfigError, ConsumerConfig};

/// Where daemon output goes once the process has detached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputRedirectionTarget {
    /// Discard stdout and stderr.
    Suppressed,
    /// Append stdout and stderr to the file.
    RedirectedTo(PathBuf),
}

/// Pidfile, log destination, and daemonize flag for one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    pidfile: PathBuf,
    logfile: Option<PathBuf>,
    daemonize: bool,
}

impl LifecycleConfig {
    /// Builds a foreground configuration recording its pid at `pidfile`.
    #[must_use]
    pub fn new(pidfile: impl Into<PathBuf>) -> Self {
        Self {
            pidfile: pidfile.into(),
            logfile: None,
            daemonize: false,
        }
    }

    /// Derives the lifecycle settings from loaded consumer configuration.
    #[must_use]
    pub fn from_consumer_config(config: &ConsumerConfig, daemonize: bool) -> Self {
        Self {
            pidfile: config.pidfile.clone().into_std_path_buf(),
            logfile: config
                .logfile
                .clone()
                .map(camino::Utf8PathBuf::into_std_path_buf),
            daemonize,
        }
    }

    /// Replaces the pidfile location.
    #[must_use]
    pub fn with_pidfile(mut self, pidfile: impl Into<PathBuf>) -> Self {
        self.pidfile = pidfile.into();
        self
    }

    /// Sets the log destination.
    #[must_use]
    pub fn with_logfile(mut self, logfile: impl Into<PathBuf>) -> Self {
        self.logfile = Some(logfile.into());
        self
    }

    /// Sets whether the launch detaches into the background.
    #[must_use]
    pub const fn with_daemonize(mut self, daemonize: bool) -> Self {
        self.daemonize = daemonize;
        self
    }

    /// Anchors relative paths at `base`.
    #[must_use]
    pub fn absolutise(mut self, base: &Path) -> Self {
        self.pidfile = anchor(base, self.pidfile);
        self.logfile = self.logfile.map(|path| anchor(base, path));
        self
    }

    /// Anchors relative paths at the current working directory.
    ///
    /// Daemonisation may change the working directory, so this runs before
    /// any lifecycle action.
    pub fn resolve(self) -> Result<Self, ConfigError> {
        let base = env::current_dir().map_err(|source| ConfigError::WorkingDirectory { source })?;
        Ok(self.absolutise(&base))
    }

    /// Pidfile location.
    #[must_use]
    pub fn pidfile(&self) -> &Path {
        self.pidfile.as_path()
    }

    /// Log destination, if one was configured.
    #[must_use]
    pub fn logfile(&self) -> Option<&Path> {
        self.logfile.as_deref()
    }

    /// Whether the launch detaches into the background.
    #[must_use]
    pub const fn daemonize(&self) -> bool {
        self.daemonize
    }

    /// Chooses the redirection applied after detaching.
    #[must_use]
    pub fn output_target(&self) -> OutputRedirectionTarget {
        self.logfile.as_ref().map_or(OutputRedirectionTarget::Suppressed, |path| {
            OutputRedirectionTarget::RedirectedTo(path.clone())
        })
    }
}

fn anchor(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
