//! Error surface for configuration loading and validation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating consumer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file '{path}': {source}")]
    Read {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The configuration file was not valid YAML for the expected shape.
    #[error("failed to parse configuration file '{path}': {message}")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },
    /// A loaded setting failed post-load validation.
    #[error("invalid configuration: {field} {reason}")]
    Invalid {
        /// Name of the offending setting.
        field: &'static str,
        /// Human-readable description of the problem.
        reason: &'static str,
    },
    /// The working directory could not be resolved for relative paths.
    #[error("failed to resolve working directory: {source}")]
    WorkingDirectory {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
