//! Command-line and environment overrides layered over the config file.

use std::path::{Path, PathBuf};

use clap::Args;

use crate::defaults::DEFAULT_CONFIG_PATH;
use crate::{ConfigError, ConsumerConfig, LogFormat};

/// Configuration flags shared by `racecar` and `racecarctl produce`.
///
/// Precedence is command line, then environment, then the YAML file, then
/// built-in defaults.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigArgs {
    /// YAML configuration file (defaults to `config/racecar.yml` when present).
    #[arg(long, value_name = "FILE", env = "RACECAR_CONFIG_PATH")]
    pub config_path: Option<PathBuf>,
    /// Comma-separated seed broker addresses.
    #[arg(
        long,
        value_name = "HOST:PORT",
        env = "RACECAR_BROKERS",
        value_delimiter = ','
    )]
    pub brokers: Vec<String>,
    /// Client identifier reported to the broker.
    #[arg(long, value_name = "ID", env = "RACECAR_CLIENT_ID")]
    pub client_id: Option<String>,
    /// Log filter expression, for example `info` or `racecar=debug`.
    #[arg(long, value_name = "FILTER", env = "RACECAR_LOG_FILTER")]
    pub log_filter: Option<String>,
    /// Log output format (`compact` or `json`).
    #[arg(long, value_name = "FORMAT", env = "RACECAR_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
}

impl ConfigArgs {
    /// Loads the file layer and applies the overrides on top.
    ///
    /// An explicit `--config-path` must exist; the default path is optional.
    pub fn load(&self) -> Result<ConsumerConfig, ConfigError> {
        let mut config = match &self.config_path {
            Some(path) => ConsumerConfig::from_file(path)?,
            None => ConsumerConfig::from_optional_file(Path::new(DEFAULT_CONFIG_PATH))?,
        };
        self.apply(&mut config);
        Ok(config)
    }

    /// Applies the overrides that were supplied.
    pub fn apply(&self, config: &mut ConsumerConfig) {
        if !self.brokers.is_empty() {
            config.brokers.clone_from(&self.brokers);
        }
        if let Some(client_id) = &self.client_id {
            config.client_id.clone_from(client_id);
        }
        if let Some(log_filter) = &self.log_filter {
            config.log_filter.clone_from(log_filter);
        }
        if let Some(log_format) = self.log_format {
            config.log_format = log_format;
        }
    }
}
