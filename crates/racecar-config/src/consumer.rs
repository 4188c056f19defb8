//! Consumer settings loaded from file, environment, and command line.

use std::fs;
use std::io;
use std::path::Path;

use camino::Utf8PathBuf;
use serde::Deserialize;

use crate::defaults::{DEFAULT_CLIENT_ID, DEFAULT_LOG_FILTER, DEFAULT_PIDFILE, default_brokers};
use crate::{ConfigError, LogFormat};

/// A topic the consumer reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Topic name.
    pub topic: String,
    /// Whether a new consumer group starts at the earliest offset.
    pub start_from_beginning: bool,
}

impl Subscription {
    /// Subscribes to `topic`, starting from the beginning for new groups.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            start_from_beginning: true,
        }
    }

    /// Starts new consumer groups at the latest offset instead.
    #[must_use]
    pub const fn from_latest(mut self) -> Self {
        self.start_from_beginning = false;
        self
    }
}

/// Settings a consumer type declares about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSpec {
    /// Registry name of the consumer.
    pub name: String,
    /// Explicit consumer group, if the consumer pins one.
    pub group_id: Option<String>,
    /// Topics the consumer subscribes to.
    pub subscriptions: Vec<Subscription>,
}

impl ConsumerSpec {
    /// Describes a consumer registered under `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group_id: None,
            subscriptions: Vec::new(),
        }
    }

    /// Adds a subscription.
    #[must_use]
    pub fn subscribes_to(mut self, subscription: Subscription) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    /// Pins the consumer group.
    #[must_use]
    pub fn group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

/// Consumer configuration shared by the launcher and `racecarctl produce`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsumerConfig {
    /// Seed broker addresses.
    pub brokers: Vec<String>,
    /// Client identifier reported to the broker.
    pub client_id: String,
    /// Consumer group; derived from the consumer name when unset.
    pub group_id: Option<String>,
    /// Prefix prepended to derived consumer group names.
    pub group_id_prefix: Option<String>,
    /// Pidfile written when daemonised.
    pub pidfile: Utf8PathBuf,
    /// Log destination; output is suppressed when daemonised without one.
    pub logfile: Option<Utf8PathBuf>,
    /// Log filter expression.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Subscriptions contributed by the loaded consumer.
    #[serde(skip)]
    pub subscriptions: Vec<Subscription>,
    #[serde(skip)]
    consumer: Option<String>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            client_id: DEFAULT_CLIENT_ID.to_owned(),
            group_id: None,
            group_id_prefix: None,
            pidfile: Utf8PathBuf::from(DEFAULT_PIDFILE),
            logfile: None,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
            subscriptions: Vec::new(),
            consumer: None,
        }
    }
}

impl ConsumerConfig {
    /// Reads settings from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(path, &content)
    }

    /// Reads settings from `path` when present, falling back to defaults.
    pub fn from_optional_file(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_yaml(path, &content),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn from_yaml(path: &Path, content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_saphyr::from_str(content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })
    }

    /// Merges the settings declared by a consumer type.
    ///
    /// The consumer's own group wins over the file-level `group_id`. Without
    /// either, the group is the kebab-cased consumer name behind the optional
    /// prefix.
    pub fn load_consumer(&mut self, spec: &ConsumerSpec) {
        if let Some(group_id) = &spec.group_id {
            self.group_id = Some(group_id.clone());
        } else if self.group_id.is_none() {
            let prefix = self.group_id_prefix.as_deref().unwrap_or_default();
            self.group_id = Some(format!("{prefix}{}", default_group_id(&spec.name)));
        }
        self.subscriptions.clone_from(&spec.subscriptions);
        self.consumer = Some(spec.name.clone());
    }

    /// Name of the consumer merged through [`Self::load_consumer`].
    #[must_use]
    pub fn consumer(&self) -> Option<&str> {
        self.consumer.as_deref()
    }

    /// Checks the settings after every layer has been applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.brokers.is_empty() || self.brokers.iter().any(|broker| broker.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "brokers",
                reason: "must list at least one non-empty broker address",
            });
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "client_id",
                reason: "must not be empty",
            });
        }
        if self.pidfile.as_str().trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "pidfile",
                reason: "must not be empty",
            });
        }
        if self.consumer.is_none() {
            return Ok(());
        }
        if self
            .group_id
            .as_deref()
            .is_none_or(|group| group.trim().is_empty())
        {
            return Err(ConfigError::Invalid {
                field: "group_id",
                reason: "must be set for a consumer",
            });
        }
        if self.subscriptions.is_empty() {
            return Err(ConfigError::Invalid {
                field: "subscriptions",
                reason: "must name at least one topic",
            });
        }
        Ok(())
    }
}

fn default_group_id(name: &str) -> String {
    let mut group = String::with_capacity(name.len() + 4);
    let mut previous: Option<char> = None;
    for ch in name.chars() {
        if ch == ':' {
            if previous != Some(':') {
                group.push('-');
            }
        } else {
            let boundary = previous.is_some_and(|prev| prev.is_ascii_lowercase() || prev.is_ascii_digit());
            if ch.is_ascii_uppercase() && boundary {
                group.push('-');
            }
            group.push(ch.to_ascii_lowercase());
        }
        previous = Some(ch);
    }
    group
}
