//! Consumer types the launcher can start, and the registry that names them.

use std::collections::BTreeMap;

use racecar_config::{ConsumerConfig, ConsumerSpec, Subscription};
use thiserror::Error;
use tracing::info;

const CONSUMER_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::consumer");

/// Failure raised by a consumer hook.
#[derive(Debug, Error)]
#[error("consumer '{consumer}' failed: {message}")]
pub struct ConsumerError {
    /// Registry name of the failing consumer.
    pub consumer: String,
    /// Human-readable failure description.
    pub message: String,
}

impl ConsumerError {
    /// Builds an error for `consumer`.
    #[must_use]
    pub fn new(consumer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            consumer: consumer.into(),
            message: message.into(),
        }
    }
}

/// A message consumer driven by the launcher's run-loop.
///
/// Both hooks default to doing nothing. Message handling itself happens
/// outside the lifecycle code.
pub trait Consumer {
    /// Called once the process is in its final (possibly detached) form.
    fn start(&mut self, config: &ConsumerConfig) -> Result<(), ConsumerError> {
        let _ = config;
        Ok(())
    }

    /// Called after a shutdown request, before the process exits.
    fn stop(&mut self) {}
}

/// Builds a fresh consumer instance.
pub type ConsumerFactory = fn() -> Box<dyn Consumer>;

/// A registered consumer type.
#[derive(Debug, Clone)]
pub struct ConsumerDefinition {
    spec: ConsumerSpec,
    factory: ConsumerFactory,
}

impl ConsumerDefinition {
    /// Settings the consumer type declares.
    #[must_use]
    pub const fn spec(&self) -> &ConsumerSpec {
        &self.spec
    }

    /// Instantiates the consumer.
    #[must_use]
    pub fn instantiate(&self) -> Box<dyn Consumer> {
        (self.factory)()
    }
}

/// Errors raised while resolving a consumer name.
#[derive(Debug, Error)]
pub enum LookupError {
    /// No consumer is registered under the requested name.
    #[error("unknown consumer '{name}' (known consumers: {known})")]
    Unknown {
        /// Requested name.
        name: String,
        /// Comma-separated registered names.
        known: String,
    },
}

/// Explicit mapping from consumer names to their definitions.
#[derive(Debug, Clone, Default)]
pub struct ConsumerRegistry {
    definitions: BTreeMap<String, ConsumerDefinition>,
}

impl ConsumerRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the consumers shipped with the binary.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(EchoConsumer::spec(), EchoConsumer::boxed);
        registry
    }

    /// Registers `factory` under the spec's name, replacing any previous entry.
    pub fn register(&mut self, spec: ConsumerSpec, factory: ConsumerFactory) -> &mut Self {
        self.definitions
            .insert(spec.name.clone(), ConsumerDefinition { spec, factory });
        self
    }

    /// Resolves a consumer by its registered name.
    pub fn lookup(&self, name: &str) -> Result<&ConsumerDefinition, LookupError> {
        self.definitions.get(name).ok_or_else(|| LookupError::Unknown {
            name: name.to_owned(),
            known: self.names().collect::<Vec<_>>().join(", "),
        })
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }
}

/// Built-in consumer that logs its subscriptions and idles until stopped.
#[derive(Debug, Default)]
pub struct EchoConsumer {
    topics: Vec<String>,
}

impl EchoConsumer {
    /// Registry name.
    pub const NAME: &'static str = "EchoConsumer";

    /// Subscribes to the `echo` topic.
    #[must_use]
    pub fn spec() -> ConsumerSpec {
        ConsumerSpec::new(Self::NAME).subscribes_to(Subscription::new("echo"))
    }

    fn boxed() -> Box<dyn Consumer> {
        Box::new(Self::default())
    }
}

impl Consumer for EchoConsumer {
    fn start(&mut self, config: &ConsumerConfig) -> Result<(), ConsumerError> {
        self.topics = config
            .subscriptions
            .iter()
            .map(|subscription| subscription.topic.clone())
            .collect();
        info!(
            target: CONSUMER_TARGET,
            consumer = Self::NAME,
            group = config.group_id.as_deref().unwrap_or_default(),
            topics = ?self.topics,
            "consumer started"
        );
        Ok(())
    }

    fn stop(&mut self) {
        info!(
            target: CONSUMER_TARGET,
            consumer = Self::NAME,
            topics = ?self.topics,
            "consumer stopped"
        );
    }
}
