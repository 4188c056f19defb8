//! One-off message delivery for `racecarctl produce`.

use std::io::Write;

use racecar_config::ConsumerConfig;
use thiserror::Error;
use tracing::info;

use crate::cli::ProduceArgs;
use crate::errors::ControlError;
use crate::output::ControlOutput;

const PRODUCE_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::produce");

/// A single message to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceMessage {
    /// Message payload.
    pub value: String,
    /// Optional partitioning key.
    pub key: Option<String>,
    /// Destination topic.
    pub topic: String,
}

/// Errors raised by a delivery backend.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// No broker client is available to this binary.
    #[error("no message delivery backend is configured for brokers {brokers}")]
    Unavailable {
        /// Comma-separated brokers from the configuration.
        brokers: String,
    },
    /// The cluster refused the message.
    #[error("delivery to topic '{topic}' failed: {reason}")]
    Rejected {
        /// Destination topic.
        topic: String,
        /// Backend diagnostic.
        reason: String,
    },
}

/// Hands a message to the message-stream cluster.
pub trait MessageDelivery {
    /// Delivers `message` using the brokers and client id in `config`.
    fn deliver(&self, message: &ProduceMessage, config: &ConsumerConfig)
    -> Result<(), DeliveryError>;
}

/// Delivery used when the binary carries no broker client.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredDelivery;

impl MessageDelivery for UnconfiguredDelivery {
    fn deliver(
        &self,
        _message: &ProduceMessage,
        config: &ConsumerConfig,
    ) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unavailable {
            brokers: config.brokers.join(","),
        })
    }
}

/// Validates the arguments and configuration, then delivers the message.
pub fn produce<D, W, E>(
    args: &ProduceArgs,
    delivery: &D,
    output: &mut ControlOutput<W, E>,
) -> Result<(), ControlError>
where
    D: MessageDelivery,
    W: Write,
    E: Write,
{
    let message = args.message()?;
    let config = args.config.load()?;
    config.validate()?;
    info!(
        target: PRODUCE_TARGET,
        topic = %message.topic,
        key = ?message.key,
        client_id = %config.client_id,
        "delivering message"
    );
    delivery.deliver(&message, &config)?;
    output.stderr_line(format_args!("=> Delivered message to Kafka cluster"))
}
