//! Shared configuration for the Racecar launcher and control utility.
//!
//! Two layers live here. [`ConsumerConfig`] is the consumer-facing settings
//! object, built from a YAML file, environment variables, and command-line
//! flags through [`ConfigArgs`]. [`LifecycleConfig`] is the narrow value the
//! process lifecycle needs (pidfile, log destination, daemonize flag). It is
//! derived from the consumer settings once per invocation and passed
//! explicitly to the daemonisation code rather than held in global state.

mod args;
mod consumer;
mod defaults;
mod error;
mod lifecycle;
mod logging;

pub use args::ConfigArgs;
pub use consumer::{ConsumerConfig, ConsumerSpec, Subscription};
pub use defaults::{
    DEFAULT_BROKER, DEFAULT_CLIENT_ID, DEFAULT_CONFIG_PATH, DEFAULT_LOG_FILTER, DEFAULT_PIDFILE,
    default_brokers,
};
pub use error::ConfigError;
pub use lifecycle::{LifecycleConfig, OutputRedirectionTarget};
pub use logging::{LogFormat, LogFormatParseError};
