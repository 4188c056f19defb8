//! The run-loop a launched consumer lives in.

use racecar_config::ConsumerConfig;
use racecar_process::{ShutdownSignal, SystemShutdownSignal};
use tracing::info;

use crate::consumer::Consumer;
use crate::errors::LaunchError;

const RUNTIME_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::runtime");

/// Drives a consumer until shutdown is requested.
pub trait ConsumerRuntime {
    /// Runs `consumer` to completion.
    fn run(&self, consumer: Box<dyn Consumer>, config: &ConsumerConfig) -> Result<(), LaunchError>;
}

/// Runtime that starts the consumer and parks until a termination signal.
#[derive(Debug, Default, Clone)]
pub struct SignalRuntime<S = SystemShutdownSignal> {
    shutdown: S,
}

impl<S> SignalRuntime<S>
where
    S: ShutdownSignal,
{
    /// Waits on `shutdown` between the consumer's start and stop hooks.
    #[must_use]
    pub const fn new(shutdown: S) -> Self {
        Self { shutdown }
    }
}

impl<S> ConsumerRuntime for SignalRuntime<S>
where
    S: ShutdownSignal,
{
    fn run(
        &self,
        mut consumer: Box<dyn Consumer>,
        config: &ConsumerConfig,
    ) -> Result<(), LaunchError> {
        consumer.start(config)?;
        info!(
            target: RUNTIME_TARGET,
            consumer = config.consumer().unwrap_or_default(),
            pid = std::process::id(),
            "consumer running"
        );
        let waited = self.shutdown.wait();
        consumer.stop();
        waited?;
        info!(target: RUNTIME_TARGET, "shutdown sequence completed");
        Ok(())
    }
}
