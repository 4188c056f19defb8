//! Command-line surface of `racecarctl`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use racecar_config::{ConfigArgs, DEFAULT_PIDFILE, LifecycleConfig};

use crate::controller::StopPolicy;
use crate::errors::ControlError;
use crate::produce::ProduceMessage;

/// Inspects, stops, or feeds a running Racecar consumer.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "racecarctl", version, about)]
pub struct Cli {
    /// Control command.
    #[command(subcommand)]
    pub command: Command,
}

/// Control commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report whether the recorded process is running.
    Status(PidfileArgs),
    /// Ask the recorded process to stop and wait for it to exit.
    Stop(StopArgs),
    /// Deliver a single message to a topic.
    Produce(ProduceArgs),
}

/// Locates the pidfile written by the daemon.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PidfileArgs {
    /// Use the pid stored in the specified file.
    #[arg(
        long,
        value_name = "PATH",
        env = "RACECAR_PIDFILE",
        default_value = DEFAULT_PIDFILE
    )]
    pub pidfile: PathBuf,
}

impl PidfileArgs {
    /// Pidfile path anchored at the working directory.
    pub fn resolve(&self) -> Result<PathBuf, ControlError> {
        let lifecycle = LifecycleConfig::new(self.pidfile.clone()).resolve()?;
        Ok(lifecycle.pidfile().to_path_buf())
    }
}

/// Arguments of `racecarctl stop`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct StopArgs {
    /// Pidfile location.
    #[command(flatten)]
    pub pidfile: PidfileArgs,
    /// Give up waiting after this many seconds.
    #[arg(long, value_name = "SECS", default_value_t = 600)]
    pub timeout: u64,
    /// Seconds between liveness checks.
    #[arg(long, value_name = "SECS", default_value_t = 5)]
    pub interval: u64,
}

impl StopArgs {
    /// Wait policy described by the flags.
    #[must_use]
    pub const fn policy(&self) -> StopPolicy {
        StopPolicy {
            interval: Duration::from_secs(self.interval),
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

/// Arguments of `racecarctl produce`.
///
/// Topic and value are optional here so their absence is reported with the
/// same wording as other control errors.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ProduceArgs {
    /// Message value.
    #[arg(short = 'v', long, value_name = "VALUE")]
    pub value: Option<String>,
    /// Message key.
    #[arg(short = 'k', long, value_name = "KEY")]
    pub key: Option<String>,
    /// Destination topic.
    #[arg(short = 't', long, value_name = "TOPIC")]
    pub topic: Option<String>,
    /// Broker configuration.
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl ProduceArgs {
    /// Checks that a topic and value were given.
    pub fn message(&self) -> Result<ProduceMessage, ControlError> {
        let topic = self.topic.clone().ok_or(ControlError::MissingTopic)?;
        let value = self.value.clone().ok_or(ControlError::MissingValue)?;
        Ok(ProduceMessage {
            value,
            key: self.key.clone(),
            topic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(argv: &[&str]) -> Command {
        Cli::try_parse_from(argv).expect("arguments should parse").command
    }

    #[test]
    fn stop_defaults_match_legacy_polling() {
        let Command::Stop(args) = parse(&["racecarctl", "stop", "--pidfile", "/tmp/r.pid"]) else {
            panic!("expected stop");
        };
        assert_eq!(args.policy().interval, Duration::from_secs(5));
        assert_eq!(args.policy().timeout, Duration::from_secs(600));
    }

    #[test]
    fn relative_pidfile_is_anchored() {
        let Command::Status(args) = parse(&["racecarctl", "status", "--pidfile", "run/r.pid"]) else {
            panic!("expected status");
        };
        let resolved = args.resolve().expect("resolve");
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("run/r.pid"));
    }

    #[rstest]
    #[case::missing_topic(&["racecarctl", "produce", "-v", "hello"], "no topic specified")]
    #[case::missing_value(&["racecarctl", "produce", "-t", "greetings"], "no message value specified")]
    #[case::missing_both(&["racecarctl", "produce"], "no topic specified")]
    fn produce_requires_topic_then_value(#[case] argv: &[&str], #[case] expected: &str) {
        let Command::Produce(args) = parse(argv) else {
            panic!("expected produce");
        };
        let error = args.message().expect_err("message should be rejected");
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn produce_collects_key() {
        let Command::Produce(args) = parse(&[
            "racecarctl", "produce", "-t", "greetings", "-v", "hello", "-k", "user-1",
        ]) else {
            panic!("expected produce");
        };
        let message = args.message().expect("message");
        assert_eq!(message.key.as_deref(), Some("user-1"));
        assert_eq!(message.topic, "greetings");
        assert_eq!(message.value, "hello");
    }

    #[test]
    fn missing_subcommand_is_a_usage_error() {
        assert!(Cli::try_parse_from(["racecarctl"]).is_err());
    }
}
