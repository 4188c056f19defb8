//! Command-line surface of the `racecar` launcher.

use std::path::PathBuf;

use clap::Parser;
use racecar_config::ConfigArgs;

/// Starts a Racecar consumer in the foreground or as a background daemon.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "racecar", version, about)]
pub struct Cli {
    /// Detach from the terminal and run in the background.
    #[arg(short = 'd', long)]
    pub daemonize: bool,
    /// Pidfile written by the daemon.
    #[arg(long, value_name = "PATH", env = "RACECAR_PIDFILE")]
    pub pidfile: Option<PathBuf>,
    /// Log file; daemon output is discarded without one.
    #[arg(short = 'l', long = "log", value_name = "LOGFILE")]
    pub log: Option<PathBuf>,
    /// Configuration file and overrides.
    #[command(flatten)]
    pub config: ConfigArgs,
    /// Registered name of the consumer to start.
    #[arg(value_name = "CONSUMER")]
    pub consumer: Option<String>,
}
