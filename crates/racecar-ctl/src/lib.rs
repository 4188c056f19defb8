//! `racecarctl`: status, stop, and one-off produce for a Racecar consumer.
//!
//! The control utility shares no state with the daemon beyond the pidfile.
//! `status` and `stop` read it through [`racecar_process::PidFile`]; `stop`
//! sends a single `SIGTERM` and polls until the recorded process is gone.

mod cli;
mod controller;
mod errors;
mod output;
mod produce;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use racecar_config::ConsumerConfig;
use racecar_process::telemetry::{self, TelemetrySettings};
use racecar_process::{SystemTermination, Termination};

pub use cli::{Cli, Command, PidfileArgs, ProduceArgs, StopArgs};
pub use controller::{ProcessController, StopOutcome, StopPolicy};
pub use errors::ControlError;
pub use output::ControlOutput;
pub use produce::{DeliveryError, MessageDelivery, ProduceMessage, UnconfiguredDelivery, produce};

// Command output is the interface; diagnostics stay quiet unless something
// goes wrong.
const CONTROL_LOG_FILTER: &str = "warn";

/// Parses `args` and runs the requested command with the system collaborators.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) if error.use_stderr() => {
            let _ = write!(stderr, "{}", error.render());
            return ExitCode::FAILURE;
        }
        Err(info) => {
            let _ = write!(stdout, "{}", info.render());
            return ExitCode::SUCCESS;
        }
    };
    let settings = TelemetrySettings {
        filter: CONTROL_LOG_FILTER.to_owned(),
        ..TelemetrySettings::from_config(&ConsumerConfig::default())
    };
    if let Err(error) = telemetry::initialise(&settings) {
        let _ = writeln!(stderr, "racecarctl: {error}");
        return ExitCode::FAILURE;
    }
    let mut output = ControlOutput::new(&mut *stdout, &mut *stderr);
    match execute(&cli.command, SystemTermination, &UnconfiguredDelivery, &mut output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "racecarctl: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Runs one command with explicit collaborators.
pub fn execute<T, D, W, E>(
    command: &Command,
    termination: T,
    delivery: &D,
    output: &mut ControlOutput<W, E>,
) -> Result<(), ControlError>
where
    T: Termination,
    D: MessageDelivery,
    W: Write,
    E: Write,
{
    match command {
        Command::Status(args) => {
            ProcessController::new(args.resolve()?, termination).status(output)?;
        }
        Command::Stop(args) => {
            ProcessController::new(args.pidfile.resolve()?, termination).stop(args.policy(), output)?;
        }
        Command::Produce(args) => produce(args, delivery, output)?,
    }
    Ok(())
}
