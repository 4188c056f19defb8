//! The `racecar` launcher.
//!
//! Resolves a consumer from the [`ConsumerRegistry`], loads and validates
//! its configuration, then either runs it attached to the terminal or
//! detaches into the background first. Daemonised launches record their pid
//! through [`racecar_process::PidFile`] so `racecarctl` can find them.

mod cli;
mod consumer;
mod errors;
mod launch;
mod runtime;
#[cfg(test)]
mod tests;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

pub use cli::Cli;
pub use consumer::{
    Consumer, ConsumerDefinition, ConsumerError, ConsumerFactory, ConsumerRegistry, EchoConsumer,
    LookupError,
};
pub use errors::LaunchError;
pub use launch::{Launcher, SystemLauncher};
pub use runtime::{ConsumerRuntime, SignalRuntime};

/// Parses `args` and launches a built-in consumer.
///
/// Help and version output go to `stdout`; banners and errors go to
/// `stderr`.
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
    match SystemLauncher::system(ConsumerRegistry::builtin()).launch(&cli, stderr) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "racecar: {error}");
            ExitCode::FAILURE
        }
    }
}
