//! Line-oriented output handle so commands stay agnostic of concrete writers.

use std::fmt;
use std::io::Write;

use crate::errors::ControlError;

/// Stdout and stderr writers for one command.
pub struct ControlOutput<W: Write, E: Write> {
    stdout: W,
    stderr: E,
}

impl<W: Write, E: Write> ControlOutput<W, E> {
    /// Wraps the two writers.
    #[must_use]
    pub const fn new(stdout: W, stderr: E) -> Self {
        Self { stdout, stderr }
    }

    /// Writes one line to stdout and flushes it.
    pub fn stdout_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), ControlError> {
        write_line(&mut self.stdout, args)
    }

    /// Writes one line to stderr and flushes it.
    pub fn stderr_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), ControlError> {
        write_line(&mut self.stderr, args)
    }
}

fn write_line<T: Write>(target: &mut T, args: fmt::Arguments<'_>) -> Result<(), ControlError> {
    target.write_fmt(args).map_err(ControlError::Io)?;
    target.write_all(b"\n").map_err(ControlError::Io)?;
    target.flush().map_err(ControlError::Io)
}
