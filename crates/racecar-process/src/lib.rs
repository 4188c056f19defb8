//! Process lifecycle primitives shared by `racecar` and `racecarctl`.
//!
//! The launcher and the control utility never share memory. They agree on
//! a pidfile written once by the detached daemon and on POSIX signal
//! delivery. This crate owns both sides of that contract.
//!
//! - [`pidfile`] reads, writes, and probes the recorded process.
//! - [`daemonizer`] detaches from the terminal and sequences the startup
//!   steps around it.
//! - [`redirect`] points stdout and stderr away from the terminal.
//! - [`signal`] delivers the graceful termination request.
//! - [`shutdown`] waits for that request inside the daemon.
//! - [`telemetry`] installs the `tracing` subscriber.

pub mod daemonizer;
mod files;
pub mod pidfile;
pub mod redirect;
pub mod shutdown;
pub mod signal;
pub mod telemetry;

pub use daemonizer::{Daemon, DaemonizeError, Daemonizer, PlatformDaemonizer, SpawnDaemonizer};
pub use pidfile::{PidFile, PidFileError, PidFileGuard, ProcessRunState, process_alive};
pub use redirect::{OutputRedirector, RedirectError, SystemOutputRedirector};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};
pub use signal::{SignalError, SystemTermination, Termination};
pub use telemetry::{LogSink, TelemetryError, TelemetryHandle, TelemetrySettings};
