//! Sequences a consumer launch from parsed arguments to shutdown.

use std::fmt;
use std::io::{self, IsTerminal, Write};

use racecar_config::{ConsumerConfig, LifecycleConfig};
use racecar_process::telemetry::{self, LogSink, TelemetrySettings};
use racecar_process::{
    Daemon, Daemonizer, OutputRedirector, PidFile, PlatformDaemonizer, SystemOutputRedirector,
    SystemShutdownSignal,
};
use tracing::{error, info};

use crate::cli::Cli;
use crate::consumer::{Consumer, ConsumerRegistry};
use crate::errors::LaunchError;
use crate::runtime::{ConsumerRuntime, SignalRuntime};

const LAUNCH_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::launch");

/// Launcher wired with the production collaborators.
pub type SystemLauncher =
    Launcher<PlatformDaemonizer, SystemOutputRedirector, SignalRuntime<SystemShutdownSignal>>;

/// Starts a registered consumer, optionally as a daemon.
pub struct Launcher<D, O, R> {
    registry: ConsumerRegistry,
    daemonizer: D,
    redirector: O,
    runtime: R,
}

impl SystemLauncher {
    /// Uses platform daemonisation, descriptor redirection, and signal waiting.
    #[must_use]
    pub fn system(registry: ConsumerRegistry) -> Self {
        Self::new(
            registry,
            PlatformDaemonizer::default(),
            SystemOutputRedirector::new(),
            SignalRuntime::new(SystemShutdownSignal::new()),
        )
    }
}

impl<D, O, R> Launcher<D, O, R>
where
    D: Daemonizer,
    O: OutputRedirector,
    R: ConsumerRuntime,
{
    /// Builds a launcher from explicit collaborators.
    #[must_use]
    pub const fn new(registry: ConsumerRegistry, daemonizer: D, redirector: O, runtime: R) -> Self {
        Self {
            registry,
            daemonizer,
            redirector,
            runtime,
        }
    }

    /// Runs the consumer named in `cli` until it shuts down.
    ///
    /// Banner lines go to `out`. Every failure before detaching leaves the
    /// pidfile untouched and is returned while the terminal is attached. A
    /// resumed detached child only prints the lines that follow detaching.
    pub fn launch<W: Write>(self, cli: &Cli, out: &mut W) -> Result<(), LaunchError> {
        let Self {
            registry,
            daemonizer,
            redirector,
            runtime,
        } = self;
        let mut banner = Banner {
            out,
            muted: daemonizer.resumed(),
        };
        let name = cli.consumer.as_deref().ok_or(LaunchError::MissingArgument)?;
        banner.line(format_args!("=> Starting Racecar consumer {name}..."))?;

        let mut config = cli.config.load()?;
        let definition = registry.lookup(name)?;
        config.load_consumer(definition.spec());
        config.validate()?;
        let lifecycle = lifecycle_for(cli, &config)?;
        telemetry::initialise(&telemetry_settings(&config, &lifecycle))?;
        info!(
            target: LAUNCH_TARGET,
            consumer = name,
            daemonize = lifecycle.daemonize(),
            pidfile = %lifecycle.pidfile().display(),
            "launching consumer"
        );

        if let Some(logfile) = lifecycle.logfile() {
            banner.line(format_args!("=> Logging to {}", logfile.display()))?;
        }
        banner.line(format_args!("=> Wrooooom!"))?;

        let consumer = definition.instantiate();
        if lifecycle.daemonize() {
            let daemon = Daemon::new(PidFile::new(lifecycle.pidfile()), daemonizer, redirector);
            run_detached(daemon, &runtime, consumer, &config, &lifecycle, &mut banner)?;
        } else {
            banner.line(format_args!("=> Ctrl-C to shutdown consumer"))?;
            runtime.run(consumer, &config)?;
        }
        banner.line(format_args!("=> Shut down"))
    }
}

fn run_detached<D, O, R, W>(
    mut daemon: Daemon<D, O>,
    runtime: &R,
    consumer: Box<dyn Consumer>,
    config: &ConsumerConfig,
    lifecycle: &LifecycleConfig,
    banner: &mut Banner<'_, W>,
) -> Result<(), LaunchError>
where
    D: Daemonizer,
    O: OutputRedirector,
    R: ConsumerRuntime,
    W: Write,
{
    daemon.check_not_already_running()?;
    daemon.prepare_output_redirection(&lifecycle.output_target())?;
    banner.line(format_args!("=> Starting background process"))?;
    banner.line(format_args!(
        "=> Writing PID to {}",
        lifecycle.pidfile().display()
    ))?;
    daemon.detach(lifecycle)?;
    banner.muted = false;

    let outcome = daemon
        .apply_output_redirection(&lifecycle.output_target())
        .map_err(LaunchError::from)
        .and_then(|()| daemon.persist_pid().map_err(LaunchError::from))
        .and_then(|guard| {
            let result = runtime.run(consumer, config);
            drop(guard);
            result
        });
    if let Err(failure) = &outcome {
        error!(target: LAUNCH_TARGET, error = %failure, "daemon exiting after failure");
    }
    outcome
}

fn lifecycle_for(cli: &Cli, config: &ConsumerConfig) -> Result<LifecycleConfig, LaunchError> {
    let mut lifecycle = LifecycleConfig::from_consumer_config(config, cli.daemonize);
    if let Some(pidfile) = &cli.pidfile {
        lifecycle = lifecycle.with_pidfile(pidfile.clone());
    }
    if let Some(logfile) = &cli.log {
        lifecycle = lifecycle.with_logfile(logfile.clone());
    }
    Ok(lifecycle.resolve()?)
}

// A daemon logs to fd 2, which points at the log file once redirected.
fn telemetry_settings(config: &ConsumerConfig, lifecycle: &LifecycleConfig) -> TelemetrySettings {
    let foreground = !lifecycle.daemonize();
    let sink = match lifecycle.logfile() {
        Some(path) if foreground => LogSink::File(path.to_path_buf()),
        _ => LogSink::Stderr,
    };
    let ansi = foreground && sink == LogSink::Stderr && io::stderr().is_terminal();
    TelemetrySettings::from_config(config)
        .with_sink(sink)
        .with_ansi(ansi)
}

// Muted lines were already printed by the parent of a resumed child.
struct Banner<'a, W> {
    out: &'a mut W,
    muted: bool,
}

impl<W: Write> Banner<'_, W> {
    fn line(&mut self, line: fmt::Arguments<'_>) -> Result<(), LaunchError> {
        if self.muted {
            return Ok(());
        }
        self.out.write_fmt(line).map_err(LaunchError::Output)?;
        self.out.write_all(b"\n").map_err(LaunchError::Output)?;
        self.out.flush().map_err(LaunchError::Output)
    }
}
