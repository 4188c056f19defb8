//! Structured telemetry initialisation for the launcher.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use racecar_config::{ConsumerConfig, LogFormat};
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to open the log file.
    #[error("failed to open log file '{path}': {source}")]
    Sink {
        /// Log file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Destination for log events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    /// Whatever file descriptor 2 points at when the event is written.
    ///
    /// Daemons log here: after redirection the descriptor is the log file.
    Stderr,
    /// Appends to a file while the terminal keeps stderr.
    File(PathBuf),
}

/// Inputs for [`initialise`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    /// Filter expression in `EnvFilter` syntax.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
    /// Event destination.
    pub sink: LogSink,
    /// Whether to emit ANSI colour codes.
    pub ansi: bool,
}

impl TelemetrySettings {
    /// Uses the filter and format from loaded configuration, logging to stderr.
    #[must_use]
    pub fn from_config(config: &ConsumerConfig) -> Self {
        Self {
            filter: config.log_filter.clone(),
            format: config.log_format,
            sink: LogSink::Stderr,
            ansi: false,
        }
    }

    /// Replaces the sink.
    #[must_use]
    pub fn with_sink(mut self, sink: LogSink) -> Self {
        self.sink = sink;
        self
    }

    /// Enables or disables colour output.
    #[must_use]
    pub const fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent: the first invocation installs the global
/// subscriber and later ones return a fresh [`TelemetryHandle`] without
/// touching the global state again.
pub fn initialise(settings: &TelemetrySettings) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(settings))
        .map(|()| TelemetryHandle)
}

fn install_subscriber(settings: &TelemetrySettings) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&settings.filter)
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;
    let writer = make_writer(&settings.sink)?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(writer)
        .with_ansi(settings.ansi)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match settings.format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

fn make_writer(sink: &LogSink) -> Result<BoxMakeWriter, TelemetryError> {
    match sink {
        LogSink::Stderr => Ok(BoxMakeWriter::new(io::stderr)),
        LogSink::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| TelemetryError::Sink {
                    path: path.clone(),
                    source,
                })?;
            Ok(BoxMakeWriter::new(Mutex::new(file)))
        }
    }
}
