//! Structured telemetry for the CLI.
//!
//! Diagnostics go to stderr through `tracing`. Provider messages are
//! collected for the result document by [`LoggedSink`], which also mirrors
//! each line into the log under [`MESSAGE_TARGET`] so a JSON log stream
//! carries the same user-facing history as the result.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use p4scc_engine::{BufferedSink, OutputSink};
use tracing::{Subscriber, info, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use p4scc_config::{Config, LogFormat};

/// Tracing target for provider messages mirrored into the log.
pub(crate) const MESSAGE_TARGET: &str = "p4scc_cli::messages";

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Output sink used by the CLI provider.
#[derive(Debug, Default)]
pub(crate) struct LoggedSink {
    buffer: BufferedSink,
}

impl LoggedSink {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the messages collected so far.
    #[must_use]
    pub(crate) fn take(&self) -> Vec<String> {
        self.buffer.take()
    }
}

impl OutputSink for LoggedSink {
    fn emit(&self, line: &str) {
        info!(target: MESSAGE_TARGET, "{line}");
        self.buffer.emit(line);
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub(crate) enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global tracing subscriber on first use.
///
/// Later calls are no-ops, so tests that drive [`crate::run`] repeatedly keep
/// the first subscriber.
pub(crate) fn initialise(config: &Config) -> Result<(), TelemetryError> {
    TELEMETRY_GUARD.get_or_try_init(|| install_subscriber(config))?;
    Ok(())
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = |env_filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            // stdout carries results; logs never mix into it.
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
