//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to resolve the working directory: {0}")]
    WorkingDirectory(io::Error),
    #[error("failed to serialise command result: {0}")]
    SerialiseResult(serde_json::Error),
    #[error("failed to write command result: {0}")]
    WriteResult(io::Error),
}
