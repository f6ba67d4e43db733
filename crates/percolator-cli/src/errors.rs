//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use percolator::PercolatorError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Session(#[from] PercolatorError),
    #[error("failed to start input reader: {0}")]
    StartInput(io::Error),
    #[error("failed to read input line {line}: {source}")]
    ReadInput { line: usize, source: io::Error },
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
}

/// A run that stopped early, with the number of lines answered before it.
#[derive(Debug)]
pub(crate) struct Interrupted {
    pub(crate) error: AppError,
    pub(crate) completed: usize,
}

impl Interrupted {
    pub(crate) const fn new(error: AppError, completed: usize) -> Self {
        Self { error, completed }
    }
}
