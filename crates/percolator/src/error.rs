//! Error taxonomy for worker sessions.
//!
//! Faults raised while a session is running carry the number of lines that
//! completed before the fault so callers can resume on a fresh session.
//! I/O errors are wrapped in `Arc` to keep the error type cheap to move.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::protocol::SessionState;
use crate::worker::WorkerExit;

/// Reasons a worker process could not be started.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The worker executable was not found.
    #[error("worker binary not found: {command}")]
    BinaryNotFound {
        /// The command that was not found.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The operating system refused to start the worker.
    #[error("failed to spawn worker '{command}': {source}")]
    Failed {
        /// The command that failed to start.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The worker exited before the startup probe window elapsed.
    #[error("worker '{command}' exited during startup ({exit})")]
    ExitedEarly {
        /// The command that exited.
        command: String,
        /// How the worker exited.
        exit: WorkerExit,
    },

    /// One of the worker's standard streams could not be captured.
    #[error("failed to capture worker {stream}")]
    MissingPipe {
        /// Name of the missing stream.
        stream: &'static str,
    },

    /// The thread decoding response frames could not be started.
    #[error("failed to start response reader thread: {source}")]
    ReaderThread {
        /// The underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// Errors surfaced by worker sessions and the session driver.
#[derive(Debug, Error)]
pub enum PercolatorError {
    /// The worker process could not be started.
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// The response stream ended or broke while a request was outstanding.
    #[error("worker response stream desynchronised after {completed} lines: {reason}")]
    ProtocolDesync {
        /// Lines answered before the fault.
        completed: usize,
        /// What went wrong on the response channel.
        reason: String,
        /// The underlying I/O error, when one was reported.
        #[source]
        source: Option<Arc<io::Error>>,
    },

    /// No response arrived within the configured timeout.
    #[error("worker did not respond within {timeout_ms}ms after {completed} lines")]
    WorkerUnresponsive {
        /// Lines answered before the fault.
        completed: usize,
        /// The timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// Writing a request to the worker failed.
    #[error("failed to write request to worker after {completed} lines: {source}")]
    ChannelWrite {
        /// Lines answered before the fault.
        completed: usize,
        /// The underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The session was cancelled from another thread.
    #[error("session cancelled after {completed} lines")]
    Cancelled {
        /// Lines answered before the cancellation.
        completed: usize,
    },

    /// A request was submitted to a session that can no longer accept one.
    #[error("session cannot accept requests while {state}")]
    SessionUnavailable {
        /// The state the session was in.
        state: SessionState,
    },
}

impl PercolatorError {
    /// Number of lines completed before an in-session fault.
    ///
    /// Returns `None` for spawn failures and usage errors, which happen
    /// outside a running exchange.
    #[must_use]
    pub const fn completed(&self) -> Option<usize> {
        match self {
            Self::ProtocolDesync { completed, .. }
            | Self::WorkerUnresponsive { completed, .. }
            | Self::ChannelWrite { completed, .. }
            | Self::Cancelled { completed } => Some(*completed),
            Self::Spawn(_) | Self::SessionUnavailable { .. } => None,
        }
    }

    pub(crate) fn desync(completed: usize, reason: impl Into<String>) -> Self {
        Self::ProtocolDesync {
            completed,
            reason: reason.into(),
            source: None,
        }
    }
}
