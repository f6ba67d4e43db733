//! Alignment protocol: one response frame per request frame, in order.
//!
//! The worker is launched with its empty-line flag, so every request is
//! answered by exactly one frame: an empty frame for "no match", the match
//! text (or a JSON document) otherwise. The session writes one request, then
//! blocks for one frame. There are no sequence numbers on the wire; ordering
//! rests entirely on this strict alternation. Any read or write fault leaves
//! the session [`Faulted`](SessionState::Faulted), because a lost or extra
//! frame cannot be detected, let alone repaired, after the fact.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;

use serde::de::DeserializeOwned;
use tracing::{trace, warn};

use crate::error::PercolatorError;
use crate::worker::{ReaderEvent, WorkerSession};

/// Log target for protocol exchanges.
const PROTOCOL_TARGET: &str = "percolator::protocol";

/// Protocol state of a [`WorkerSession`].
///
/// `Idle → AwaitingResponse → Idle` per line, `Idle → Closing → Closed` on
/// shutdown. A read or write fault moves straight to `Faulted`, from which
/// only closing is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ready to accept the next request.
    Idle,
    /// A request was written and its response is outstanding.
    AwaitingResponse,
    /// Shutdown is in progress.
    Closing,
    /// The worker has been released.
    Closed,
    /// Alignment was lost or the exchange broke; only `close` is legal.
    Faulted,
}

impl SessionState {
    /// Stable lowercase name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingResponse => "awaiting_response",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Faulted => "faulted",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of one response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// The worker matched the request and echoed this text.
    Matched(String),
    /// The worker answered with an empty frame.
    NoMatch,
}

impl MatchResult {
    /// Classifies a response frame. Blank frames are non-matches.
    #[must_use]
    pub fn from_frame(frame: String) -> Self {
        if frame.trim().is_empty() {
            Self::NoMatch
        } else {
            Self::Matched(frame)
        }
    }

    /// Whether the request matched at least one query.
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    /// The worker's output for a match.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Matched(text) => Some(text),
            Self::NoMatch => None,
        }
    }

    /// Consumes the result, returning the worker's output for a match.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Matched(text) => Some(text),
            Self::NoMatch => None,
        }
    }

    /// Parses the match output of a JSON-format worker.
    ///
    /// Returns `Ok(None)` for [`MatchResult::NoMatch`].
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the matched text is not a valid
    /// `T` document, e.g. because the worker runs in plain format.
    pub fn details<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.text().map(serde_json::from_str).transpose()
    }
}

impl WorkerSession {
    /// Sends `line` to the worker and waits for its response frame.
    ///
    /// Trailing line terminators are stripped before sending; an empty line
    /// is sent as a bare terminator and still receives one response. `line`
    /// must not contain embedded newlines.
    ///
    /// # Errors
    ///
    /// - [`PercolatorError::SessionUnavailable`] if the session is faulted or
    ///   closed.
    /// - [`PercolatorError::ChannelWrite`] if the request cannot be written.
    /// - [`PercolatorError::ProtocolDesync`] if the worker closes its output
    ///   or the response cannot be decoded.
    /// - [`PercolatorError::WorkerUnresponsive`] if the response timeout
    ///   elapses.
    /// - [`PercolatorError::Cancelled`] if the session was cancelled.
    ///
    /// Every error except the first leaves the session faulted.
    pub fn submit_and_await(&mut self, line: &str) -> Result<MatchResult, PercolatorError> {
        if self.state != SessionState::Idle {
            return Err(PercolatorError::SessionUnavailable { state: self.state });
        }
        if self.cancel.is_cancelled() {
            return Err(self.fault(PercolatorError::Cancelled {
                completed: self.completed,
            }));
        }

        self.state = SessionState::AwaitingResponse;
        if let Err(error) = self.write_request(line) {
            return Err(self.fault(PercolatorError::ChannelWrite {
                completed: self.completed,
                source: Arc::new(error),
            }));
        }

        match self.next_event() {
            Ok(ReaderEvent::Frame(frame)) => {
                self.completed += 1;
                self.state = SessionState::Idle;
                let result = MatchResult::from_frame(frame);
                trace!(
                    target: PROTOCOL_TARGET,
                    worker = %self.label(),
                    line = self.completed,
                    matched = result.is_match(),
                    "response received"
                );
                Ok(result)
            }
            Ok(ReaderEvent::EndOfStream) => {
                self.output_closed = true;
                Err(self.fault(PercolatorError::desync(
                    self.completed,
                    "worker closed its output before responding",
                )))
            }
            Ok(ReaderEvent::Failed(error)) => {
                self.output_closed = true;
                Err(self.fault(PercolatorError::ProtocolDesync {
                    completed: self.completed,
                    reason: "failed to read response frame".to_owned(),
                    source: Some(Arc::new(error)),
                }))
            }
            Ok(ReaderEvent::Cancelled) => Err(self.fault(PercolatorError::Cancelled {
                completed: self.completed,
            })),
            Err(RecvTimeoutError::Timeout) => {
                let timeout_ms = self
                    .options()
                    .response_timeout
                    .map_or(0, |timeout| {
                        u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
                    });
                Err(self.fault(PercolatorError::WorkerUnresponsive {
                    completed: self.completed,
                    timeout_ms,
                }))
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.output_closed = true;
                Err(self.fault(PercolatorError::desync(
                    self.completed,
                    "response reader stopped",
                )))
            }
        }
    }

    fn fault(&mut self, error: PercolatorError) -> PercolatorError {
        self.state = SessionState::Faulted;
        warn!(
            target: PROTOCOL_TARGET,
            worker = %self.label(),
            completed = self.completed,
            error = %error,
            "worker session faulted"
        );
        error
    }
}
