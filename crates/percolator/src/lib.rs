//! Streaming line-oriented client for an external matching worker.
//!
//! The crate feeds text lines, one at a time, into a long-running worker
//! process (such as `lmgrep`) over its standard input and reads back exactly
//! one response line per request from its standard output. The worker is
//! launched with a flag that makes it print an empty line whenever a request
//! matches nothing, which is what keeps requests and responses aligned.
//!
//! # Architecture
//!
//! - [`framer`]: newline framing for requests and responses.
//! - [`WorkerSession`]: owns the worker process and both pipes, with
//!   scoped release through [`WorkerSession::close`] and `Drop`.
//! - [`WorkerSession::submit_and_await`]: strict write-then-read alternation
//!   that classifies each response as a [`MatchResult`].
//! - [`SessionDriver`]: lazily pairs each input line with its result and
//!   surfaces faults together with the number of completed lines.
//!
//! # Worker requirements
//!
//! The worker must flush its output after every response line. A worker that
//! block-buffers standard output never answers the first request, so the
//! client can only detect the stall through the response timeout configured
//! in [`SessionOptions`].
//!
//! # Example
//!
//! ```no_run
//! use percolator::{SessionDriver, SessionOptions, WorkerConfig, WorkerSession};
//!
//! # fn main() -> Result<(), percolator::PercolatorError> {
//! let config = WorkerConfig::lmgrep("queries.json");
//! let session = WorkerSession::open(&config, SessionOptions::default())?;
//! let lines = ["The quick brown fox jumps over the lazy dog", "not matching"];
//!
//! for outcome in SessionDriver::new(session, lines) {
//!     let outcome = outcome?;
//!     println!("{} -> {:?}", outcome.input, outcome.result);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

mod cancel;
mod driver;
mod error;
pub mod framer;
mod protocol;
mod worker;

#[cfg(test)]
mod tests;

pub use cancel::CancelHandle;
pub use driver::{Outcome, Remainder, SessionDriver};
pub use error::{PercolatorError, SpawnError};
pub use percolator_config::ResponseFormat;
pub use protocol::{MatchResult, SessionState};
pub use worker::{
    CloseReport, QuerySource, SessionOptions, WorkerConfig, WorkerExit, WorkerProcess,
    WorkerSession,
};
