//! Worker handle: process lifecycle and the two byte-stream channels.
//!
//! A [`WorkerSession`] exclusively owns one spawned worker, its request sink
//! (the worker's standard input) and its response source (the worker's
//! standard output). Sessions are assembled from a [`WorkerProcess`] plus any
//! `Write`/`Read` pair, so tests can drive the protocol against in-process
//! stubs instead of real executables.
//!
//! - [`WorkerConfig`] and [`QuerySource`]: launch description
//! - [`SessionOptions`]: timeouts applied by the session
//! - [`WorkerProcess`] and [`WorkerExit`]: the process capability seam
//! - [`CloseReport`]: outcome of the idempotent shutdown

mod config;
mod lifecycle;
mod process;
mod reader;
mod session;

pub use config::{QuerySource, SessionOptions, WorkerConfig};
pub use process::{WorkerExit, WorkerProcess};
pub(crate) use reader::ReaderEvent;
pub use session::{CloseReport, WorkerSession};

/// Log target for worker lifecycle operations.
pub(crate) const WORKER_TARGET: &str = "percolator::worker";
