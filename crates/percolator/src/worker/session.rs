//! Exclusive ownership of one worker process and its two channels.

use std::fmt;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::JoinHandle;

use tracing::{debug, warn};

use super::WORKER_TARGET;
use super::config::{SessionOptions, WorkerConfig};
use super::lifecycle::{self, Termination};
use super::process::{self, WorkerExit, WorkerProcess};
use super::reader::{self, ReaderEvent};
use crate::cancel::CancelHandle;
use crate::error::{PercolatorError, SpawnError};
use crate::framer;
use crate::protocol::SessionState;

/// Outcome of closing a [`WorkerSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseReport {
    exit: Option<WorkerExit>,
    killed: bool,
    faulted: bool,
    trailing_frames: usize,
}

impl CloseReport {
    /// How the worker exited, if its status could be collected.
    #[must_use]
    pub const fn exit(&self) -> Option<WorkerExit> {
        self.exit
    }

    /// Whether the worker outlived the grace period and was killed.
    #[must_use]
    pub const fn killed(&self) -> bool {
        self.killed
    }

    /// Whether the session had faulted before it was closed.
    #[must_use]
    pub const fn faulted(&self) -> bool {
        self.faulted
    }

    /// Response frames the worker emitted that no request asked for.
    #[must_use]
    pub const fn trailing_frames(&self) -> usize {
        self.trailing_frames
    }

    /// True for a zero exit after closing a healthy session.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        !self.killed
            && !self.faulted
            && self.trailing_frames == 0
            && matches!(self.exit, Some(exit) if exit.success())
    }
}

/// One spawned worker plus its request sink and response source.
///
/// The session is single-pass and single-threaded: requests and responses
/// strictly alternate through [`submit_and_await`](Self::submit_and_await).
/// Only a [`CancelHandle`] may be used from other threads. Closing is
/// idempotent and also runs on drop, so the worker is released on every exit
/// path.
pub struct WorkerSession {
    label: String,
    options: SessionOptions,
    pub(crate) state: SessionState,
    pub(crate) completed: usize,
    pub(crate) cancel: CancelHandle,
    pub(crate) output_closed: bool,
    sink: Option<BufWriter<Box<dyn Write + Send>>>,
    events: Receiver<ReaderEvent>,
    process: Option<Box<dyn WorkerProcess>>,
    reader: Option<JoinHandle<()>>,
    report: Option<CloseReport>,
}

impl WorkerSession {
    /// Spawns the worker described by `config` and opens both channels.
    ///
    /// # Errors
    ///
    /// Returns [`PercolatorError::Spawn`] when the executable is missing or
    /// cannot be started, or when it exits within the startup probe window
    /// (for example because its query file is unreadable).
    pub fn open(config: &WorkerConfig, options: SessionOptions) -> Result<Self, PercolatorError> {
        let spawned = process::spawn_worker(config)?;
        let label = worker_label(&config.command);

        if let Some(stderr) = spawned.stderr
            && let Err(error) = reader::spawn_stderr_forwarder(stderr, &label)
        {
            warn!(
                target: WORKER_TARGET,
                worker = %label,
                error = %error,
                "failed to start stderr forwarder"
            );
        }

        let mut session = Self::from_parts(
            label,
            spawned.child,
            spawned.stdin,
            spawned.stdout,
            options,
        )?;
        session.probe_startup(&config.command)?;
        Ok(session)
    }

    /// Assembles a session from an already running worker.
    ///
    /// `sink` receives request frames and `source` yields response frames.
    /// This is the seam used to run the protocol against in-process workers.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError::ReaderThread`] if the response reader thread
    /// cannot be started; the process is killed in that case.
    pub fn from_parts<P, W, R>(
        label: impl Into<String>,
        process: P,
        sink: W,
        source: R,
        options: SessionOptions,
    ) -> Result<Self, PercolatorError>
    where
        P: WorkerProcess + 'static,
        W: Write + Send + 'static,
        R: Read + Send + 'static,
    {
        let label = label.into();
        let mut process: Box<dyn WorkerProcess> = Box::new(process);
        let (sender, events) = mpsc::channel();
        let cancel = CancelHandle::new(sender.clone());

        let reader = match reader::spawn_frame_reader(source, sender, &label) {
            Ok(handle) => handle,
            Err(error) => {
                drop(process.kill());
                drop(process.wait());
                return Err(SpawnError::ReaderThread {
                    source: Arc::new(error),
                }
                .into());
            }
        };

        debug!(
            target: WORKER_TARGET,
            worker = %label,
            pid = ?process.id(),
            "worker session opened"
        );

        let sink: Box<dyn Write + Send> = Box::new(sink);
        Ok(Self {
            label,
            options,
            state: SessionState::Idle,
            completed: 0,
            cancel,
            output_closed: false,
            sink: Some(BufWriter::new(sink)),
            events,
            process: Some(process),
            reader: Some(reader),
            report: None,
        })
    }

    /// Name used for this worker in logs and thread names.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current protocol state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Requests answered so far.
    #[must_use]
    pub const fn completed(&self) -> usize {
        self.completed
    }

    /// Timing policy in effect.
    #[must_use]
    pub const fn options(&self) -> SessionOptions {
        self.options
    }

    /// OS process identifier of the worker while it is owned by the session.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.process.as_ref().and_then(|process| process.id())
    }

    /// Handle that cancels this session from another thread.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Report from the first [`close`](Self::close), if the session is closed.
    #[must_use]
    pub const fn close_report(&self) -> Option<CloseReport> {
        self.report
    }

    /// Releases the worker.
    ///
    /// Closes the request sink so the worker sees end of input, waits up to
    /// the grace period for it to exit, kills it otherwise, then drains any
    /// response frames nobody asked for. Never fails; calling it again
    /// returns the first report without touching the process.
    pub fn close(&mut self) -> CloseReport {
        if let Some(report) = self.report {
            return report;
        }

        let faulted = self.state == SessionState::Faulted;
        self.state = SessionState::Closing;
        debug!(
            target: WORKER_TARGET,
            worker = %self.label,
            completed = self.completed,
            faulted,
            "closing worker session"
        );

        self.release_request_sink();
        let termination = match self.process.take() {
            Some(mut process) => lifecycle::terminate_worker(
                process.as_mut(),
                self.options.grace_period,
                &self.label,
            ),
            None => Termination::default(),
        };
        let trailing_frames = self.drain_responses();

        if trailing_frames > 0 {
            warn!(
                target: WORKER_TARGET,
                worker = %self.label,
                trailing_frames,
                "worker emitted response frames after the last request"
            );
        }

        let report = CloseReport {
            exit: termination.exit,
            killed: termination.killed,
            faulted,
            trailing_frames,
        };
        self.state = SessionState::Closed;
        self.report = Some(report);
        report
    }

    /// Writes one request frame and flushes it to the worker.
    pub(crate) fn write_request(&mut self, line: &str) -> io::Result<()> {
        match self.sink.as_mut() {
            Some(sink) => framer::write_frame(sink, line),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "request channel already closed",
            )),
        }
    }

    /// Waits for the next reader event, bounded by the response timeout.
    pub(crate) fn next_event(&self) -> Result<ReaderEvent, RecvTimeoutError> {
        match self.options.response_timeout {
            Some(timeout) => self.events.recv_timeout(timeout),
            None => self
                .events
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        }
    }

    fn probe_startup(&mut self, command: &Path) -> Result<(), SpawnError> {
        let Some(process) = self.process.as_mut() else {
            return Ok(());
        };
        match lifecycle::wait_within(process.as_mut(), self.options.startup_probe) {
            Ok(None) => Ok(()),
            Ok(Some(exit)) => Err(SpawnError::ExitedEarly {
                command: command.display().to_string(),
                exit,
            }),
            Err(error) => Err(SpawnError::Failed {
                command: command.display().to_string(),
                source: Arc::new(error),
            }),
        }
    }

    fn release_request_sink(&mut self) {
        if let Some(mut sink) = self.sink.take()
            && let Err(error) = sink.flush()
        {
            debug!(
                target: WORKER_TARGET,
                worker = %self.label,
                error = %error,
                "failed to flush request channel on close"
            );
        }
    }

    fn drain_responses(&mut self) -> usize {
        let mut trailing = 0;
        if self.output_closed {
            trailing += self
                .events
                .try_iter()
                .filter(|event| matches!(event, ReaderEvent::Frame(_)))
                .count();
            self.join_reader();
            return trailing;
        }

        loop {
            match self.events.recv_timeout(self.options.grace_period) {
                Ok(ReaderEvent::Frame(_)) => trailing += 1,
                Ok(ReaderEvent::Cancelled) => {}
                Ok(ReaderEvent::EndOfStream | ReaderEvent::Failed(_)) => {
                    self.output_closed = true;
                    self.join_reader();
                    break;
                }
                Err(_) => {
                    debug!(
                        target: WORKER_TARGET,
                        worker = %self.label,
                        "worker output still open after close, detaching reader"
                    );
                    break;
                }
            }
        }
        trailing
    }

    fn join_reader(&mut self) {
        if let Some(handle) = self.reader.take()
            && handle.join().is_err()
        {
            warn!(
                target: WORKER_TARGET,
                worker = %self.label,
                "response reader thread panicked"
            );
        }
    }
}

impl Drop for WorkerSession {
    fn drop(&mut self) {
        if self.report.is_none() {
            self.close();
        }
    }
}

impl fmt::Debug for WorkerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerSession")
            .field("label", &self.label)
            .field("state", &self.state)
            .field("pid", &self.id())
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

fn worker_label(command: &Path) -> String {
    command
        .file_name()
        .and_then(|name| name.to_str())
        .map_or_else(|| command.display().to_string(), str::to_owned)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("/usr/local/bin/lmgrep", "lmgrep")]
    #[case("lmgrep", "lmgrep")]
    fn labels_workers_by_file_name(#[case] command: &str, #[case] expected: &str) {
        assert_eq!(worker_label(&PathBuf::from(command)), expected);
    }

    #[rstest]
    fn clean_report_requires_zero_exit() {
        let report = CloseReport {
            exit: Some(WorkerExit::from_code(0)),
            killed: false,
            faulted: false,
            trailing_frames: 0,
        };
        assert!(report.is_clean());

        let failed = CloseReport {
            exit: Some(WorkerExit::from_code(1)),
            ..report
        };
        assert!(!failed.is_clean());

        let trailing = CloseReport {
            trailing_frames: 1,
            ..report
        };
        assert!(!trailing.is_clean());
    }
}
