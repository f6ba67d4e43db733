//! Session driver: pairs each input line with its match result.

use std::iter::{Chain, FusedIterator};

use tracing::{debug, warn};

use crate::cancel::CancelHandle;
use crate::error::PercolatorError;
use crate::protocol::MatchResult;
use crate::worker::{CloseReport, SessionOptions, WorkerConfig, WorkerSession};

/// Log target for driver progress.
const DRIVER_TARGET: &str = "percolator::driver";

/// Unprocessed input left after a fault: the failed line, then the rest.
pub type Remainder<I> = Chain<std::option::IntoIter<<I as Iterator>::Item>, I>;

/// An input line together with the worker's verdict on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<S> {
    /// The line as supplied by the caller.
    pub input: S,
    /// How the worker classified it.
    pub result: MatchResult,
}

/// Lazily submits input lines to a session, in order.
///
/// Yields one `Ok(Outcome)` per line. The first fault is yielded as `Err`,
/// after which the iterator is exhausted; the error carries the number of
/// lines completed before it. The session is closed as soon as the input
/// runs out or a fault occurs. A driver consumes its session: to retry, open
/// a new session and feed it [`into_remainder`](Self::into_remainder).
pub struct SessionDriver<I: Iterator> {
    session: WorkerSession,
    lines: I,
    failed: Option<I::Item>,
    finished: bool,
}

impl<I> SessionDriver<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    /// Drives `lines` through an already open session.
    pub fn new<L>(session: WorkerSession, lines: L) -> Self
    where
        L: IntoIterator<IntoIter = I>,
    {
        Self {
            session,
            lines: lines.into_iter(),
            failed: None,
            finished: false,
        }
    }

    /// Spawns a worker and drives `lines` through it.
    ///
    /// # Errors
    ///
    /// Returns [`PercolatorError::Spawn`] if the worker cannot be started.
    pub fn open<L>(
        config: &WorkerConfig,
        options: SessionOptions,
        lines: L,
    ) -> Result<Self, PercolatorError>
    where
        L: IntoIterator<IntoIter = I>,
    {
        let session = WorkerSession::open(config, options)?;
        Ok(Self::new(session, lines))
    }

    /// Lines answered so far.
    #[must_use]
    pub const fn completed(&self) -> usize {
        self.session.completed()
    }

    /// Handle that cancels the underlying session from another thread.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.session.cancel_handle()
    }

    /// Report produced when the driver closed its session.
    #[must_use]
    pub const fn close_report(&self) -> Option<CloseReport> {
        self.session.close_report()
    }

    /// Closes the session now, even if input remains.
    pub fn close(&mut self) -> CloseReport {
        self.finished = true;
        self.session.close()
    }

    /// Consumes the driver, returning input that was never answered.
    ///
    /// After a fault this starts with the line that failed. The session is
    /// closed before the remainder is returned.
    pub fn into_remainder(self) -> Remainder<I> {
        let Self {
            mut session,
            lines,
            failed,
            ..
        } = self;
        session.close();
        failed.into_iter().chain(lines)
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let report = self.session.close();
        if report.is_clean() {
            debug!(
                target: DRIVER_TARGET,
                worker = %self.session.label(),
                completed = self.session.completed(),
                "session finished"
            );
        } else {
            warn!(
                target: DRIVER_TARGET,
                worker = %self.session.label(),
                completed = self.session.completed(),
                exit = ?report.exit(),
                killed = report.killed(),
                faulted = report.faulted(),
                trailing_frames = report.trailing_frames(),
                "session finished uncleanly"
            );
        }
    }
}

impl<I> Iterator for SessionDriver<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = Result<Outcome<I::Item>, PercolatorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let Some(line) = self.lines.next() else {
            self.finish();
            return None;
        };

        match self.session.submit_and_await(line.as_ref()) {
            Ok(result) => Some(Ok(Outcome {
                input: line,
                result,
            })),
            Err(error) => {
                self.failed = Some(line);
                self.finish();
                Some(Err(error))
            }
        }
    }
}

impl<I> FusedIterator for SessionDriver<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
}

impl<I: Iterator> std::fmt::Debug for SessionDriver<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionDriver")
            .field("session", &self.session)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
