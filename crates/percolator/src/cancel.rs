//! Cross-thread cancellation of a pending response read.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use crate::worker::ReaderEvent;

/// Cancels a [`WorkerSession`](crate::WorkerSession) from another thread.
///
/// Cancelling wakes a request blocked on the worker's response, which then
/// fails with [`PercolatorError::Cancelled`](crate::PercolatorError::Cancelled)
/// and leaves the session faulted. Cancelling an idle session makes its next
/// request fail the same way. The handle is cheap to clone and may outlive
/// the session.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    events: Sender<ReaderEvent>,
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub(crate) fn new(events: Sender<ReaderEvent>) -> Self {
        Self {
            events,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Requests cancellation. Repeated calls are no-ops.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        // The session may already be gone; nothing is waiting in that case.
        drop(self.events.send(ReaderEvent::Cancelled));
    }

    /// Reports whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
