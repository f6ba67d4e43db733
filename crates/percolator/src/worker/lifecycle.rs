//! Worker termination with a grace period.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::WORKER_TARGET;
use super::process::{WorkerExit, WorkerProcess};

/// Interval between exit-status polls while waiting for the worker.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How a worker ended once the session released it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct Termination {
    pub(super) exit: Option<WorkerExit>,
    pub(super) killed: bool,
}

/// Polls the worker until it exits or `window` elapses.
///
/// A zero window performs a single non-blocking check.
pub(super) fn wait_within(
    process: &mut dyn WorkerProcess,
    window: Duration,
) -> io::Result<Option<WorkerExit>> {
    let deadline = Instant::now() + window;
    loop {
        if let Some(exit) = process.try_wait()? {
            return Ok(Some(exit));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Waits up to `grace` for the worker to exit, then kills it.
///
/// The caller must have closed the worker's input first so a well-behaved
/// worker sees end of input and exits on its own.
pub(super) fn terminate_worker(
    process: &mut dyn WorkerProcess,
    grace: Duration,
    label: &str,
) -> Termination {
    match wait_within(process, grace) {
        Ok(Some(exit)) => {
            debug!(
                target: WORKER_TARGET,
                worker = label,
                %exit,
                "worker exited"
            );
            Termination {
                exit: Some(exit),
                killed: false,
            }
        }
        Ok(None) => {
            warn!(
                target: WORKER_TARGET,
                worker = label,
                grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                "worker did not exit within grace period, killing"
            );
            kill_and_reap(process, label)
        }
        Err(error) => {
            warn!(
                target: WORKER_TARGET,
                worker = label,
                error = %error,
                "failed to check worker status, killing"
            );
            kill_and_reap(process, label)
        }
    }
}

fn kill_and_reap(process: &mut dyn WorkerProcess, label: &str) -> Termination {
    if let Err(error) = process.kill() {
        warn!(
            target: WORKER_TARGET,
            worker = label,
            error = %error,
            "failed to kill worker"
        );
    }
    let exit = match process.wait() {
        Ok(exit) => Some(exit),
        Err(error) => {
            warn!(
                target: WORKER_TARGET,
                worker = label,
                error = %error,
                "failed to reap worker"
            );
            None
        }
    };
    Termination { exit, killed: true }
}
