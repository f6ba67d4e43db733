//! Background threads draining the worker's output streams.
//!
//! Response frames are decoded on a dedicated thread and forwarded over a
//! channel, which lets the session bound each read with a timeout and lets a
//! [`CancelHandle`](crate::CancelHandle) wake a blocked read.

use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::WORKER_TARGET;
use crate::framer;

/// Events delivered from the response reader to the session.
#[derive(Debug)]
pub(crate) enum ReaderEvent {
    /// One decoded response frame.
    Frame(String),
    /// The worker closed its output.
    EndOfStream,
    /// Reading or decoding the output failed.
    Failed(io::Error),
    /// Cancellation was requested through a [`CancelHandle`](crate::CancelHandle).
    Cancelled,
}

/// Starts the thread that turns the response source into [`ReaderEvent`]s.
///
/// The thread stops after delivering a terminal event or once the session
/// has dropped its receiver.
pub(super) fn spawn_frame_reader<R>(
    source: R,
    events: Sender<ReaderEvent>,
    label: &str,
) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    let worker = label.to_owned();
    thread::Builder::new()
        .name(format!("{label}-responses"))
        .spawn(move || {
            let mut reader = BufReader::new(source);
            loop {
                let event = match framer::read_frame(&mut reader) {
                    Ok(Some(frame)) => ReaderEvent::Frame(frame),
                    Ok(None) => ReaderEvent::EndOfStream,
                    Err(error) => ReaderEvent::Failed(error),
                };
                let terminal = !matches!(event, ReaderEvent::Frame(_));
                if events.send(event).is_err() || terminal {
                    break;
                }
            }
            debug!(target: WORKER_TARGET, worker = %worker, "response reader finished");
        })
}

/// Forwards the worker's diagnostic output to the log.
///
/// Draining stderr continuously keeps a chatty worker from blocking on a
/// full pipe while the session waits for a response.
pub(super) fn spawn_stderr_forwarder<R>(stderr: R, label: &str) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    let worker = label.to_owned();
    thread::Builder::new()
        .name(format!("{label}-stderr"))
        .spawn(move || {
            for line in BufReader::new(stderr).lines() {
                match line {
                    Ok(line) if line.trim().is_empty() => {}
                    Ok(line) => warn!(
                        target: WORKER_TARGET,
                        worker = %worker,
                        stderr = %line,
                        "worker stderr output"
                    ),
                    Err(_) => break,
                }
            }
        })
}
