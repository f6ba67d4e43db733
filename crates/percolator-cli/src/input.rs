//! Input lines read on a dedicated thread.
//!
//! A read blocked on an idle terminal or pipe cannot be woken, so the run
//! waits on a channel instead and an interrupt can end the input early. The
//! reader thread is detached; it exits once the channel closes or its input
//! ends, and a read still blocked at process exit is abandoned.

use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

use tracing::debug;

use crate::CLI_TARGET;

enum InputEvent {
    Line(String),
    Finished,
    Failed(io::Error),
    Interrupted,
}

/// Lines of input in arrival order.
///
/// The iterator ends at end of input, at the first read error (kept for
/// [`take_error`](Self::take_error)) or when interrupted.
pub(crate) struct InputLines {
    events: Receiver<InputEvent>,
    error: Option<io::Error>,
    interrupted: bool,
    done: bool,
}

/// Ends an [`InputLines`] iterator from another thread.
#[derive(Clone)]
pub(crate) struct InputInterrupt {
    events: SyncSender<InputEvent>,
}

/// Starts reading `input` line by line on its own thread.
pub(crate) fn spawn<R>(input: R) -> io::Result<(InputLines, InputInterrupt)>
where
    R: Read + Send + 'static,
{
    // One queued line keeps the reader at most a line ahead of the worker.
    let (sender, events) = mpsc::sync_channel(1);
    let interrupt = InputInterrupt {
        events: sender.clone(),
    };
    thread::Builder::new()
        .name("percolate-input".to_owned())
        .spawn(move || forward_lines(BufReader::new(input), &sender))?;
    let lines = InputLines {
        events,
        error: None,
        interrupted: false,
        done: false,
    };
    Ok((lines, interrupt))
}

fn forward_lines<R: BufRead>(input: R, sender: &SyncSender<InputEvent>) {
    for line in input.lines() {
        let event = match line {
            Ok(line) => InputEvent::Line(line),
            Err(error) => {
                drop(sender.send(InputEvent::Failed(error)));
                return;
            }
        };
        if sender.send(event).is_err() {
            debug!(target: CLI_TARGET, "input no longer consumed, reader stopping");
            return;
        }
    }
    drop(sender.send(InputEvent::Finished));
}

impl InputLines {
    /// The read error that ended the input, if any.
    pub(crate) fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    /// Whether the input was ended by an interrupt rather than running out.
    pub(crate) const fn interrupted(&self) -> bool {
        self.interrupted
    }
}

impl Iterator for InputLines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        match self.events.recv() {
            Ok(InputEvent::Line(line)) => return Some(line),
            Ok(InputEvent::Failed(error)) => self.error = Some(error),
            Ok(InputEvent::Interrupted) => self.interrupted = true,
            Ok(InputEvent::Finished) | Err(_) => {}
        }
        self.done = true;
        None
    }
}

impl InputInterrupt {
    /// Ends the input. A line already queued is delivered first.
    pub(crate) fn interrupt(&self) {
        // A full channel already holds a line that will wake the consumer.
        drop(self.events.try_send(InputEvent::Interrupted));
    }
}
