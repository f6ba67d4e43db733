//! In-process worker doubles for session and driver tests.
//!
//! A [`StubWorker`] runs on a thread and talks to the session through a pair
//! of anonymous pipes, so the protocol sees real blocking byte streams and
//! real end-of-stream conditions without spawning an executable.

use std::io::{self, BufReader, PipeReader, PipeWriter, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::framer;
use crate::worker::{SessionOptions, WorkerExit, WorkerProcess, WorkerSession};

/// How the stub reacts to one request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubReply {
    /// Answer with this frame.
    Line(String),
    /// Say nothing and wait for the next request.
    Silence,
    /// Close the response channel and stop answering.
    Exit,
}

type Responder = Box<dyn FnMut(&str) -> StubReply + Send>;

/// Observations shared between a stub worker and the test.
#[derive(Debug, Default)]
pub struct StubProbe {
    requests: Mutex<Vec<String>>,
    kills: AtomicUsize,
    killed: AtomicBool,
}

impl StubProbe {
    /// Request lines received by the stub, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of times the session asked the stub to die.
    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    fn record(&self, line: &str) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_owned());
    }

    fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }
}

/// Builder for an in-process worker.
pub struct StubWorker {
    respond: Responder,
    trailing: Vec<String>,
    linger: Duration,
    exit_code: i32,
    deaf: bool,
}

impl StubWorker {
    /// A worker answering each request with `respond`.
    pub fn new(respond: impl FnMut(&str) -> StubReply + Send + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            trailing: Vec::new(),
            linger: Duration::ZERO,
            exit_code: 0,
            deaf: false,
        }
    }

    /// Answers the matched substring when the line contains `needle`,
    /// otherwise an empty frame.
    pub fn matching(needle: &str) -> Self {
        let needle = needle.to_owned();
        Self::new(move |line| {
            if line.contains(&needle) {
                StubReply::Line(needle.clone())
            } else {
                StubReply::Line(String::new())
            }
        })
    }

    /// Answers every request with the request text itself.
    pub fn echoing() -> Self {
        Self::new(|line| StubReply::Line(line.to_owned()))
    }

    /// Answers `count` requests with `MATCH`, then closes its output.
    pub fn answering(count: usize) -> Self {
        let mut answered = 0;
        Self::new(move |_| {
            if answered == count {
                return StubReply::Exit;
            }
            answered += 1;
            StubReply::Line("MATCH".to_owned())
        })
    }

    /// Answers `count` requests, then stops responding without exiting.
    pub fn stalling_after(count: usize) -> Self {
        let mut answered = 0;
        Self::new(move |_| {
            if answered == count {
                return StubReply::Silence;
            }
            answered += 1;
            StubReply::Line(String::new())
        })
    }

    /// Closes its input before the first request arrives.
    pub fn deaf() -> Self {
        Self {
            deaf: true,
            ..Self::new(|_| StubReply::Silence)
        }
    }

    /// Frames emitted after input ends, before exiting.
    pub fn with_trailing(mut self, frames: &[&str]) -> Self {
        self.trailing = frames.iter().map(|frame| (*frame).to_owned()).collect();
        self
    }

    /// Keeps running for `linger` after input ends unless killed.
    pub const fn lingering(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }

    /// Exit code reported once the stub finishes on its own.
    pub const fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Starts the stub and attaches a session to it.
    pub fn start(self, options: SessionOptions) -> (WorkerSession, Arc<StubProbe>) {
        let (request_reader, request_writer) = io::pipe().expect("request pipe");
        let (response_reader, response_writer) = io::pipe().expect("response pipe");
        let probe = Arc::new(StubProbe::default());

        let request_reader = if self.deaf {
            drop(request_reader);
            None
        } else {
            Some(request_reader)
        };

        let thread_probe = Arc::clone(&probe);
        let thread = thread::Builder::new()
            .name("stub-worker".to_owned())
            .spawn(move || self.run(request_reader, response_writer, &thread_probe))
            .expect("stub worker thread");

        let process = StubProcess {
            thread: Some(thread),
            exit: None,
            probe: Arc::clone(&probe),
        };
        let session = WorkerSession::from_parts(
            "stub",
            process,
            request_writer,
            response_reader,
            options,
        )
        .expect("session over stub worker");
        (session, probe)
    }

    fn run(
        mut self,
        requests: Option<PipeReader>,
        responses: PipeWriter,
        probe: &StubProbe,
    ) -> i32 {
        let Some(requests) = requests else {
            drop(responses);
            return self.exit_code;
        };
        let mut requests = BufReader::new(requests);
        let mut responses = Some(responses);

        while let Ok(Some(line)) = framer::read_frame(&mut requests) {
            probe.record(&line);
            let Some(writer) = responses.as_mut() else {
                continue;
            };
            match (self.respond)(&line) {
                StubReply::Line(frame) => {
                    if framer::write_frame(writer, &frame).is_err() {
                        responses = None;
                    }
                }
                StubReply::Silence => {}
                StubReply::Exit => responses = None,
            }
        }

        if let Some(writer) = responses.as_mut() {
            for frame in &self.trailing {
                drop(framer::write_frame(writer, frame));
            }
            drop(writer.flush());
        }
        drop(responses);

        let deadline = Instant::now() + self.linger;
        while Instant::now() < deadline && !probe.is_killed() {
            thread::sleep(Duration::from_millis(5));
        }
        self.exit_code
    }
}

/// Process handle backed by the stub's thread.
struct StubProcess {
    thread: Option<JoinHandle<i32>>,
    exit: Option<WorkerExit>,
    probe: Arc<StubProbe>,
}

impl StubProcess {
    fn reap(&mut self) -> WorkerExit {
        if let Some(exit) = self.exit {
            return exit;
        }
        let code = self
            .thread
            .take()
            .map(|thread| thread.join().expect("stub worker panicked"));
        let exit = match code {
            Some(_) if self.probe.is_killed() => WorkerExit::signalled(),
            Some(code) => WorkerExit::from_code(code),
            None => WorkerExit::signalled(),
        };
        self.exit = Some(exit);
        exit
    }
}

impl WorkerProcess for StubProcess {
    fn id(&self) -> Option<u32> {
        None
    }

    fn try_wait(&mut self) -> io::Result<Option<WorkerExit>> {
        let finished = self
            .thread
            .as_ref()
            .is_none_or(JoinHandle::is_finished);
        Ok(finished.then(|| self.reap()))
    }

    fn kill(&mut self) -> io::Result<()> {
        self.probe.kills.fetch_add(1, Ordering::SeqCst);
        self.probe.killed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn wait(&mut self) -> io::Result<WorkerExit> {
        Ok(self.reap())
    }
}

/// Session options with short windows suitable for tests.
pub fn quick_options() -> SessionOptions {
    SessionOptions::default()
        .with_response_timeout(Some(Duration::from_secs(5)))
        .with_grace_period(Duration::from_millis(500))
        .with_startup_probe(Duration::ZERO)
}
