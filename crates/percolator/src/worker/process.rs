//! Process capability seam and real-process spawning.

use std::fmt;
use std::io;
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::Arc;

use tracing::debug;

use super::WORKER_TARGET;
use super::config::WorkerConfig;
use crate::error::SpawnError;

/// How a worker process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    code: Option<i32>,
}

impl WorkerExit {
    /// An exit with the given status code.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// A termination without a status code, such as a signal.
    #[must_use]
    pub const fn signalled() -> Self {
        Self { code: None }
    }

    /// The exit code, if the process exited normally.
    #[must_use]
    pub const fn code(self) -> Option<i32> {
        self.code
    }

    /// Whether the process exited with status zero.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self.code, Some(0))
    }
}

impl From<ExitStatus> for WorkerExit {
    fn from(status: ExitStatus) -> Self {
        status.code().map_or_else(Self::signalled, Self::from_code)
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// Operations a session needs on the worker process handle.
///
/// Implemented for [`std::process::Child`]; tests implement it for
/// in-process stubs.
pub trait WorkerProcess: Send {
    /// OS process identifier, when there is one.
    fn id(&self) -> Option<u32>;

    /// Returns the exit status if the process has exited, without blocking.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the status cannot be queried.
    fn try_wait(&mut self) -> io::Result<Option<WorkerExit>>;

    /// Forcibly terminates the process.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the process cannot be signalled.
    fn kill(&mut self) -> io::Result<()>;

    /// Blocks until the process has exited.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if waiting fails.
    fn wait(&mut self) -> io::Result<WorkerExit>;
}

impl WorkerProcess for Child {
    fn id(&self) -> Option<u32> {
        Some(Self::id(self))
    }

    fn try_wait(&mut self) -> io::Result<Option<WorkerExit>> {
        Self::try_wait(self).map(|status| status.map(WorkerExit::from))
    }

    fn kill(&mut self) -> io::Result<()> {
        Self::kill(self)
    }

    fn wait(&mut self) -> io::Result<WorkerExit> {
        Self::wait(self).map(WorkerExit::from)
    }
}

/// A freshly spawned worker with its standard streams detached.
pub(super) struct SpawnedWorker {
    pub(super) child: Child,
    pub(super) stdin: ChildStdin,
    pub(super) stdout: ChildStdout,
    pub(super) stderr: Option<ChildStderr>,
}

/// Spawns the worker process with all three standard streams piped.
pub(super) fn spawn_worker(config: &WorkerConfig) -> Result<SpawnedWorker, SpawnError> {
    let args = config.launch_args();
    let command_name = config.command.display().to_string();

    debug!(
        target: WORKER_TARGET,
        command = %command_name,
        args = ?args,
        "spawning worker process"
    );

    let mut command = Command::new(&config.command);
    command
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(dir) = &config.working_dir {
        command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|error| {
        if error.kind() == io::ErrorKind::NotFound {
            SpawnError::BinaryNotFound {
                command: command_name.clone(),
                source: Arc::new(error),
            }
        } else {
            SpawnError::Failed {
                command: command_name.clone(),
                source: Arc::new(error),
            }
        }
    })?;

    let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
        reap_unusable(&mut child);
        return Err(SpawnError::MissingPipe {
            stream: "stdio",
        });
    };
    let stderr = child.stderr.take();

    debug!(
        target: WORKER_TARGET,
        command = %command_name,
        pid = child.id(),
        "worker process spawned"
    );

    Ok(SpawnedWorker {
        child,
        stdin,
        stdout,
        stderr,
    })
}

fn reap_unusable(child: &mut Child) {
    drop(child.kill());
    drop(child.wait());
}
