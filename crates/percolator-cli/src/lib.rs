//! Command-line runtime for `percolate`.
//!
//! Lines read from standard input are submitted one at a time to a matching
//! worker, and each verdict is written to standard output as soon as it
//! arrives. The runtime is exercised both from the binary entrypoint and from
//! tests, where configuration loading, worker launching and the IO streams
//! are substituted.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::process::ExitCode;

use percolator::{
    CancelHandle, PercolatorError, SessionDriver, SessionOptions, WorkerConfig, WorkerSession,
};
use percolator_config::Config;
use tracing::{debug, warn};

mod config;
mod errors;
mod input;
mod output;
mod signals;
mod telemetry;

#[cfg(test)]
mod tests;

pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::{AppError, Interrupted};
use input::InputInterrupt;
use signals::SignalGuard;

/// Log target for CLI progress.
pub(crate) const CLI_TARGET: &str = "percolator_cli";

/// Starts the worker session for a run.
pub(crate) trait WorkerLauncher {
    fn launch(&self, config: &Config) -> Result<WorkerSession, PercolatorError>;
}

/// Spawns the configured worker executable.
pub(crate) struct ProcessLauncher;

impl WorkerLauncher for ProcessLauncher {
    fn launch(&self, config: &Config) -> Result<WorkerSession, PercolatorError> {
        WorkerSession::open(
            &WorkerConfig::from_config(config),
            SessionOptions::from_config(config),
        )
    }
}

/// Runs the CLI using the provided arguments and IO handles.
///
/// Returns success once every input line has been answered. Any failure,
/// including an interrupt, is written to `stderr` together with the number
/// of lines completed before it. `input` is read on a separate thread.
#[must_use]
pub fn run<I, R, W, E>(args: I, input: R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: Read + Send + 'static,
    W: Write,
    E: Write,
{
    run_with(
        args,
        input,
        stdout,
        stderr,
        &OrthoConfigLoader,
        &ProcessLauncher,
    )
}

/// Runs the CLI with a custom configuration loader and worker launcher.
pub(crate) fn run_with<I, R, W, E, L, S>(
    args: I,
    input: R,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
    launcher: &S,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: Read + Send + 'static,
    W: Write,
    E: Write,
    L: ConfigLoader,
    S: WorkerLauncher,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let result = loader
        .load(&args)
        .and_then(|config| {
            telemetry::initialise(&config)?;
            Ok(config)
        })
        .map_err(|error| Interrupted::new(error, 0))
        .and_then(|config| percolate(&config, launcher, input, stdout));

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(Interrupted { error, completed }) => {
            drop(writeln!(stderr, "{error}"));
            drop(writeln!(stderr, "lines completed: {completed}"));
            ExitCode::FAILURE
        }
    }
}

fn percolate<S, R, W>(
    config: &Config,
    launcher: &S,
    input: R,
    stdout: &mut W,
) -> Result<usize, Interrupted>
where
    S: WorkerLauncher,
    R: Read + Send + 'static,
    W: Write,
{
    let session = launcher
        .launch(config)
        .map_err(|error| Interrupted::new(error.into(), 0))?;
    let cancel = session.cancel_handle();
    let (mut lines, interrupt) =
        input::spawn(input).map_err(|error| Interrupted::new(AppError::StartInput(error), 0))?;
    let guard = install_signal_guard(cancel.clone(), interrupt);

    let mut driver = SessionDriver::new(session, &mut lines);
    let streamed = stream_outcomes(&mut driver, stdout);
    let completed = driver.completed();
    drop(driver);
    drop(guard);

    streamed.map_err(|error| Interrupted::new(error, completed))?;
    if cancel.is_cancelled() {
        debug!(
            target: CLI_TARGET,
            completed,
            input_interrupted = lines.interrupted(),
            "run cancelled"
        );
        return Err(Interrupted::new(
            PercolatorError::Cancelled { completed }.into(),
            completed,
        ));
    }
    if let Some(source) = lines.take_error() {
        return Err(Interrupted::new(
            AppError::ReadInput {
                line: completed + 1,
                source,
            },
            completed,
        ));
    }
    output::write_completion(stdout)
        .map_err(|error| Interrupted::new(AppError::WriteOutput(error), completed))?;

    debug!(target: CLI_TARGET, completed, "all lines processed");
    Ok(completed)
}

fn stream_outcomes<I, W>(driver: &mut SessionDriver<I>, stdout: &mut W) -> Result<(), AppError>
where
    I: Iterator<Item = String>,
    W: Write,
{
    for item in driver {
        let outcome = item?;
        output::write_outcome(stdout, &outcome).map_err(AppError::WriteOutput)?;
    }
    Ok(())
}

fn install_signal_guard(cancel: CancelHandle, interrupt: InputInterrupt) -> Option<SignalGuard> {
    match SignalGuard::install(cancel, interrupt) {
        Ok(guard) => Some(guard),
        Err(error) => {
            warn!(
                target: CLI_TARGET,
                error = %error,
                "failed to install signal handlers; interrupts will not cancel the session"
            );
            None
        }
    }
}
