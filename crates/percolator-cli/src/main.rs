//! CLI entrypoint for `percolate`.
//!
//! The binary delegates to [`percolator_cli::run`], which loads
//! configuration, starts the matching worker and streams standard input
//! through it line by line.

use std::io::{self, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    // Stderr stays unlocked: log output from the worker and signal threads
    // shares it with the final error report.
    let mut stdout: StdoutLock<'static> = io::stdout().lock();
    let mut stderr = io::stderr();
    percolator_cli::run(std::env::args_os(), io::stdin(), &mut stdout, &mut stderr)
}
