//! Runtime tests for the CLI.

#[cfg(unix)]
mod behaviour;
mod support;
