//! Layered configuration shared by the percolator library and CLI.
//!
//! Values are resolved with `ortho_config` in increasing order of
//! precedence: built-in defaults, a TOML configuration file, `PERCOLATOR_*`
//! environment variables, then command-line flags.

mod defaults;
mod logging;
mod response;

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_EMPTY_LINE_FLAG, DEFAULT_GRACE_PERIOD_MS, DEFAULT_LOG_FILTER, DEFAULT_QUERIES_FILE,
    DEFAULT_RESPONSE_TIMEOUT_MS, DEFAULT_STARTUP_PROBE_MS, DEFAULT_WORKER_COMMAND,
    default_empty_line_flag, default_log_filter, default_log_filter_string, default_log_format,
    default_queries_file, default_response_format, default_worker_command,
};
pub use logging::LogFormat;
pub use response::{JSON_DETAIL_FLAGS, ResponseFormat};

/// Resolved configuration for a percolation run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "PERCOLATOR")]
pub struct Config {
    /// Worker executable or command name.
    #[ortho_config(default = defaults::default_worker_command())]
    pub worker_command: String,
    /// Query-source location handed to the worker.
    #[ortho_config(default = defaults::default_queries_file())]
    pub queries_file: Utf8PathBuf,
    /// Worker flag forcing one output frame per input frame.
    #[ortho_config(default = defaults::default_empty_line_flag())]
    pub empty_line_flag: String,
    /// Shape of the frames the worker emits for matching lines.
    #[ortho_config(default = defaults::default_response_format())]
    pub response_format: ResponseFormat,
    /// Per-line response timeout in milliseconds; zero disables it.
    #[ortho_config(default = DEFAULT_RESPONSE_TIMEOUT_MS)]
    pub response_timeout_ms: u64,
    /// Time the worker is given to exit once its input closes.
    #[ortho_config(default = DEFAULT_GRACE_PERIOD_MS)]
    pub grace_period_ms: u64,
    /// Window after spawning in which an early exit counts as a spawn failure.
    #[ortho_config(default = DEFAULT_STARTUP_PROBE_MS)]
    pub startup_probe_ms: u64,
    /// Tracing filter expression.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Tracing output format.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_command: default_worker_command(),
            queries_file: default_queries_file(),
            empty_line_flag: default_empty_line_flag(),
            response_format: default_response_format(),
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            startup_probe_ms: DEFAULT_STARTUP_PROBE_MS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Worker executable or command name.
    #[must_use]
    pub fn worker_command(&self) -> &str {
        &self.worker_command
    }

    /// Query-source location handed to the worker.
    #[must_use]
    pub fn queries_file(&self) -> &Utf8PathBuf {
        &self.queries_file
    }

    /// Worker flag forcing one output frame per input frame.
    #[must_use]
    pub fn empty_line_flag(&self) -> &str {
        &self.empty_line_flag
    }

    /// Shape of the frames the worker emits for matching lines.
    #[must_use]
    pub const fn response_format(&self) -> ResponseFormat {
        self.response_format
    }

    /// Per-line response timeout, or `None` when reads may block forever.
    #[must_use]
    pub const fn response_timeout(&self) -> Option<Duration> {
        match self.response_timeout_ms {
            0 => None,
            millis => Some(Duration::from_millis(millis)),
        }
    }

    /// Time the worker is given to exit once its input closes.
    #[must_use]
    pub const fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Window after spawning in which an early exit counts as a spawn failure.
    #[must_use]
    pub const fn startup_probe(&self) -> Duration {
        Duration::from_millis(self.startup_probe_ms)
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Tracing output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
