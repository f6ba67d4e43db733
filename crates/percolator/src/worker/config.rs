//! Launch description for the worker process.

use std::path::PathBuf;
use std::time::Duration;

use percolator_config::{
    Config, DEFAULT_EMPTY_LINE_FLAG, DEFAULT_GRACE_PERIOD_MS, DEFAULT_RESPONSE_TIMEOUT_MS,
    DEFAULT_STARTUP_PROBE_MS, DEFAULT_WORKER_COMMAND, ResponseFormat,
};

/// Where the worker loads its query set from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    /// A query file, passed as `--queries-file=<path>`.
    File(PathBuf),
    /// A single query, passed as the trailing positional argument.
    Inline(String),
}

/// Configuration for spawning a worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// The executable path or command name.
    pub command: PathBuf,
    /// Query set the worker matches against.
    pub query_source: QuerySource,
    /// Flag that makes the worker emit an empty line for every non-match.
    pub empty_line_flag: String,
    /// Shape of the frames the worker emits for matching lines.
    pub response_format: ResponseFormat,
    /// Additional worker arguments, passed first.
    pub extra_args: Vec<String>,
    /// Working directory for the spawned process.
    pub working_dir: Option<PathBuf>,
}

impl WorkerConfig {
    /// Creates a configuration for `command` matching against `query_source`.
    #[must_use]
    pub fn new(command: impl Into<PathBuf>, query_source: QuerySource) -> Self {
        Self {
            command: command.into(),
            query_source,
            empty_line_flag: DEFAULT_EMPTY_LINE_FLAG.to_owned(),
            response_format: ResponseFormat::Plain,
            extra_args: Vec::new(),
            working_dir: None,
        }
    }

    /// Default `lmgrep` configuration reading queries from `queries_file`.
    ///
    /// Expects `lmgrep` to be available in PATH.
    #[must_use]
    pub fn lmgrep(queries_file: impl Into<PathBuf>) -> Self {
        Self::new(
            DEFAULT_WORKER_COMMAND,
            QuerySource::File(queries_file.into()),
        )
    }

    /// Builds the launch description from resolved configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.worker_command(),
            QuerySource::File(config.queries_file().as_std_path().to_path_buf()),
        )
        .with_empty_line_flag(config.empty_line_flag())
        .with_response_format(config.response_format())
    }

    /// Overrides the flag forcing one output line per input line.
    #[must_use]
    pub fn with_empty_line_flag(mut self, flag: impl Into<String>) -> Self {
        self.empty_line_flag = flag.into();
        self
    }

    /// Selects the response format requested from the worker.
    #[must_use]
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    /// Appends additional worker options.
    #[must_use]
    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets a custom working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Ordered argument list passed to the worker.
    ///
    /// The empty-line flag is always present: without it the worker stays
    /// silent on non-matches and strict alternation would block forever.
    #[must_use]
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = self.extra_args.clone();
        if let QuerySource::File(path) = &self.query_source {
            args.push(format!("--queries-file={}", path.display()));
        }
        args.extend(
            self.response_format
                .worker_flags()
                .iter()
                .map(|flag| (*flag).to_owned()),
        );
        args.push(self.empty_line_flag.clone());
        if let QuerySource::Inline(query) = &self.query_source {
            args.push(query.clone());
        }
        args
    }
}

/// Timing policy applied by a [`WorkerSession`](crate::WorkerSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Maximum wait for each response; `None` blocks indefinitely.
    pub response_timeout: Option<Duration>,
    /// Time the worker is given to exit after its input closes.
    pub grace_period: Duration,
    /// Window after spawning in which an early exit is a spawn failure.
    pub startup_probe: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            response_timeout: Some(Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS)),
            grace_period: Duration::from_millis(DEFAULT_GRACE_PERIOD_MS),
            startup_probe: Duration::from_millis(DEFAULT_STARTUP_PROBE_MS),
        }
    }
}

impl SessionOptions {
    /// Builds session timing from resolved configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            response_timeout: config.response_timeout(),
            grace_period: config.grace_period(),
            startup_probe: config.startup_probe(),
        }
    }

    /// Sets the per-response timeout.
    #[must_use]
    pub const fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Sets the shutdown grace period.
    #[must_use]
    pub const fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Sets the startup probe window.
    #[must_use]
    pub const fn with_startup_probe(mut self, probe: Duration) -> Self {
        self.startup_probe = probe;
        self
    }
}
