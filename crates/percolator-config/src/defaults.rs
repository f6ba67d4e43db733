use camino::Utf8PathBuf;

use crate::logging::LogFormat;
use crate::response::ResponseFormat;

/// Default worker executable, resolved through `PATH`.
pub const DEFAULT_WORKER_COMMAND: &str = "lmgrep";

/// Default query-source file handed to the worker.
pub const DEFAULT_QUERIES_FILE: &str = "queries.json";

/// Worker flag forcing one output line per input line, empty lines included.
pub const DEFAULT_EMPTY_LINE_FLAG: &str = "--with-empty-lines";

/// Default per-line response timeout in milliseconds.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 5_000;

/// Default time granted to the worker to exit after its input closes.
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 200;

/// Default window after spawning in which an early exit is a spawn failure.
pub const DEFAULT_STARTUP_PROBE_MS: u64 = 50;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default worker executable as an owned value.
pub fn default_worker_command() -> String {
    DEFAULT_WORKER_COMMAND.to_owned()
}

/// Default query-source file as an owned path.
pub fn default_queries_file() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_QUERIES_FILE)
}

/// Default empty-line flag as an owned value.
pub fn default_empty_line_flag() -> String {
    DEFAULT_EMPTY_LINE_FLAG.to_owned()
}

/// Default response format requested from the worker.
pub fn default_response_format() -> ResponseFormat {
    ResponseFormat::Plain
}

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}
