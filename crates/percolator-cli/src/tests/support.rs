//! Test doubles for configuration loading and worker launching.

use std::ffi::OsString;
use std::io::Cursor;
use std::process::ExitCode;

use percolator::{PercolatorError, QuerySource, SessionOptions, WorkerConfig, WorkerSession};
use percolator_config::Config;

use crate::{AppError, ConfigLoader, WorkerLauncher, run_with};

/// Shell matcher that answers `quick brown fox` for lines containing it and
/// an empty line otherwise.
pub(crate) const FOX_MATCHER: &str = r#"
while IFS= read -r line; do
  case "$line" in
    *"quick brown fox"*) echo "quick brown fox" ;;
    *) echo ;;
  esac
done
"#;

/// Answers one line, then closes its output.
pub(crate) const ANSWERS_ONCE: &str = r"
read -r line
echo
exec 1>&-
while read -r line; do :; done
";

pub(crate) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(crate) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Runs the configured worker as a `/bin/sh -c` script.
pub(crate) struct ShellLauncher {
    script: String,
}

impl ShellLauncher {
    pub(crate) fn new(script: &str) -> Self {
        Self {
            script: script.to_owned(),
        }
    }
}

impl WorkerLauncher for ShellLauncher {
    fn launch(&self, config: &Config) -> Result<WorkerSession, PercolatorError> {
        let worker = WorkerConfig::new(
            "/bin/sh",
            QuerySource::File(config.queries_file().as_std_path().to_path_buf()),
        )
        .with_empty_line_flag(config.empty_line_flag())
        .with_extra_args(["-c", self.script.as_str(), "lmgrep"]);
        WorkerSession::open(&worker, SessionOptions::from_config(config))
    }
}

/// Captured result of one CLI run.
#[derive(Debug)]
pub(crate) struct RunOutput {
    pub(crate) exit_code: ExitCode,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

pub(crate) fn test_config() -> Config {
    Config {
        log_filter: "off".to_owned(),
        response_timeout_ms: 5_000,
        startup_probe_ms: 20,
        ..Config::default()
    }
}

pub(crate) fn run_script(
    config: Config,
    script: &str,
    input: &str,
) -> RunOutput {
    run_with_launcher(config, &ShellLauncher::new(script), input)
}

pub(crate) fn run_with_launcher<S: WorkerLauncher>(
    config: Config,
    launcher: &S,
    input: &str,
) -> RunOutput {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit_code = run_with(
        [OsString::from("percolate")],
        Cursor::new(input.to_owned()),
        &mut stdout,
        &mut stderr,
        &StaticConfigLoader::new(config),
        launcher,
    );
    RunOutput {
        exit_code,
        stdout: String::from_utf8(stdout).expect("stdout utf8"),
        stderr: String::from_utf8(stderr).expect("stderr utf8"),
    }
}
