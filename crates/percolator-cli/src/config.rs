//! Configuration loading for the CLI.
//!
//! Every command-line argument is a configuration flag, so the loader hands
//! the whole argument list to `ortho_config`, which layers it over defaults,
//! the configuration file and `PERCOLATOR_*` environment variables.

use std::ffi::OsString;

use ortho_config::OrthoConfig;
use percolator_config::Config;

use crate::AppError;

pub(crate) trait ConfigLoader {
    /// Loads configuration for the CLI from the raw argument list, including
    /// the program name.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}
