//! Command implementations.

mod capture;
mod info;
mod run;
mod validate;

pub use capture::run_capture;
pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use contracts::SessionBlueprint;

use crate::error::CliError;

/// Load and validate the blueprint at `path`
pub(crate) fn load_blueprint(path: &Path) -> Result<SessionBlueprint> {
    if !path.exists() {
        return Err(CliError::config_not_found(path).into());
    }
    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Parse a positive seconds argument into a `Duration`
pub(crate) fn positive_seconds(arg: &'static str, secs: f64) -> Result<Duration, CliError> {
    if secs <= 0.0 {
        return Err(CliError::invalid_argument(arg, "must be a finite value > 0"));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| CliError::invalid_argument(arg, format!("not a usable duration: {e}")))
}
