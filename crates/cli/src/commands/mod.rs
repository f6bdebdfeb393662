//! Command implementations.

mod info;
mod run;
mod snap;
mod validate;

pub use info::run_info;
pub use run::run_sequence;
pub use snap::run_snap;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::CameraBlueprint;

use crate::error::CliError;

/// Load and validate a blueprint, failing early when the file is missing
fn load_blueprint(path: &Path) -> Result<CameraBlueprint> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
