//! Error types for CLI operations.

use contracts::{CameraError, RunStatus};
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// The acquisition run ended in a fault
    #[error("Acquisition failed: {status}")]
    AcquisitionFailed { status: RunStatus },

    /// The worker never reported a finished run
    #[error("Acquisition ended without a finished notification")]
    MissingSummary,

    /// Camera error
    #[error(transparent)]
    Camera(#[from] CameraError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
