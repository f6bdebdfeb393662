//! Dispatcher error types

use contracts::CameraError;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Sink still full after clear-and-retry
    #[error("sink '{sink_name}' overflowed again after clearing (frame {frame_index})")]
    RetryOverflow { sink_name: String, frame_index: u64 },

    /// Sink write error (from contract)
    #[error(transparent)]
    Camera(#[from] CameraError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<DispatcherError> for CameraError {
    fn from(err: DispatcherError) -> Self {
        match err {
            DispatcherError::Camera(inner) => inner,
            DispatcherError::RetryOverflow { sink_name, .. } => CameraError::overflow(sink_name),
            DispatcherError::Io(e) => CameraError::Io(e),
            other => CameraError::fatal(other.to_string()),
        }
    }
}

/// Dispatcher Result alias
pub type Result<T> = std::result::Result<T, DispatcherError>;
