//! Layered error definitions
//!
//! Categorized by source: geometry / format / acquisition / sink / config

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum CameraError {
    // ===== Geometry Errors =====
    /// Requested dimension or region outside the sensor bounds
    #[error("invalid size for '{field}': {message}")]
    InvalidSize { field: String, message: String },

    /// Binning factor not allowed in the current scan mode
    #[error("binning {binning} not allowed in scan mode {scan_mode} (allowed: {allowed:?})")]
    InvalidBinning {
        binning: u32,
        scan_mode: u32,
        allowed: Vec<u32>,
    },

    /// Unsupported pixel format or bit depth; state fell back to `fallback`
    #[error("unknown format '{requested}', fell back to '{fallback}'")]
    UnknownFormat { requested: String, fallback: String },

    // ===== Acquisition Errors =====
    /// Operation refused while a sequence is running
    #[error("camera busy: cannot {operation} while capturing")]
    Busy { operation: String },

    /// Downstream sink saturated
    #[error("sink '{sink_name}' overflowed")]
    Overflow { sink_name: String },

    /// External trigger device unreachable
    #[error("trigger '{device}' failed: {message}")]
    Trigger { device: String, message: String },

    /// Unexpected internal fault inside the drain loop
    #[error("fatal acquisition fault: {message}")]
    Fatal { message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CameraError {
    /// Create invalid size error
    pub fn invalid_size(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSize {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create unknown format error
    pub fn unknown_format(requested: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self::UnknownFormat {
            requested: requested.into(),
            fallback: fallback.into(),
        }
    }

    /// Create busy error
    pub fn busy(operation: impl Into<String>) -> Self {
        Self::Busy {
            operation: operation.into(),
        }
    }

    /// Create overflow error
    pub fn overflow(sink_name: impl Into<String>) -> Self {
        Self::Overflow {
            sink_name: sink_name.into(),
        }
    }

    /// Create trigger error
    pub fn trigger(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Trigger {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Create fatal error
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this error is the `Busy` variant
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}
