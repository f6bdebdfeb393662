//! Ingestion 错误类型

use contracts::CameraError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 帧源已绑定到一个交接缓冲区
    #[error("frame source {source_name} is already attached")]
    AlreadyAttached {
        /// 帧源名称
        source_name: String,
    },

    /// 帧源尚未绑定
    #[error("frame source {source_name} is not attached")]
    NotAttached {
        /// 帧源名称
        source_name: String,
    },

    /// 驱动未在监听
    #[error("driver {driver} is not listening")]
    DriverNotListening {
        /// 驱动名称
        driver: String,
    },

    #[error(transparent)]
    Camera(#[from] CameraError),
}

impl From<IngestionError> for CameraError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::Camera(inner) => inner,
            other => CameraError::fatal(other.to_string()),
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
