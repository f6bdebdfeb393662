//! Sink implementations
//!
//! Contains CircularBufferSink, LogSink, and FileSink.

mod circular;
mod file;
mod log;

pub use self::circular::{CircularBufferSink, FrameRing};
pub use self::file::{FileSink, INDEX_FILE};
pub use self::log::LogSink;

#[cfg(test)]
pub(crate) fn test_frame(frame_index: u64) -> contracts::Frame {
    use contracts::{FrameGeometry, FrameMetadata, PixelFormat};

    let geometry = FrameGeometry {
        width: 4,
        height: 2,
        format: PixelFormat::Mono8,
        bit_depth: 8,
        binning: 1,
        roi_x: 0,
        roi_y: 0,
    };
    contracts::Frame {
        data: bytes::Bytes::from(vec![frame_index as u8; geometry.byte_len()]),
        geometry,
        metadata: FrameMetadata {
            camera: "test".to_string(),
            elapsed_ms: frame_index as f64,
            roi_origin: (0, 0),
            binning: 1,
            frame_index,
            sequence_number: frame_index as i64,
        },
    }
}
