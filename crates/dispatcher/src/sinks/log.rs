//! LogSink - logs frame summary via tracing

use contracts::{CameraError, Frame, FrameSink, SinkStatus};
use tracing::{info, instrument};

/// Sink that logs frame summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_frame_summary(&self, frame: &Frame) {
        let meta = &frame.metadata;
        info!(
            sink = %self.name,
            camera = %meta.camera,
            frame_index = meta.frame_index,
            sequence = meta.sequence_number,
            elapsed_ms = meta.elapsed_ms,
            width = frame.geometry.width,
            height = frame.geometry.height,
            format = %frame.geometry.format,
            bytes = frame.data.len(),
            "Frame received"
        );
    }
}

impl FrameSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_insert",
        skip(self, frame),
        fields(sink = %self.name, frame_index = frame.metadata.frame_index)
    )]
    fn insert(&mut self, frame: &Frame) -> Result<SinkStatus, CameraError> {
        self.log_frame_summary(frame);
        Ok(SinkStatus::Accepted)
    }

    fn clear(&mut self) -> Result<(), CameraError> {
        // Nothing buffered
        Ok(())
    }
}
