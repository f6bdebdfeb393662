//! FrameSink trait - downstream consumer interface
//!
//! Sinks run synchronously on the acquisition worker thread.

use crate::{CameraError, Frame};

/// Outcome of a single insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStatus {
    Accepted,
    /// Bounded storage is full; the frame was not stored
    Overflow,
}

/// Downstream frame consumer
///
/// All sink implementations must implement this trait.
pub trait FrameSink: Send {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Insert one frame
    ///
    /// # Errors
    /// Returns write error (should include context)
    fn insert(&mut self, frame: &Frame) -> Result<SinkStatus, CameraError>;

    /// Discard buffered frames
    fn clear(&mut self) -> Result<(), CameraError>;

    /// Frames currently held (0 for pass-through sinks)
    fn buffered_len(&self) -> usize {
        0
    }

    /// Flush buffer (if any)
    fn flush(&mut self) -> Result<(), CameraError> {
        Ok(())
    }
}
