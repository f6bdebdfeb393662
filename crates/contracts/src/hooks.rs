//! Collaborator hooks injected into the acquisition core.

use crate::{CameraError, FrameBuffer, RunSummary};

/// External trigger device
///
/// Fired once per sequence frame before the frame is produced. Failures are
/// advisory and never stop a run.
pub trait TriggerDevice: Send + Sync {
    fn name(&self) -> &str;

    fn fire(&self) -> Result<(), CameraError>;
}

/// Receives the "acquisition finished" notification
pub trait AcquisitionListener: Send + Sync {
    /// Called exactly once per run, from the worker thread
    fn acquisition_finished(&self, summary: &RunSummary) -> Result<(), CameraError>;
}

/// Post-processing hook applied to every synthesized frame before delivery
pub trait FrameManipulator: Send + Sync {
    fn change_pixels(&self, buffer: &mut FrameBuffer) -> Result<(), CameraError>;
}
