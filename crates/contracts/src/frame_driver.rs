//! FrameDriver trait - hardware frame delivery abstraction
//!
//! Models the vendor callback boundary: the driver owns its acquisition
//! clock and pushes completed frames into a callback from its own thread.

use std::sync::Arc;

use crate::FrameGeometry;

/// Frame delivery callback
///
/// Invoked on an arbitrary driver thread with a borrowed view of the
/// completed frame. Must return in bounded time.
pub type FrameCallback = Arc<dyn Fn(&[u8], &FrameGeometry) + Send + Sync>;

/// Hardware frame driver
///
/// Real vendor SDK bindings and the mock hardware driver implement this so the
/// callback-driven frame source stays hardware-agnostic.
pub trait FrameDriver: Send + Sync {
    /// Driver name (used for logging)
    fn name(&self) -> &str;

    /// Register the frame callback and start acquiring
    ///
    /// Repeated calls while listening are idempotent.
    fn listen(&self, callback: FrameCallback);

    /// Stop acquiring; no callback fires after this returns
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
