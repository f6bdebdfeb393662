//! Frame synthesizer: geometry lock + pattern engine + post-processing hook.
//!
//! Both the sequence worker and single-shot capture render through the same
//! synthesizer, so they serialize on the geometry lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use contracts::{FrameBuffer, FrameGeometry, FrameManipulator};
use tracing::warn;

use crate::engine::{PatternEngine, RenderContext};
use crate::geometry::GeometryManager;
use crate::parameters::ParameterStore;

pub struct FrameSynthesizer {
    geometry: Arc<GeometryManager>,
    parameters: Arc<ParameterStore>,
    engine: Mutex<PatternEngine>,
    manipulator: RwLock<Option<Arc<dyn FrameManipulator>>>,
    fast_image: AtomicBool,
}

impl FrameSynthesizer {
    pub fn new(geometry: Arc<GeometryManager>, parameters: Arc<ParameterStore>) -> Self {
        let seed = parameters.snapshot().seed;
        Self {
            geometry,
            parameters,
            engine: Mutex::new(PatternEngine::new(seed)),
            manipulator: RwLock::new(None),
            fast_image: AtomicBool::new(false),
        }
    }

    pub fn geometry(&self) -> &Arc<GeometryManager> {
        &self.geometry
    }

    pub fn parameters(&self) -> &Arc<ParameterStore> {
        &self.parameters
    }

    /// Install (or remove) the post-processing hook
    pub fn set_manipulator(&self, manipulator: Option<Arc<dyn FrameManipulator>>) {
        *self
            .manipulator
            .write()
            .unwrap_or_else(PoisonError::into_inner) = manipulator;
    }

    /// Skip generation and re-deliver the current buffer
    pub fn set_fast_image(&self, enabled: bool) {
        self.fast_image.store(enabled, Ordering::SeqCst);
    }

    pub fn fast_image(&self) -> bool {
        self.fast_image.load(Ordering::SeqCst)
    }

    /// Restart the engine's random stream
    pub fn reseed(&self, seed: Option<u64>) {
        self.engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reseed(seed);
    }

    /// Render one frame and lend it to `f` while the geometry lock is held
    pub fn render_with<R>(
        &self,
        frame_number: u64,
        exposure_ms: f64,
        f: impl FnOnce(&FrameBuffer, &FrameGeometry) -> R,
    ) -> R {
        let params = self.parameters.snapshot();
        let manipulator = self
            .manipulator
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let fast_image = self.fast_image();

        self.geometry.with_buffer(|buffer, view| {
            if !fast_image {
                let ctx = RenderContext {
                    params: &params,
                    exposure_ms,
                    frame_number,
                    view,
                };
                self.engine
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .render(buffer, &ctx);

                if let Some(manipulator) = &manipulator {
                    if let Err(e) = manipulator.change_pixels(buffer) {
                        warn!(error = %e, frame_number, "Frame manipulator failed");
                    }
                }
            }
            f(buffer, &view.geometry)
        })
    }

    /// Render one frame and return an owned copy
    pub fn render(&self, frame_number: u64, exposure_ms: f64) -> FrameBuffer {
        self.render_with(frame_number, exposure_ms, |buffer, _| buffer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CameraError, PixelFormat, SynthesisParameters};

    struct Invert;

    impl FrameManipulator for Invert {
        fn change_pixels(&self, buffer: &mut FrameBuffer) -> Result<(), CameraError> {
            for byte in buffer.as_bytes_mut() {
                *byte = 255 - *byte;
            }
            Ok(())
        }
    }

    fn synthesizer() -> FrameSynthesizer {
        let geometry = Arc::new(GeometryManager::new(64, 64, PixelFormat::Mono8).unwrap());
        let params = SynthesisParameters {
            seed: Some(1),
            ..Default::default()
        };
        FrameSynthesizer::new(geometry, Arc::new(ParameterStore::new(params)))
    }

    #[test]
    fn test_render_matches_geometry() {
        let synth = synthesizer();
        synth.geometry().set_format(PixelFormat::Rgb64);
        let frame = synth.render(0, 10.0);
        assert_eq!(frame.len(), 64 * 64 * 8);
    }

    #[test]
    fn test_manipulator_runs_after_synthesis() {
        let synth = synthesizer();
        synth.set_manipulator(Some(Arc::new(Invert)));
        let frame = synth.render(0, 10.0);
        // plain sine at 10 ms stays below 23, so inverted pixels are all high
        assert!(frame.as_bytes().iter().all(|b| *b > 200));
    }

    #[test]
    fn test_fast_image_reuses_buffer() {
        let synth = synthesizer();
        let first = synth.render(0, 10.0);
        synth.set_fast_image(true);
        let second = synth.render(0, 10.0);
        assert_eq!(first, second);
    }
}
