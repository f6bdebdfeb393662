//! Frame sources
//!
//! Two variants behind [`FrameSource`]:
//! - [`SynthesizedSource`] renders a frame synchronously on the caller's
//!   thread each time it is asked to produce one.
//! - [`CallbackSource`] wraps a [`FrameDriver`] whose callback publishes
//!   frames from the driver's own thread.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use contracts::{FrameCallback, FrameDriver, FrameGeometry};
use pattern_engine::FrameSynthesizer;
use tracing::{debug, trace};

use crate::error::{IngestionError, Result};
use crate::handoff::{FrameHandoff, PublishOutcome};
use crate::pacing::{millis, wait_for_elapsed_or_stop};
use crate::signal::StopSignal;

/// Who drives production
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// The consumer produces each frame itself
    Synthesized,
    /// An external thread pushes frames
    CallbackDriven,
}

/// Capability shared by every frame source
pub trait FrameSource: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// Bind to the handoff of a new run
    fn attach(&self, handoff: Arc<FrameHandoff>) -> Result<()>;

    /// Produce one frame into the attached handoff
    ///
    /// Synthesized sources render and publish here; callback-driven sources
    /// publish on their own and return immediately. A stop request cuts the
    /// exposure wait short and skips the frame.
    fn produce(&self, frame_number: u64, stop: &StopSignal) -> Result<()>;

    /// Release the handoff; no frame is published after this returns
    fn detach(&self);
}

type Attachment = Mutex<Option<Arc<FrameHandoff>>>;

fn attach_once(slot: &Attachment, name: &str, handoff: Arc<FrameHandoff>) -> Result<()> {
    let mut attached = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if attached.is_some() {
        return Err(IngestionError::AlreadyAttached {
            source_name: name.to_string(),
        });
    }
    *attached = Some(handoff);
    Ok(())
}

fn current(slot: &Attachment, name: &str) -> Result<Arc<FrameHandoff>> {
    slot.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or_else(|| IngestionError::NotAttached {
            source_name: name.to_string(),
        })
}

/// Pattern-engine backed source
pub struct SynthesizedSource {
    name: String,
    synthesizer: Arc<FrameSynthesizer>,
    handoff: Attachment,
}

impl SynthesizedSource {
    pub fn new(name: impl Into<String>, synthesizer: Arc<FrameSynthesizer>) -> Self {
        Self {
            name: name.into(),
            synthesizer,
            handoff: Mutex::new(None),
        }
    }

    pub fn synthesizer(&self) -> &Arc<FrameSynthesizer> {
        &self.synthesizer
    }
}

impl FrameSource for SynthesizedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Synthesized
    }

    fn attach(&self, handoff: Arc<FrameHandoff>) -> Result<()> {
        attach_once(&self.handoff, &self.name, handoff)?;
        self.synthesizer.parameters().reset_exposure_sequence();
        debug!(source = %self.name, "Synthesized source attached");
        Ok(())
    }

    fn produce(&self, frame_number: u64, stop: &StopSignal) -> Result<()> {
        let handoff = current(&self.handoff, &self.name)?;
        let exposure_ms = self.synthesizer.parameters().next_sequence_exposure();

        let start = Instant::now();
        if wait_for_elapsed_or_stop(start, millis(exposure_ms), stop) {
            return Ok(());
        }

        let outcome = self
            .synthesizer
            .render_with(frame_number, exposure_ms, |buffer, geometry| {
                handoff.publish(buffer.as_bytes(), geometry)
            });
        trace!(source = %self.name, frame_number, exposure_ms, ?outcome, "Frame synthesized");
        Ok(())
    }

    fn detach(&self) {
        self.handoff
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Source fed by a hardware driver callback
pub struct CallbackSource {
    driver: Arc<dyn FrameDriver>,
    handoff: Attachment,
}

impl CallbackSource {
    pub fn new(driver: Arc<dyn FrameDriver>) -> Self {
        Self {
            driver,
            handoff: Mutex::new(None),
        }
    }

    pub fn driver(&self) -> &Arc<dyn FrameDriver> {
        &self.driver
    }
}

impl FrameSource for CallbackSource {
    fn name(&self) -> &str {
        self.driver.name()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::CallbackDriven
    }

    fn attach(&self, handoff: Arc<FrameHandoff>) -> Result<()> {
        attach_once(&self.handoff, self.driver.name(), handoff.clone())?;

        let callback: FrameCallback = Arc::new(move |data: &[u8], geometry: &FrameGeometry| {
            if let PublishOutcome::Skipped = handoff.publish(data, geometry) {
                trace!("Driver frame skipped, both slots busy");
            }
        });
        self.driver.listen(callback);

        if !self.driver.is_listening() {
            self.detach();
            return Err(IngestionError::DriverNotListening {
                driver: self.driver.name().to_string(),
            });
        }
        debug!(driver = %self.driver.name(), "Callback source attached");
        Ok(())
    }

    fn produce(&self, _frame_number: u64, _stop: &StopSignal) -> Result<()> {
        current(&self.handoff, self.driver.name()).map(|_| ())
    }

    fn detach(&self) {
        self.driver.stop();
        self.handoff
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::{DrainOutcome, EMPTY_SEQUENCE};
    use contracts::{PixelFormat, SynthesisParameters};
    use pattern_engine::{GeometryManager, ParameterStore};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn synthesizer(exposure_ms: f64) -> Arc<FrameSynthesizer> {
        let geometry = Arc::new(GeometryManager::new(32, 32, PixelFormat::Mono8).unwrap());
        let params = SynthesisParameters {
            exposure_ms,
            seed: Some(3),
            ..Default::default()
        };
        Arc::new(FrameSynthesizer::new(
            geometry,
            Arc::new(ParameterStore::new(params)),
        ))
    }

    #[test]
    fn test_produce_requires_attach() {
        let source = SynthesizedSource::new("synth", synthesizer(0.0));
        let err = source.produce(0, &StopSignal::new()).unwrap_err();
        assert!(matches!(err, IngestionError::NotAttached { .. }));
    }

    #[test]
    fn test_double_attach_rejected() {
        let source = SynthesizedSource::new("synth", synthesizer(0.0));
        source.attach(Arc::new(FrameHandoff::new())).unwrap();
        let err = source.attach(Arc::new(FrameHandoff::new())).unwrap_err();
        assert!(matches!(err, IngestionError::AlreadyAttached { .. }));
        source.detach();
        source.attach(Arc::new(FrameHandoff::new())).unwrap();
    }

    #[test]
    fn test_produce_paces_exposure_and_publishes() {
        let source = SynthesizedSource::new("synth", synthesizer(15.0));
        let handoff = Arc::new(FrameHandoff::new());
        source.attach(handoff.clone()).unwrap();

        let start = Instant::now();
        source.produce(0, &StopSignal::new()).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(15));

        match handoff.drain(EMPTY_SEQUENCE, Duration::from_millis(10)) {
            DrainOutcome::Frame(frame) => assert_eq!(frame.data.len(), 32 * 32),
            DrainOutcome::Empty => panic!("expected a frame"),
        }
    }

    #[test]
    fn test_stop_skips_frame() {
        let source = SynthesizedSource::new("synth", synthesizer(5000.0));
        let handoff = Arc::new(FrameHandoff::new());
        source.attach(handoff.clone()).unwrap();

        let stop = StopSignal::new();
        stop.stop();
        let start = Instant::now();
        source.produce(0, &stop).unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(handoff.last_sequence(), EMPTY_SEQUENCE);
    }

    struct DeafDriver {
        stopped: AtomicBool,
    }

    impl FrameDriver for DeafDriver {
        fn name(&self) -> &str {
            "deaf"
        }

        fn listen(&self, _callback: FrameCallback) {}

        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }

        fn is_listening(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_callback_source_reports_silent_driver() {
        let driver = Arc::new(DeafDriver {
            stopped: AtomicBool::new(false),
        });
        let source = CallbackSource::new(driver.clone());
        let err = source.attach(Arc::new(FrameHandoff::new())).unwrap_err();
        assert!(matches!(err, IngestionError::DriverNotListening { .. }));
        assert!(driver.stopped.load(Ordering::SeqCst));
    }
}
