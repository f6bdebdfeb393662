//! Sink adapter - overflow policy between the acquisition worker and a sink

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{
    CameraError, CapturedFrame, Frame, FrameMetadata, FrameSink, SinkConfig, SinkStatus, SinkType,
};
use tracing::{debug, instrument, warn};

use crate::error::{DispatcherError, Result};
use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::sinks::{CircularBufferSink, FileSink, FrameRing, LogSink};

/// Outcome of one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Sink full and the run is configured to stop on overflow
    Overflow,
}

/// Wraps the downstream sink with the configured overflow policy
pub struct SinkAdapter {
    camera: String,
    sink_name: String,
    sink: Mutex<Box<dyn FrameSink>>,
    stop_on_overflow: AtomicBool,
    metrics: Arc<SinkMetrics>,
}

impl SinkAdapter {
    pub fn new(camera: impl Into<String>, sink: Box<dyn FrameSink>) -> Self {
        let sink_name = sink.name().to_string();
        Self {
            camera: camera.into(),
            sink_name,
            sink: Mutex::new(sink),
            stop_on_overflow: AtomicBool::new(false),
            metrics: Arc::new(SinkMetrics::new()),
        }
    }

    pub fn camera(&self) -> &str {
        &self.camera
    }

    pub fn sink_name(&self) -> &str {
        &self.sink_name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Set per run from the start request
    pub fn set_stop_on_overflow(&self, enabled: bool) {
        self.stop_on_overflow.store(enabled, Ordering::SeqCst);
    }

    pub fn stop_on_overflow(&self) -> bool {
        self.stop_on_overflow.load(Ordering::SeqCst)
    }

    /// Attach metadata to a drained frame
    pub fn frame_from(&self, captured: CapturedFrame, frame_index: u64, elapsed: Duration) -> Frame {
        let geometry = captured.geometry;
        Frame {
            metadata: FrameMetadata {
                camera: self.camera.clone(),
                elapsed_ms: elapsed.as_secs_f64() * 1000.0,
                roi_origin: (geometry.roi_x, geometry.roi_y),
                binning: geometry.binning,
                frame_index,
                sequence_number: captured.sequence,
            },
            data: captured.data,
            geometry,
        }
    }

    /// Deliver one frame
    ///
    /// With stop-on-overflow a full sink yields [`DeliveryOutcome::Overflow`].
    /// Otherwise the sink is cleared and the insert retried once; a second
    /// overflow is an error.
    #[instrument(
        name = "sink_adapter_deliver",
        skip(self, frame),
        fields(sink = %self.sink_name, frame_index = frame.metadata.frame_index)
    )]
    pub fn deliver(&self, frame: &Frame) -> Result<DeliveryOutcome> {
        self.metrics.inc_delivery_count();
        let mut sink = self.lock_sink();

        let result = self.deliver_locked(&mut **sink, frame);
        self.metrics.set_buffered_len(sink.buffered_len());

        match &result {
            Ok(DeliveryOutcome::Delivered) => {
                self.metrics.inc_write_count();
                metrics::counter!("camsim_sink_frames_delivered_total", "sink" => self.sink_name.clone())
                    .increment(1);
            }
            Ok(DeliveryOutcome::Overflow) => {}
            Err(e) => {
                self.metrics.inc_failure_count();
                warn!(sink = %self.sink_name, error = %e, "Delivery failed");
            }
        }
        result
    }

    fn deliver_locked(&self, sink: &mut dyn FrameSink, frame: &Frame) -> Result<DeliveryOutcome> {
        if self.insert(sink, frame)? == SinkStatus::Accepted {
            return Ok(DeliveryOutcome::Delivered);
        }

        if self.stop_on_overflow() {
            debug!(sink = %self.sink_name, "Sink overflow, stopping run");
            return Ok(DeliveryOutcome::Overflow);
        }

        sink.clear()?;
        self.metrics.inc_clear_count();
        debug!(sink = %self.sink_name, "Sink overflow, cleared and retrying");

        match self.insert(sink, frame)? {
            SinkStatus::Accepted => Ok(DeliveryOutcome::Delivered),
            SinkStatus::Overflow => Err(DispatcherError::RetryOverflow {
                sink_name: self.sink_name.clone(),
                frame_index: frame.metadata.frame_index,
            }),
        }
    }

    fn insert(&self, sink: &mut dyn FrameSink, frame: &Frame) -> Result<SinkStatus> {
        self.metrics.inc_insert_count();
        let status = sink.insert(frame)?;
        if status == SinkStatus::Overflow {
            self.metrics.inc_overflow_count();
            metrics::counter!("camsim_sink_overflows_total", "sink" => self.sink_name.clone())
                .increment(1);
        }
        Ok(status)
    }

    /// Drop everything the sink buffers
    pub fn clear(&self) -> std::result::Result<(), CameraError> {
        let mut sink = self.lock_sink();
        sink.clear()?;
        self.metrics.set_buffered_len(0);
        Ok(())
    }

    /// Flush the sink at the end of a run
    pub fn flush(&self) -> std::result::Result<(), CameraError> {
        self.lock_sink().flush()
    }

    fn lock_sink(&self) -> MutexGuard<'_, Box<dyn FrameSink>> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sink built from configuration, plus the ring handle for a circular buffer
pub struct BuiltSink {
    pub sink: Box<dyn FrameSink>,
    pub ring: Option<FrameRing>,
}

/// Create a sink from configuration
#[instrument(
    name = "dispatcher_create_sink",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub fn create_sink(config: &SinkConfig) -> Result<BuiltSink> {
    match config.sink_type {
        SinkType::CircularBuffer => {
            if config.capacity == 0 {
                return Err(DispatcherError::sink_creation(
                    &config.name,
                    "capacity must be positive",
                ));
            }
            let sink = CircularBufferSink::new(&config.name, config.capacity);
            let ring = sink.ring();
            Ok(BuiltSink {
                sink: Box::new(sink),
                ring: Some(ring),
            })
        }
        SinkType::Log => Ok(BuiltSink {
            sink: Box::new(LogSink::new(&config.name)),
            ring: None,
        }),
        SinkType::File => {
            let path = config.path.clone().ok_or_else(|| {
                DispatcherError::sink_creation(&config.name, "file sink requires a path")
            })?;
            let sink = FileSink::new(&config.name, path)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(BuiltSink {
                sink: Box::new(sink),
                ring: None,
            })
        }
    }
}
