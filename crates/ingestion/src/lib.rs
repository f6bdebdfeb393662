//! # Ingestion
//!
//! Frame production and the producer/consumer handoff.
//!
//! Responsibilities:
//! - Frame sources: synthesized (pattern engine on the consumer thread) and
//!   callback-driven (hardware driver thread)
//! - Double-buffer handoff between one producer and one consumer
//! - Mock hardware driver for running the callback path without a camera
//! - Stop signal and sleep-based exposure pacing
//!
//! ## Usage Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use contracts::{PixelFormat, SynthesisParameters};
//! use ingestion::{DrainOutcome, FrameHandoff, FrameSource, StopSignal, SynthesizedSource};
//! use pattern_engine::{FrameSynthesizer, GeometryManager, ParameterStore};
//!
//! let geometry = Arc::new(GeometryManager::new(64, 64, PixelFormat::Mono8).unwrap());
//! let params = SynthesisParameters { exposure_ms: 0.0, ..Default::default() };
//! let synth = Arc::new(FrameSynthesizer::new(geometry, Arc::new(ParameterStore::new(params))));
//!
//! let handoff = Arc::new(FrameHandoff::new());
//! let source = SynthesizedSource::new("synth", synth);
//! source.attach(handoff.clone()).unwrap();
//! source.produce(0, &StopSignal::new()).unwrap();
//!
//! match handoff.drain(-1, Duration::from_millis(10)) {
//!     DrainOutcome::Frame(frame) => assert_eq!(frame.sequence, 0),
//!     DrainOutcome::Empty => unreachable!(),
//! }
//! ```

mod error;
mod handoff;
mod mock;
mod pacing;
mod signal;
mod source;

// Re-exports
pub use error::{IngestionError, Result};
pub use handoff::{
    DrainOutcome, FrameHandoff, HandoffMetrics, HandoffSnapshot, PublishOutcome, EMPTY_SEQUENCE,
};
pub use mock::{MockDriverConfig, MockFrameDriver};
pub use pacing::{millis, wait_for_elapsed, wait_for_elapsed_or_stop};
pub use signal::StopSignal;
pub use source::{CallbackSource, FrameSource, SourceKind, SynthesizedSource};
