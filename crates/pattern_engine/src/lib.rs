//! # Pattern Engine
//!
//! Pixel geometry management and deterministic frame synthesis.
//!
//! ## Modes
//! - Sine stripes with a drifting phase (optionally rotating)
//! - Gaussian photon/read-noise model (Marsaglia polar sampler)
//! - Colour test fixture
//!
//! Fault injection, the seven-segment frame counter and multi-ROI masking
//! run as post-passes.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use contracts::{PixelFormat, SynthesisParameters};
//! use pattern_engine::{FrameSynthesizer, GeometryManager, ParameterStore};
//!
//! let geometry = Arc::new(GeometryManager::new(128, 128, PixelFormat::Mono16).unwrap());
//! let params = Arc::new(ParameterStore::new(SynthesisParameters::default()));
//! let synth = FrameSynthesizer::new(geometry, params);
//! let frame = synth.render(1, 10.0);
//! assert_eq!(frame.len(), 128 * 128 * 2);
//! ```

mod color_test;
mod engine;
mod faults;
mod geometry;
mod mask;
mod noise;
pub mod overlay;
mod parameters;
pub mod samples;
mod sine;
mod synthesizer;

pub use engine::{PatternEngine, RenderContext};
pub use faults::fault_count;
pub use geometry::{allowed_binning_for, GeometryManager, GeometryView, SensorLimits};
pub use noise::{background_offset, gaussian};
pub use overlay::decode_frame_number;
pub use parameters::ParameterStore;
pub use synthesizer::FrameSynthesizer;
