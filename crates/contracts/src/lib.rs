//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits
//! for the frame-acquisition pipeline.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Frame Model
//! - `FrameBuffer` is owned by the geometry manager and lent out per call
//! - `CapturedFrame` is what the double-buffer handoff copies out
//! - `Frame` is what a sink receives (data + geometry + metadata)

mod acquisition;
mod blueprint;
mod error;
mod frame;
mod frame_driver;
mod hooks;
mod pixel;
mod sink;
mod synthesis;

pub use acquisition::*;
pub use blueprint::*;
pub use error::*;
pub use frame::*;
pub use frame_driver::{FrameCallback, FrameDriver};
pub use hooks::*;
pub use pixel::*;
pub use sink::*;
pub use synthesis::*;
