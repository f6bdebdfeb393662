//! # Sequencer
//!
//! Acquisition sequence controller.
//!
//! State machine:
//!
//! ```text
//! Idle --start--> Running --stop--> Stopping --worker exits--> Stopped --start--> Running
//!                    \------------ count reached / overflow / fault ------------^
//! ```
//!
//! One worker thread per run drains the double-buffer handoff and delivers
//! frames through the sink adapter. The run's handoff is allocated at start
//! and released when the worker exits.

mod controller;
mod worker;

pub use controller::{ControllerConfig, SequenceController};
