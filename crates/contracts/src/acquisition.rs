//! Acquisition run model: requests, observable state, and final status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Run length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameCount {
    Bounded(u64),
    /// Run until explicitly stopped
    Unbounded,
}

impl FrameCount {
    /// Map a raw device-layer count; the maximum value is the unbounded sentinel
    pub fn from_raw(count: u64) -> Self {
        if count == u64::MAX {
            FrameCount::Unbounded
        } else {
            FrameCount::Bounded(count)
        }
    }

    /// Whether `delivered` frames complete the run
    pub fn is_reached(&self, delivered: u64) -> bool {
        match self {
            FrameCount::Bounded(target) => delivered >= *target,
            FrameCount::Unbounded => false,
        }
    }
}

impl From<Option<u64>> for FrameCount {
    fn from(value: Option<u64>) -> Self {
        value.map_or(FrameCount::Unbounded, FrameCount::from_raw)
    }
}

impl fmt::Display for FrameCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameCount::Bounded(n) => write!(f, "{n}"),
            FrameCount::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Arguments of `StartSequence`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceRequest {
    pub count: FrameCount,
    /// Minimum spacing between frame starts (synthesized sources only)
    pub interval_ms: f64,
    pub stop_on_overflow: bool,
}

impl SequenceRequest {
    pub fn new(count: FrameCount, interval_ms: f64, stop_on_overflow: bool) -> Self {
        Self {
            count,
            interval_ms,
            stop_on_overflow,
        }
    }

    /// Unbounded run with no interval
    pub fn continuous() -> Self {
        Self::new(FrameCount::Unbounded, 0.0, false)
    }
}

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionPhase {
    #[default]
    Idle,
    Running,
    Stopping,
    Stopped,
}

impl AcquisitionPhase {
    /// Running or winding down; the worker still exists
    pub fn is_active(&self) -> bool {
        matches!(self, AcquisitionPhase::Running | AcquisitionPhase::Stopping)
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "message")]
pub enum RunStatus {
    /// Target frame count reached
    Completed,
    /// Stop requested
    Interrupted,
    /// Sink overflowed with stop-on-overflow set
    Overflow,
    /// Drain loop fault
    Failed(String),
}

impl RunStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Interrupted => "interrupted",
            RunStatus::Overflow => "overflow",
            RunStatus::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Failed(message) => write!(f, "failed: {message}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Passed to the finished notification
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames_delivered: u64,
    pub status: RunStatus,
    pub elapsed: Duration,
}

/// Read-only view of the controller state
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionSnapshot {
    pub phase: AcquisitionPhase,
    pub target: Option<FrameCount>,
    pub frames_delivered: u64,
    pub interval_ms: f64,
    pub suspended: bool,
    /// Time since the current (or last) run started
    pub elapsed: Option<Duration>,
    /// Final status of the last finished run
    pub last_status: Option<RunStatus>,
}
