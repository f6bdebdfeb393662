//! Double-buffer frame handoff
//!
//! Two independently locked slots plus a "new frame" flag. The producer
//! never blocks on a slot: it writes whichever slot it can lock (preferring
//! the one holding the older frame) and skips the frame if both are busy.
//! The consumer waits on the flag with a timeout, then copies out the oldest
//! slot newer than the last frame it delivered.
//!
//! A frame may be overwritten before it is drained; no frame is ever
//! drained twice and drained sequence numbers strictly increase.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

use bytes::Bytes;
use contracts::{CapturedFrame, FrameGeometry};
use tracing::trace;

/// Sequence number of an empty slot
pub const EMPTY_SEQUENCE: i64 = -1;

#[derive(Debug)]
struct FrameSlot {
    sequence: i64,
    geometry: Option<FrameGeometry>,
    data: Vec<u8>,
}

impl FrameSlot {
    fn empty(capacity: usize) -> Self {
        Self {
            sequence: EMPTY_SEQUENCE,
            geometry: None,
            data: Vec::with_capacity(capacity),
        }
    }
}

/// Result of a producer publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Stored { slot: usize, sequence: i64 },
    /// Both slots were locked; frame dropped
    Skipped,
}

/// Result of a consumer drain
#[derive(Debug, Clone)]
pub enum DrainOutcome {
    Frame(CapturedFrame),
    /// Timed out or nothing newer was available; re-check later
    Empty,
}

/// Handoff counters
#[derive(Debug, Default)]
pub struct HandoffMetrics {
    published: AtomicU64,
    skipped: AtomicU64,
    drained: AtomicU64,
    wait_timeouts: AtomicU64,
}

impl HandoffMetrics {
    pub fn snapshot(&self) -> HandoffSnapshot {
        HandoffSnapshot {
            published: self.published.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
            wait_timeouts: self.wait_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandoffSnapshot {
    pub published: u64,
    pub skipped: u64,
    pub drained: u64,
    pub wait_timeouts: u64,
}

/// Two-slot producer/consumer handoff, owned by one acquisition run
#[derive(Debug)]
pub struct FrameHandoff {
    slots: [Mutex<FrameSlot>; 2],
    counter: AtomicI64,
    new_frame: Mutex<bool>,
    signal: Condvar,
    metrics: HandoffMetrics,
}

impl Default for FrameHandoff {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameHandoff {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Preallocate both slots for frames of `frame_bytes`
    pub fn with_capacity(frame_bytes: usize) -> Self {
        Self {
            slots: [
                Mutex::new(FrameSlot::empty(frame_bytes)),
                Mutex::new(FrameSlot::empty(frame_bytes)),
            ],
            counter: AtomicI64::new(EMPTY_SEQUENCE),
            new_frame: Mutex::new(false),
            signal: Condvar::new(),
            metrics: HandoffMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &HandoffMetrics {
        &self.metrics
    }

    /// Last sequence number handed to a producer
    pub fn last_sequence(&self) -> i64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Copy a completed frame into a free slot without blocking
    pub fn publish(&self, data: &[u8], geometry: &FrameGeometry) -> PublishOutcome {
        let mut guards = [try_lock(&self.slots[0]), try_lock(&self.slots[1])];

        let target = (0..2)
            .filter_map(|i| guards[i].as_ref().map(|g| (g.sequence, i)))
            .min()
            .map(|(_, i)| i);

        let Some(index) = target else {
            self.metrics.skipped.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("camsim_handoff_skipped_total").increment(1);
            trace!("Both slots busy, frame skipped");
            return PublishOutcome::Skipped;
        };

        let Some(mut slot) = guards[index].take() else {
            return PublishOutcome::Skipped;
        };
        // release the other slot before copying
        drop(guards);

        slot.data.clear();
        slot.data.extend_from_slice(data);
        slot.geometry = Some(*geometry);
        let sequence = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        slot.sequence = sequence;
        drop(slot);

        self.metrics.published.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("camsim_handoff_published_total").increment(1);
        self.raise();
        PublishOutcome::Stored {
            slot: index,
            sequence,
        }
    }

    /// Wait up to `timeout` for a frame newer than `last_delivered`
    pub fn drain(&self, last_delivered: i64, timeout: Duration) -> DrainOutcome {
        {
            let flag = self
                .new_frame
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let (mut flag, _) = self
                .signal
                .wait_timeout_while(flag, timeout, |ready| !*ready)
                .unwrap_or_else(PoisonError::into_inner);
            if !*flag {
                self.metrics.wait_timeouts.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("camsim_handoff_wait_timeouts_total").increment(1);
                return DrainOutcome::Empty;
            }
            *flag = false;
        }

        match self.take_newer(last_delivered) {
            Some(frame) => {
                if self.holds_newer(frame.sequence) {
                    self.raise();
                }
                self.metrics.drained.fetch_add(1, Ordering::Relaxed);
                DrainOutcome::Frame(frame)
            }
            None => DrainOutcome::Empty,
        }
    }

    /// Mark both slots empty (geometry changed under a running sequence)
    pub fn invalidate(&self) {
        for slot in &self.slots {
            let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
            slot.sequence = EMPTY_SEQUENCE;
            slot.geometry = None;
        }
        trace!("Handoff slots invalidated");
    }

    fn raise(&self) {
        let mut flag = self
            .new_frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *flag = true;
        self.signal.notify_one();
    }

    fn take_newer(&self, last_delivered: i64) -> Option<CapturedFrame> {
        let guards = [try_lock(&self.slots[0]), try_lock(&self.slots[1])];

        let (_, index) = (0..2)
            .filter_map(|i| {
                guards[i]
                    .as_ref()
                    .filter(|g| g.sequence > last_delivered && g.geometry.is_some())
                    .map(|g| (g.sequence, i))
            })
            .min()?;

        let slot = guards[index].as_ref()?;
        Some(CapturedFrame {
            sequence: slot.sequence,
            geometry: slot.geometry?,
            data: Bytes::copy_from_slice(&slot.data),
        })
    }

    fn holds_newer(&self, sequence: i64) -> bool {
        self.slots.iter().any(|slot| {
            try_lock(slot).is_some_and(|g| g.sequence > sequence && g.geometry.is_some())
        })
    }
}

fn try_lock(slot: &Mutex<FrameSlot>) -> Option<MutexGuard<'_, FrameSlot>> {
    match slot.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}
