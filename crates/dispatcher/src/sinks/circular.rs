//! CircularBufferSink - bounded in-memory frame ring

use std::sync::{Arc, Mutex, PoisonError};

use contracts::{CameraError, Frame, FrameSink, SinkStatus};
use ringbuf::{traits::*, HeapRb};
use tracing::trace;

/// Shared handle to the ring; the sink pushes, consumers pop
#[derive(Clone)]
pub struct FrameRing {
    inner: Arc<Mutex<HeapRb<Frame>>>,
    capacity: usize,
}

impl std::fmt::Debug for FrameRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRing")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl FrameRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(HeapRb::new(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Take the oldest buffered frame
    pub fn pop(&self) -> Option<Frame> {
        self.lock().try_pop()
    }

    /// Take every buffered frame, oldest first
    pub fn drain(&self) -> Vec<Frame> {
        let mut ring = self.lock();
        let mut frames = Vec::with_capacity(ring.occupied_len());
        while let Some(frame) = ring.try_pop() {
            frames.push(frame);
        }
        frames
    }

    fn push(&self, frame: Frame) -> Result<(), Frame> {
        self.lock().try_push(frame)
    }

    fn clear(&self) -> usize {
        let mut ring = self.lock();
        let mut dropped = 0;
        while ring.try_pop().is_some() {
            dropped += 1;
        }
        dropped
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HeapRb<Frame>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sink that stores frames until a consumer pops them
pub struct CircularBufferSink {
    name: String,
    ring: FrameRing,
}

impl CircularBufferSink {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            ring: FrameRing::new(capacity),
        }
    }

    /// Consumer handle
    pub fn ring(&self) -> FrameRing {
        self.ring.clone()
    }
}

impl FrameSink for CircularBufferSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn insert(&mut self, frame: &Frame) -> Result<SinkStatus, CameraError> {
        match self.ring.push(frame.clone()) {
            Ok(()) => Ok(SinkStatus::Accepted),
            Err(rejected) => {
                trace!(
                    sink = %self.name,
                    frame_index = rejected.metadata.frame_index,
                    "Ring full"
                );
                Ok(SinkStatus::Overflow)
            }
        }
    }

    fn clear(&mut self) -> Result<(), CameraError> {
        let dropped = self.ring.clear();
        trace!(sink = %self.name, dropped, "Ring cleared");
        Ok(())
    }

    fn buffered_len(&self) -> usize {
        self.ring.len()
    }
}
