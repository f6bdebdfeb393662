//! Sink metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for the sink behind one adapter
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Frames currently buffered by the sink (when it reports one)
    buffered_len: AtomicUsize,
    /// Deliver calls
    delivery_count: AtomicU64,
    /// Frames the sink accepted
    write_count: AtomicU64,
    /// Insert calls, retries included
    insert_count: AtomicU64,
    /// Overflow reports from the sink
    overflow_count: AtomicU64,
    /// Clears issued by the retry policy
    clear_count: AtomicU64,
    /// Deliveries that ended in an error
    failure_count: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffered_len(&self) -> usize {
        self.buffered_len.load(Ordering::Relaxed)
    }

    pub fn set_buffered_len(&self, len: usize) {
        self.buffered_len.store(len, Ordering::Relaxed);
    }

    pub fn delivery_count(&self) -> u64 {
        self.delivery_count.load(Ordering::Relaxed)
    }

    pub fn inc_delivery_count(&self) {
        self.delivery_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    pub fn inc_write_count(&self) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn insert_count(&self) -> u64 {
        self.insert_count.load(Ordering::Relaxed)
    }

    pub fn inc_insert_count(&self) {
        self.insert_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn overflow_count(&self) -> u64 {
        self.overflow_count.load(Ordering::Relaxed)
    }

    pub fn inc_overflow_count(&self) {
        self.overflow_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn clear_count(&self) -> u64 {
        self.clear_count.load(Ordering::Relaxed)
    }

    pub fn inc_clear_count(&self) {
        self.clear_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            buffered_len: self.buffered_len(),
            delivery_count: self.delivery_count(),
            write_count: self.write_count(),
            insert_count: self.insert_count(),
            overflow_count: self.overflow_count(),
            clear_count: self.clear_count(),
            failure_count: self.failure_count(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub buffered_len: usize,
    pub delivery_count: u64,
    pub write_count: u64,
    pub insert_count: u64,
    pub overflow_count: u64,
    pub clear_count: u64,
    pub failure_count: u64,
}
