//! Cooperative stop signal
//!
//! An atomic flag paired with a condvar so sleepers (pacing waits, driver
//! loops) wake as soon as a stop is requested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct SharedState {
    stopped: AtomicBool,
    mutex: Mutex<()>,
    condvar: Condvar,
}

/// Clonable stop flag with interruptible waits
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    shared: Arc<SharedState>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request stop and wake every waiter
    pub fn stop(&self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        let _guard = self
            .shared
            .mutex
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.shared.condvar.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    /// Clear the flag for reuse
    pub fn reset(&self) {
        self.shared.stopped.store(false, Ordering::SeqCst);
    }

    /// Sleep until `deadline` or a stop; returns `true` if stopped
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut guard = self
            .shared
            .mutex
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if self.is_stopped() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = self
                .shared
                .condvar
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Sleep for `duration` or until a stop; returns `true` if stopped
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        self.wait_until(Instant::now() + duration)
    }
}
