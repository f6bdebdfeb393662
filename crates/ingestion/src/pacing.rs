//! Minimum-duration pacing
//!
//! "Don't return before the exposure has elapsed" implemented with timed
//! sleeps instead of polling.

use std::thread;
use std::time::{Duration, Instant};

use crate::signal::StopSignal;

/// Block until `minimum` has elapsed since `start`
pub fn wait_for_elapsed(start: Instant, minimum: Duration) {
    let deadline = start + minimum;
    loop {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        // sleep may return early on some platforms
        thread::sleep(deadline - now);
    }
}

/// Like [`wait_for_elapsed`] but returns early on stop; `true` if stopped
pub fn wait_for_elapsed_or_stop(start: Instant, minimum: Duration, stop: &StopSignal) -> bool {
    stop.wait_until(start + minimum)
}

/// Milliseconds (possibly fractional or negative) to a `Duration`
pub fn millis(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs_f64(ms / 1000.0)
    } else {
        Duration::ZERO
    }
}
