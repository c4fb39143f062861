//! Busy-wait delays for the ramp sweep.
//!
//! A scheduler sleep rounds up to tens of microseconds at best, so per-step pauses spin on a monotonic clock instead.

use std::time::{Duration, Instant};

///Spin the calling thread for at least `duration`. Never yields.
///
/// A zero duration returns immediately.
pub fn spin_delay(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}
