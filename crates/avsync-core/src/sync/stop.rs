//! Interruptible sleep for the presentation loop

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// One-way stop flag that can cut a sleep short
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake any sleeper. Idempotent.
    pub fn request_stop(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleep for `duration` unless a stop is requested first
    ///
    /// Returns `true` if the full duration elapsed, `false` if the sleep was
    /// aborted (or the flag was already raised).
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.wake.wait_until(&mut stopped, deadline).timed_out() {
                return !*stopped;
            }
        }
        false
    }
}
