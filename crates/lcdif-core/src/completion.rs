//! One-shot completion shared across the requester/interrupt boundary.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// A completion variable: signaled from the interrupt context, timed-waited
/// from the requester context, explicitly re-armed before each wait.
///
/// `complete` never blocks beyond the internal flag lock, which is only ever
/// held for a flag read/write, so it is safe to call from a context that must
/// not sleep.
#[derive(Clone, Default)]
pub struct Completion {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears any previous signal. Must be called before arming the
    /// interrupt source for a new wait.
    pub fn rearm(&self) {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap() = false;
    }

    /// Signals the completion and wakes all waiters.
    pub fn complete(&self) {
        let (flag, cv) = &*self.inner;
        *flag.lock().unwrap() = true;
        cv.notify_all();
    }

    /// Blocks until the completion is signaled or `timeout` elapses.
    /// Returns `false` on timeout.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let (flag, cv) = &*self.inner;
        let mut done = flag.lock().unwrap();
        while !*done {
            let Some(remaining) = deadline.checked_duration_since(std::time::Instant::now())
            else {
                return false;
            };
            let (guard, result) = cv.wait_timeout(done, remaining).unwrap();
            done = guard;
            if result.timed_out() {
                return *done;
            }
        }
        true
    }
}
