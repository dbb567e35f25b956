//! Condvar-backed wakeup events.
//!
//! The runtime's cross-thread signaling uses manual-reset events: workers and
//! the poller set them, the main thread waits with a bounded timeout.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// A manual-reset event.
///
/// `set` wakes all waiters and leaves the event signaled until `clear`.
#[derive(Debug, Default)]
pub struct WakeEvent {
    state: Mutex<bool>,
    cond: Condvar,
}

impl WakeEvent {
    /// Creates an unsignaled event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals the event, waking all current and future waiters.
    pub fn set(&self) {
        let mut signaled = self.state.lock().unwrap();
        *signaled = true;
        self.cond.notify_all();
    }

    /// Returns the event to the unsignaled state.
    pub fn clear(&self) {
        *self.state.lock().unwrap() = false;
    }

    /// Whether the event is currently signaled.
    pub fn is_set(&self) -> bool {
        *self.state.lock().unwrap()
    }

    /// Blocks until the event is signaled.
    pub fn wait(&self) {
        let mut signaled = self.state.lock().unwrap();
        while !*signaled {
            signaled = self.cond.wait(signaled).unwrap();
        }
    }

    /// Blocks until the event is signaled, then atomically clears it.
    pub fn wait_and_clear(&self) {
        let mut signaled = self.state.lock().unwrap();
        while !*signaled {
            signaled = self.cond.wait(signaled).unwrap();
        }
        *signaled = false;
    }

    /// Blocks until the event is signaled or `timeout` elapses.
    ///
    /// Returns `true` if the event was signaled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut signaled = self.state.lock().unwrap();
        let deadline = std::time::Instant::now() + timeout;
        while !*signaled {
            let now = std::time::Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, result) = self.cond.wait_timeout(signaled, deadline - now).unwrap();
            signaled = guard;
            if result.timed_out() && !*signaled {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn set_wakes_a_waiter() {
        let event = Arc::new(WakeEvent::new());
        let remote = event.clone();
        let waiter = thread::spawn(move || remote.wait());
        thread::sleep(Duration::from_millis(10));
        event.set();
        waiter.join().unwrap();
        assert!(event.is_set());
    }

    #[test]
    fn wait_timeout_reports_expiry() {
        let event = WakeEvent::new();
        assert!(!event.wait_timeout(Duration::from_millis(5)));
        event.set();
        assert!(event.wait_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn clear_resets_the_event() {
        let event = WakeEvent::new();
        event.set();
        event.clear();
        assert!(!event.is_set());
    }
}
