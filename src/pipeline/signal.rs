//! Counting wake-up primitive for the worker-thread regime.

use parking_lot::{Condvar, Mutex};

/// A counting semaphore.
///
/// The application side calls [`release`](Signal::release) once per queued
/// chunk; the worker blocks in [`acquire`](Signal::acquire) until a permit
/// is available.
#[derive(Debug, Default)]
pub struct Signal {
    permits: Mutex<u64>,
    available: Condvar,
}

impl Signal {
    /// Creates a signal with no permits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one permit and wakes a waiter.
    pub fn release(&self) {
        let mut permits = self.permits.lock();
        *permits = permits.saturating_add(1);
        self.available.notify_one();
    }

    /// Blocks until a permit is available, then takes it.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_release_then_acquire() {
        let signal = Signal::new();
        signal.release();
        signal.release();
        signal.acquire();
        signal.acquire();
        assert_eq!(*signal.permits.lock(), 0);
    }

    #[test]
    fn test_acquire_wakes_on_release() {
        let signal = Arc::new(Signal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.acquire())
        };

        thread::sleep(Duration::from_millis(10));
        signal.release();
        waiter.join().unwrap();
        assert_eq!(*signal.permits.lock(), 0);
    }
}
