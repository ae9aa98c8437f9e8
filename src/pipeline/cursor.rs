//! Send/pick cursor pair shared between the producer and consumer sides.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// The two logical offsets into the ring buffer.
///
/// `send` is advanced only by the producer side (the application for
/// playback, the device callback for capture) and `pick` only by the
/// consumer side. Each side may read the other's cursor at any time.
#[derive(Debug, Default)]
pub struct CursorPair {
    send: AtomicU64,
    pick: AtomicU64,
    send_adjust: AtomicI64,
    pick_adjust: AtomicI64,
}

impl CursorPair {
    /// Creates a cursor pair at offset zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Producer cursor: one past the last byte written.
    pub fn send(&self) -> u64 {
        self.send.load(Ordering::Acquire)
    }

    /// Consumer cursor: one past the last byte consumed.
    pub fn pick(&self) -> u64 {
        self.pick.load(Ordering::Acquire)
    }

    /// Moves the producer cursor.
    pub fn set_send(&self, offset: u64) {
        self.send.store(offset, Ordering::Release);
    }

    /// Moves the consumer cursor.
    pub fn set_pick(&self, offset: u64) {
        self.pick.store(offset, Ordering::Release);
    }

    /// Adjust in effect when the send cursor was last rebaselined.
    pub fn send_adjust(&self) -> i64 {
        self.send_adjust.load(Ordering::Acquire)
    }

    /// Adjust in effect when the pick cursor was last seeded.
    pub fn pick_adjust(&self) -> i64 {
        self.pick_adjust.load(Ordering::Acquire)
    }

    /// Records the adjust used for the send baseline.
    pub fn set_send_adjust(&self, adjust: i64) {
        self.send_adjust.store(adjust, Ordering::Release);
    }

    /// Records the adjust used for the pick seed.
    pub fn set_pick_adjust(&self, adjust: i64) {
        self.pick_adjust.store(adjust, Ordering::Release);
    }

    /// Reads both cursors.
    pub fn snapshot(&self) -> CursorSnapshot {
        CursorSnapshot {
            send: self.send(),
            pick: self.pick(),
        }
    }
}

/// A point-in-time copy of the cursor pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorSnapshot {
    /// Producer cursor.
    pub send: u64,
    /// Consumer cursor.
    pub pick: u64,
}

impl CursorSnapshot {
    /// Bytes written but not yet consumed; zero if the consumer is ahead.
    #[must_use]
    pub fn available(&self) -> u64 {
        self.send.saturating_sub(self.pick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_pair_starts_at_zero() {
        let cursors = CursorPair::new();
        assert_eq!(cursors.snapshot(), CursorSnapshot::default());
        assert_eq!(cursors.send_adjust(), 0);
        assert_eq!(cursors.pick_adjust(), 0);
    }

    #[test]
    fn test_cursor_updates() {
        let cursors = CursorPair::new();
        cursors.set_send(8192);
        cursors.set_pick(4096);
        cursors.set_pick_adjust(-20_000);

        let snapshot = cursors.snapshot();
        assert_eq!(snapshot.available(), 4096);
        assert_eq!(cursors.pick_adjust(), -20_000);
    }

    #[test]
    fn test_available_saturates() {
        let snapshot = CursorSnapshot { send: 10, pick: 20 };
        assert_eq!(snapshot.available(), 0);
    }
}
