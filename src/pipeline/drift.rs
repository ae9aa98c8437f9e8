//! Bounded resynchronization of the send and pick cursors.
//!
//! The device consumes audio on a rigid hardware cadence while the
//! application produces it whenever packets arrive. Instead of letting the
//! distance between the two cursors grow without bound (latency) or go
//! negative (reading unwritten memory), the lagging cursor is snapped to a
//! fixed distance from the other one. A snap is heard as a short gap or a
//! short repeat of silence.

use crate::config::SyncConfig;
use crate::timeline::{apply_adjust, Timeline};

/// A discontinuous cursor move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resync {
    /// Cursor value before the snap.
    pub from: u64,
    /// Cursor value after the snap.
    pub to: u64,
}

/// Drift policy expressed in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftCorrector {
    half_window: u64,
    snap_back: u64,
}

impl DriftCorrector {
    /// Creates a corrector from raw byte distances.
    #[must_use]
    pub fn new(half_window: u64, snap_back: u64) -> Self {
        Self {
            half_window,
            snap_back,
        }
    }

    /// Creates a corrector from durations, frame aligned for `timeline`.
    #[must_use]
    pub fn from_config(timeline: &Timeline, sync: &SyncConfig) -> Self {
        Self::new(
            timeline.bytes_for(sync.jitter_window),
            timeline.bytes_for(sync.snap_back),
        )
    }

    /// Maximum tolerated distance between the cursors.
    #[must_use]
    pub fn half_window(&self) -> u64 {
        self.half_window
    }

    /// Distance a snapped cursor is placed behind its reference.
    #[must_use]
    pub fn snap_back(&self) -> u64 {
        self.snap_back
    }

    /// Producer check against the position a new chunk's timestamp maps to.
    ///
    /// Snaps when the producer lags `target` by more than the window, or is
    /// ahead of it (the caller's clock stepped backwards).
    #[must_use]
    pub fn producer(&self, send: u64, target: u64) -> Option<Resync> {
        if send.saturating_add(self.half_window) < target || send > target {
            Some(Resync {
                from: send,
                to: target.saturating_sub(self.snap_back),
            })
        } else {
            None
        }
    }

    /// Consumer check against the producer cursor.
    ///
    /// Snaps when the consumer has fallen more than the window behind, or
    /// has overtaken the producer.
    #[must_use]
    pub fn consumer(&self, pick: u64, send: u64) -> Option<Resync> {
        if pick.saturating_add(self.half_window) < send || pick > send {
            Some(Resync {
                from: pick,
                to: send.saturating_sub(self.snap_back),
            })
        } else {
            None
        }
    }

    /// Returns `true` if `send` lies within `[pick, pick + half_window]`.
    #[must_use]
    pub fn within_window(&self, send: u64, pick: u64) -> bool {
        send >= pick && send <= pick.saturating_add(self.half_window)
    }
}

/// Cursor seed computed when the first chunk primes a playback stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialSync {
    /// Starting consumer offset.
    pub pick: u64,
    /// Adjust recorded with the seed, in microseconds.
    pub pick_adjust: i64,
}

/// Seeds the consumer cursor for the first chunk.
///
/// If the chunk arrived late (`now > timestamp`) the consumer's baseline is
/// shifted back by the lateness, so the chunk is played rather than
/// skipped. The seed sits `gap` quanta behind the baseline to give the
/// device a short runway before drift correction engages.
#[must_use]
pub fn initial_sync(
    timeline: &Timeline,
    now_us: u64,
    timestamp_us: u64,
    adjust_us: i64,
    quantum: u64,
    gap: u32,
) -> InitialSync {
    let late = if now_us > timestamp_us {
        i64::try_from(now_us - timestamp_us).map_or(i64::MIN, |lateness| -lateness)
    } else {
        0
    };
    let pick_adjust = adjust_us.saturating_add(late);

    let baseline = timeline.align_down(
        timeline.to_offset(apply_adjust(now_us, pick_adjust)),
        quantum,
    );
    let runway = quantum.saturating_mul(u64::from(gap));

    InitialSync {
        pick: baseline.saturating_sub(runway),
        pick_adjust,
    }
}
