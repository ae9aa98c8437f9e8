//! Conversion between microsecond timestamps and byte offsets.
//!
//! A stream's timeline is a single monotonic byte axis: byte `n` of the
//! ring buffer's logical address space corresponds to the instant
//! `n / bytes_per_second` seconds after the application's epoch. All
//! timestamps are microseconds on an application-defined monotonic clock.

use std::time::Duration;

/// Bytes per 16-bit sample.
pub const BYTES_PER_SAMPLE: u32 = 2;

const MICROS_PER_SECOND: u128 = 1_000_000;

/// Byte-rate arithmetic for one stream format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    bytes_per_second: u64,
    block_align: u64,
}

impl Timeline {
    /// Creates a timeline for 16-bit PCM at the given rate and channel count.
    #[must_use]
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        let block_align = u64::from(channels) * u64::from(BYTES_PER_SAMPLE);
        Self {
            bytes_per_second: u64::from(sample_rate) * block_align,
            block_align,
        }
    }

    /// Returns the stream's byte rate.
    #[must_use]
    pub fn bytes_per_second(&self) -> u64 {
        self.bytes_per_second
    }

    /// Returns the size of one frame (all channels of one sample) in bytes.
    #[must_use]
    pub fn block_align(&self) -> u64 {
        self.block_align
    }

    /// Converts a timestamp in microseconds to a byte offset.
    #[must_use]
    pub fn to_offset(&self, timestamp_us: u64) -> u64 {
        let offset =
            u128::from(timestamp_us) * u128::from(self.bytes_per_second) / MICROS_PER_SECOND;
        u64::try_from(offset).unwrap_or(u64::MAX)
    }

    /// Converts a byte offset to a timestamp in microseconds.
    #[must_use]
    pub fn to_timestamp(&self, offset: u64) -> u64 {
        if self.bytes_per_second == 0 {
            return 0;
        }
        let timestamp =
            u128::from(offset) * MICROS_PER_SECOND / u128::from(self.bytes_per_second);
        u64::try_from(timestamp).unwrap_or(u64::MAX)
    }

    /// Rounds `offset` to the nearest multiple of `quantum`.
    ///
    /// Ties round down, so a chunk that arrives exactly half a quantum late
    /// keeps its slot.
    #[must_use]
    pub fn quantize(&self, offset: u64, quantum: u64) -> u64 {
        if quantum == 0 {
            return offset;
        }
        let biased = offset.saturating_add((quantum / 2).saturating_sub(1));
        biased - biased % quantum
    }

    /// Rounds `offset` down to a multiple of `quantum`.
    #[must_use]
    pub fn align_down(&self, offset: u64, quantum: u64) -> u64 {
        if quantum == 0 {
            return offset;
        }
        offset - offset % quantum
    }

    /// Returns the whole-frame byte count covering `duration`.
    #[must_use]
    pub fn bytes_for(&self, duration: Duration) -> u64 {
        let bytes = duration.as_micros() * u128::from(self.bytes_per_second) / MICROS_PER_SECOND;
        let bytes = u64::try_from(bytes).unwrap_or(u64::MAX);
        self.align_down(bytes, self.block_align)
    }

    /// Returns the playback duration of `bytes` bytes.
    #[must_use]
    pub fn duration_of(&self, bytes: u64) -> Duration {
        Duration::from_micros(self.to_timestamp(bytes))
    }

    /// Returns `true` if `len` bytes hold a whole number of frames.
    #[must_use]
    pub fn is_frame_aligned(&self, len: u64) -> bool {
        self.block_align != 0 && len % self.block_align == 0
    }
}

/// Applies a signed microsecond correction to a timestamp, saturating at
/// the ends of the `u64` range.
#[must_use]
pub fn apply_adjust(timestamp_us: u64, adjust_us: i64) -> u64 {
    timestamp_us.saturating_add_signed(adjust_us)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_48k() -> Timeline {
        Timeline::new(48000, 2)
    }

    #[test]
    fn test_bytes_per_second() {
        let timeline = stereo_48k();
        assert_eq!(timeline.bytes_per_second(), 192_000);
        assert_eq!(timeline.block_align(), 4);
    }

    #[test]
    fn test_to_offset() {
        let timeline = stereo_48k();
        assert_eq!(timeline.to_offset(0), 0);
        assert_eq!(timeline.to_offset(20_000), 3840);
        assert_eq!(timeline.to_offset(1_000_000), 192_000);
    }

    #[test]
    fn test_to_timestamp() {
        let timeline = stereo_48k();
        assert_eq!(timeline.to_timestamp(192_000), 1_000_000);
        assert_eq!(timeline.to_timestamp(3840), 20_000);
    }

    #[test]
    fn test_round_trip_within_one_unit() {
        let timeline = Timeline::new(44100, 2);
        for t in [0u64, 1, 7, 999, 22_675, 1_000_003, 86_400_000_000] {
            let back = timeline.to_timestamp(timeline.to_offset(t));
            // One byte at 176400 B/s is ~5.7us.
            assert!(t - back <= 6, "t={t} back={back}");
        }
    }

    #[test]
    fn test_large_timestamps_do_not_overflow() {
        let timeline = Timeline::new(192_000, 8);
        let offset = timeline.to_offset(u64::MAX / 2);
        assert!(offset > 0);
    }

    #[test]
    fn test_quantize_rounds_to_nearest() {
        let timeline = stereo_48k();
        assert_eq!(timeline.quantize(0, 4096), 0);
        assert_eq!(timeline.quantize(2047, 4096), 0);
        assert_eq!(timeline.quantize(2048, 4096), 0);
        assert_eq!(timeline.quantize(2049, 4096), 4096);
        assert_eq!(timeline.quantize(3840, 4096), 4096);
        assert_eq!(timeline.quantize(7680, 4096), 8192);
    }

    #[test]
    fn test_quantize_degenerate_quantum() {
        let timeline = stereo_48k();
        assert_eq!(timeline.quantize(1234, 0), 1234);
        assert_eq!(timeline.quantize(1234, 1), 1234);
    }

    #[test]
    fn test_bytes_for_is_frame_aligned() {
        let timeline = Timeline::new(44100, 2);
        let bytes = timeline.bytes_for(Duration::from_millis(125));
        assert_eq!(bytes % 4, 0);
        assert_eq!(bytes, 22048);
    }

    #[test]
    fn test_apply_adjust_saturates() {
        assert_eq!(apply_adjust(100, -50), 50);
        assert_eq!(apply_adjust(100, -500), 0);
        assert_eq!(apply_adjust(u64::MAX, 10), u64::MAX);
    }

    #[test]
    fn test_frame_alignment() {
        let timeline = stereo_48k();
        assert!(timeline.is_frame_aligned(4096));
        assert!(!timeline.is_frame_aligned(4098));
    }
}
