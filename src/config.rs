//! Configuration types for audio streams.

use std::time::Duration;

use crate::timeline::Timeline;
use crate::StreamTimelineError;

/// Which way audio flows through a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Application queues timestamped audio; the device plays it.
    #[default]
    Playback,
    /// The device captures audio; the application dequeues it.
    Capture,
}

impl Direction {
    /// Returns `true` for capture streams.
    #[must_use]
    pub fn is_capture(self) -> bool {
        self == Self::Capture
    }

    /// Device-side name of the direction, for diagnostics.
    #[must_use]
    pub fn device_kind(self) -> &'static str {
        match self {
            Self::Playback => "output",
            Self::Capture => "input",
        }
    }
}

/// Drift-correction tuning.
///
/// All durations are converted to whole-frame byte counts for the
/// stream's format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Maximum distance tolerated between the send and pick cursors.
    ///
    /// Default: 500ms
    pub jitter_window: Duration,

    /// How far behind its reference a snapped cursor is placed.
    ///
    /// Must be smaller than `jitter_window`.
    /// Default: 100ms
    pub snap_back: Duration,

    /// Runway, in device quanta, between the consumer seed and the first
    /// chunk when a playback stream primes.
    ///
    /// Default: 2
    pub default_gap: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            jitter_window: Duration::from_millis(500),
            snap_back: Duration::from_millis(100),
            default_gap: 2,
        }
    }
}

/// Configuration for one stream instance.
///
/// Channel count and sample rate are fixed for the stream's lifetime;
/// samples are always 16-bit signed little-endian PCM.
///
/// # Example
///
/// ```
/// use stream_timeline::{Direction, StreamConfig};
/// use std::time::Duration;
///
/// let config = StreamConfig {
///     direction: Direction::Capture,
///     buffer_duration: Duration::from_secs(4),
///     ..Default::default()
/// };
/// assert_eq!(config.buffer_capacity(), 48000 * 2 * 2 * 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    /// Number of interleaved channels.
    ///
    /// Default: 2
    pub channels: u16,

    /// Frames per second.
    ///
    /// Default: 48000
    pub sample_rate: u32,

    /// Length of audio the ring buffer holds.
    ///
    /// Default: 2 seconds
    pub buffer_duration: Duration,

    /// Playback or capture.
    pub direction: Direction,

    /// Gain applied to samples until [`set_volume`] is called.
    ///
    /// Default: 1.0
    ///
    /// [`set_volume`]: crate::AudioStream::set_volume
    pub initial_gain: f32,

    /// Drift-correction tuning.
    pub sync: SyncConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 48000,
            buffer_duration: Duration::from_secs(2),
            direction: Direction::Playback,
            initial_gain: 1.0,
            sync: SyncConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Returns the byte-rate arithmetic for this format.
    #[must_use]
    pub fn timeline(&self) -> Timeline {
        Timeline::new(self.sample_rate, self.channels)
    }

    /// Returns the ring buffer capacity in bytes.
    #[must_use]
    pub fn buffer_capacity(&self) -> u64 {
        self.timeline().bytes_for(self.buffer_duration)
    }

    /// Checks the configuration for values a stream cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`StreamTimelineError::InvalidConfig`] describing the first
    /// problem found.
    pub fn validate(&self) -> Result<(), StreamTimelineError> {
        if self.channels == 0 {
            return Err(StreamTimelineError::invalid_config(
                "channels must be non-zero",
            ));
        }
        if self.sample_rate == 0 {
            return Err(StreamTimelineError::invalid_config(
                "sample rate must be non-zero",
            ));
        }
        let capacity = self.buffer_capacity();
        if capacity == 0 {
            return Err(StreamTimelineError::invalid_config(
                "buffer duration holds no audio",
            ));
        }
        if usize::try_from(capacity).is_err() {
            return Err(StreamTimelineError::invalid_config(
                "buffer duration exceeds addressable memory",
            ));
        }
        if self.sync.snap_back >= self.sync.jitter_window {
            return Err(StreamTimelineError::invalid_config(format!(
                "snap back ({:?}) must be shorter than the jitter window ({:?})",
                self.sync.snap_back, self.sync.jitter_window
            )));
        }
        if self.sync.jitter_window >= self.buffer_duration {
            return Err(StreamTimelineError::invalid_config(format!(
                "jitter window ({:?}) must be shorter than the buffer ({:?})",
                self.sync.jitter_window, self.buffer_duration
            )));
        }
        if !self.initial_gain.is_finite() {
            return Err(StreamTimelineError::invalid_config(
                "initial gain must be finite",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_config_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.channels, 2);
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.buffer_duration, Duration::from_secs(2));
        assert_eq!(config.direction, Direction::Playback);
        assert!((config.initial_gain - 1.0).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sync_config_defaults() {
        let sync = SyncConfig::default();
        assert_eq!(sync.jitter_window, Duration::from_millis(500));
        assert_eq!(sync.snap_back, Duration::from_millis(100));
        assert_eq!(sync.default_gap, 2);
    }

    #[test]
    fn test_buffer_capacity() {
        let config = StreamConfig {
            channels: 1,
            sample_rate: 16000,
            buffer_duration: Duration::from_secs(3),
            ..Default::default()
        };
        assert_eq!(config.buffer_capacity(), 16000 * 2 * 3);
    }

    #[test]
    fn test_validate_rejects_zero_channels() {
        let config = StreamConfig {
            channels: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StreamTimelineError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_rate() {
        let config = StreamConfig {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_snap_larger_than_window() {
        let config = StreamConfig {
            sync: SyncConfig {
                snap_back: Duration::from_millis(600),
                ..SyncConfig::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("snap back"));
    }

    #[test]
    fn test_validate_rejects_window_larger_than_buffer() {
        let config = StreamConfig {
            buffer_duration: Duration::from_millis(400),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jitter window"));
    }

    #[test]
    fn test_validate_rejects_nan_gain() {
        let config = StreamConfig {
            initial_gain: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_direction_kind() {
        assert_eq!(Direction::Playback.device_kind(), "output");
        assert!(Direction::Capture.is_capture());
    }
}
