//! Lock-free gain shared between the stream handle and the device callback.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Shared linear gain for one stream.
///
/// Obtained from [`AudioStream::gain_control()`]. All methods are lock-free
/// and safe to call from any thread; cloning is a single `Arc` increment.
/// A new value takes effect from the next device callback, never on audio
/// already handed to the device.
///
/// [`AudioStream::gain_control()`]: crate::AudioStream::gain_control
#[derive(Clone)]
pub struct GainControl {
    bits: Arc<AtomicU32>,
}

impl GainControl {
    pub(crate) fn new(gain: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(sanitize(gain).to_bits())),
        }
    }

    /// Sets the linear gain. NaN is treated as silence.
    pub fn set(&self, gain: f32) {
        self.bits.store(sanitize(gain).to_bits(), Ordering::Release);
    }

    /// Returns the current linear gain.
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }
}

fn sanitize(gain: f32) -> f32 {
    if gain.is_nan() {
        0.0
    } else {
        gain
    }
}

impl fmt::Debug for GainControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GainControl")
            .field("gain", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gain_round_trip() {
        let gain = GainControl::new(0.75);
        assert_relative_eq!(gain.get(), 0.75);
        gain.set(0.25);
        assert_relative_eq!(gain.get(), 0.25);
    }

    #[test]
    fn test_clones_share_state() {
        let gain = GainControl::new(1.0);
        let other = gain.clone();
        other.set(0.5);
        assert_relative_eq!(gain.get(), 0.5);
    }

    #[test]
    fn test_nan_becomes_silence() {
        let gain = GainControl::new(f32::NAN);
        assert_relative_eq!(gain.get(), 0.0);
    }
}
