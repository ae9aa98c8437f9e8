//! Linear gain for 16-bit PCM.
//!
//! Every path (slice of samples, little-endian byte run, single sample)
//! goes through [`scale_sample`], so results are identical regardless of
//! how the caller holds the audio.

/// Applies `gain` to one sample.
///
/// Rounds to nearest (ties away from zero) and clamps to the `i16` range.
#[inline]
#[must_use]
pub fn scale_sample(sample: i16, gain: f32) -> i16 {
    (f32::from(sample) * gain)
        .round()
        .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

/// Returns `true` if `gain` leaves samples untouched.
#[inline]
#[must_use]
#[allow(clippy::float_cmp)] // exact passthrough only at exactly 1.0
pub fn is_unity(gain: f32) -> bool {
    gain == 1.0
}

/// Returns `true` if `gain` silences samples (zero, negative, or NaN).
#[inline]
#[must_use]
pub fn is_silent(gain: f32) -> bool {
    gain.is_nan() || gain <= 0.0
}

/// Scales a run of samples in place.
///
/// Unity gain is a bit-exact passthrough; zero or negative gain clears the run.
pub fn scale(samples: &mut [i16], gain: f32) {
    if is_unity(gain) {
        return;
    }
    if is_silent(gain) {
        samples.fill(0);
        return;
    }
    for sample in samples.iter_mut() {
        *sample = scale_sample(*sample, gain);
    }
}

/// Scales little-endian 16-bit PCM stored as bytes, in place.
///
/// A trailing odd byte is left untouched unless the gain silences the run.
pub fn scale_bytes(bytes: &mut [u8], gain: f32) {
    if is_unity(gain) {
        return;
    }
    if is_silent(gain) {
        bytes.fill(0);
        return;
    }
    for pair in bytes.chunks_exact_mut(2) {
        let sample = i16::from_le_bytes([pair[0], pair[1]]);
        pair.copy_from_slice(&scale_sample(sample, gain).to_le_bytes());
    }
}
