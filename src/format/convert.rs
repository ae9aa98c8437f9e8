//! Sample format conversion between device and stream representations.

/// Converts an f32 sample to i16.
///
/// Input should be in the range [-1.0, 1.0].
/// Values outside this range are clamped.
///
/// Uses × 32767 (not 32768) for symmetric scaling. This means -1.0 maps
/// to -32767 rather than -32768, losing 1 LSB at the negative extreme.
#[inline]
#[must_use]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Converts an i16 sample to f32 in the range [-1.0, 1.0].
#[inline]
#[must_use]
pub fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

/// Encodes samples as little-endian bytes.
#[must_use]
pub fn i16_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Decodes little-endian bytes into samples. A trailing odd byte is ignored.
#[must_use]
pub fn le_bytes_to_i16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Decodes little-endian bytes into an existing sample slice.
///
/// Writes `min(bytes.len() / 2, out.len())` samples and returns that count.
pub fn decode_le_into(bytes: &[u8], out: &mut [i16]) -> usize {
    let mut written = 0;
    for (pair, slot) in bytes.chunks_exact(2).zip(out.iter_mut()) {
        *slot = i16::from_le_bytes([pair[0], pair[1]]);
        written += 1;
    }
    written
}

/// Encodes samples into an existing byte slice as little-endian.
///
/// Writes `min(samples.len(), out.len() / 2)` samples and returns the byte count.
pub fn encode_le_into(samples: &[i16], out: &mut [u8]) -> usize {
    let mut written = 0;
    for (sample, pair) in samples.iter().zip(out.chunks_exact_mut(2)) {
        pair.copy_from_slice(&sample.to_le_bytes());
        written += 2;
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_to_i16_full_range() {
        assert_eq!(f32_to_i16(1.0), 32767);
        assert_eq!(f32_to_i16(-1.0), -32767);
        assert_eq!(f32_to_i16(0.0), 0);
    }

    #[test]
    fn test_f32_to_i16_clamping() {
        assert_eq!(f32_to_i16(2.0), 32767);
        assert_eq!(f32_to_i16(-2.0), -32768);
    }

    #[test]
    fn test_i16_to_f32_full_range() {
        assert!((i16_to_f32(32767) - 1.0).abs() < 0.001);
        assert!((i16_to_f32(-32768) - -1.0).abs() < 0.001);
        assert_eq!(i16_to_f32(0), 0.0);
    }

    #[test]
    fn test_le_bytes() {
        let samples = [1i16, -1, 256];
        let bytes = i16_to_le_bytes(&samples);
        assert_eq!(bytes, vec![1, 0, 0xff, 0xff, 0, 1]);
        assert_eq!(le_bytes_to_i16(&bytes), samples.to_vec());
    }

    #[test]
    fn test_decode_into_short_output() {
        let bytes = i16_to_le_bytes(&[5, 6, 7]);
        let mut out = [0i16; 2];
        assert_eq!(decode_le_into(&bytes, &mut out), 2);
        assert_eq!(out, [5, 6]);
    }

    #[test]
    fn test_encode_into_short_output() {
        let mut out = [0u8; 3];
        assert_eq!(encode_le_into(&[0x0102, 0x0304], &mut out), 2);
        assert_eq!(out, [2, 1, 0]);
    }
}
