//! Fixed-capacity byte store addressed by 64-bit logical offsets.

/// A circular byte buffer addressed by monotonically increasing offsets.
///
/// There is no head or tail: every access names an absolute logical
/// offset, which is reduced modulo the capacity. A span that crosses the
/// end of the storage is split into at most two copies.
///
/// The buffer has no synchronization of its own; the stream guards it.
pub struct CircularBuffer {
    storage: Box<[u8]>,
}

impl CircularBuffer {
    /// Allocates a zero-filled buffer of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    /// Returns the capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Zeroes the whole buffer.
    pub fn clear(&mut self) {
        self.storage.fill(0);
    }

    /// Writes `data` starting at logical offset `index`.
    ///
    /// Returns the number of bytes written. If `data` is longer than the
    /// capacity only its last `capacity` bytes are kept, since the earlier
    /// ones would be overwritten within the same call.
    pub fn scatter(&mut self, index: u64, data: &[u8]) -> usize {
        let capacity = self.capacity();
        if capacity == 0 {
            return 0;
        }

        let (index, data) = if data.len() > capacity {
            let skip = data.len() - capacity;
            (index.wrapping_add(skip as u64), &data[skip..])
        } else {
            (index, data)
        };

        let offset = self.offset_of(index);
        let first = data.len().min(capacity - offset);
        self.storage[offset..offset + first].copy_from_slice(&data[..first]);
        let rest = data.len() - first;
        self.storage[..rest].copy_from_slice(&data[first..]);

        data.len()
    }

    /// Reads into `data` starting at logical offset `index`.
    ///
    /// If `clear` is set the source bytes are zeroed after being copied, so
    /// a region nobody refills reads as silence on the next lap. Returns the
    /// number of bytes read, at most the capacity.
    pub fn gather(&mut self, index: u64, data: &mut [u8], clear: bool) -> usize {
        let capacity = self.capacity();
        if capacity == 0 {
            return 0;
        }

        let len = data.len().min(capacity);
        let offset = self.offset_of(index);
        let first = len.min(capacity - offset);
        data[..first].copy_from_slice(&self.storage[offset..offset + first]);
        let rest = len - first;
        data[first..len].copy_from_slice(&self.storage[..rest]);

        if clear {
            self.storage[offset..offset + first].fill(0);
            self.storage[..rest].fill(0);
        }

        len
    }

    /// Zeroes `len` bytes starting at logical offset `index`, at most the
    /// capacity.
    pub fn zero(&mut self, index: u64, len: usize) {
        let len = len.min(self.capacity());
        let mut done = 0;
        while done < len {
            let run = self.address_mut(index.wrapping_add(done as u64), len - done);
            if run.is_empty() {
                break;
            }
            run.fill(0);
            done += run.len();
        }
    }

    /// Returns the contiguous run starting at `index`, at most `len` bytes.
    ///
    /// The run stops at the wrap point; call again at `index + run.len()`
    /// for the remainder.
    #[must_use]
    pub fn address(&self, index: u64, len: usize) -> &[u8] {
        let (offset, run) = self.run(index, len);
        &self.storage[offset..offset + run]
    }

    /// Mutable variant of [`address`](Self::address).
    pub fn address_mut(&mut self, index: u64, len: usize) -> &mut [u8] {
        let (offset, run) = self.run(index, len);
        &mut self.storage[offset..offset + run]
    }

    fn run(&self, index: u64, len: usize) -> (usize, usize) {
        let capacity = self.capacity();
        if capacity == 0 {
            return (0, 0);
        }
        let offset = self.offset_of(index);
        (offset, len.min(capacity - offset))
    }

    fn offset_of(&self, index: u64) -> usize {
        // Lossless: the remainder is below the capacity, which is a usize.
        (index % self.storage.len() as u64) as usize
    }
}

impl std::fmt::Debug for CircularBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircularBuffer")
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(7).wrapping_add(seed)).collect()
    }

    #[test]
    fn test_new_is_zeroed() {
        let mut buffer = CircularBuffer::new(16);
        let mut out = [0xffu8; 16];
        assert_eq!(buffer.gather(0, &mut out, false), 16);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_scatter_gather_contiguous() {
        let mut buffer = CircularBuffer::new(64);
        let data = pattern(20, 1);
        assert_eq!(buffer.scatter(10, &data), 20);

        let mut out = vec![0u8; 20];
        assert_eq!(buffer.gather(10, &mut out, false), 20);
        assert_eq!(out, data);
    }

    #[test]
    fn test_wrap_straddling_every_offset() {
        let capacity = 32;
        let mut buffer = CircularBuffer::new(capacity);
        for size in [1usize, 5, 16, 31] {
            for index in 0..(3 * capacity as u64) {
                let data = pattern(size, index as u8);
                buffer.scatter(index, &data);
                let mut out = vec![0u8; size];
                buffer.gather(index, &mut out, false);
                assert_eq!(out, data, "index={index} size={size}");
            }
        }
    }

    #[test]
    fn test_gather_clear_zeroes_source() {
        let mut buffer = CircularBuffer::new(16);
        buffer.scatter(12, &[1, 2, 3, 4, 5, 6, 7, 8]);

        let mut out = [0u8; 8];
        buffer.gather(12, &mut out, true);
        assert_eq!(out, [1, 2, 3, 4, 5, 6, 7, 8]);

        let mut again = [0xffu8; 8];
        buffer.gather(12, &mut again, false);
        assert_eq!(again, [0; 8]);
    }

    #[test]
    fn test_zero_across_wrap() {
        let mut buffer = CircularBuffer::new(10);
        buffer.scatter(0, &[9; 10]);
        buffer.zero(18, 4);

        let mut out = [0u8; 10];
        buffer.gather(0, &mut out, false);
        assert_eq!(out, [0, 0, 9, 9, 9, 9, 9, 9, 0, 0]);
    }

    #[test]
    fn test_large_offsets() {
        let mut buffer = CircularBuffer::new(100);
        let index = u64::MAX - 250;
        buffer.scatter(index, &[9, 8, 7]);
        let mut out = [0u8; 3];
        buffer.gather(index, &mut out, false);
        assert_eq!(out, [9, 8, 7]);
    }

    #[test]
    fn test_address_stops_at_wrap() {
        let mut buffer = CircularBuffer::new(10);
        buffer.scatter(7, &[1, 2, 3, 4, 5]);

        let first = buffer.address(7, 5);
        assert_eq!(first, &[1, 2, 3]);
        let second = buffer.address(10, 2);
        assert_eq!(second, &[4, 5]);
    }

    #[test]
    fn test_address_mut_writes_through() {
        let mut buffer = CircularBuffer::new(8);
        buffer.address_mut(4, 4).copy_from_slice(&[1, 1, 1, 1]);
        let mut out = [0u8; 4];
        buffer.gather(12, &mut out, false);
        assert_eq!(out, [1, 1, 1, 1]);
    }

    #[test]
    fn test_oversized_scatter_keeps_tail() {
        let mut buffer = CircularBuffer::new(4);
        assert_eq!(buffer.scatter(0, &[1, 2, 3, 4, 5, 6]), 4);
        let mut out = [0u8; 4];
        buffer.gather(2, &mut out, false);
        assert_eq!(out, [3, 4, 5, 6]);
    }

    #[test]
    fn test_oversized_gather_truncates() {
        let mut buffer = CircularBuffer::new(4);
        let mut out = [0xffu8; 6];
        assert_eq!(buffer.gather(0, &mut out, false), 4);
        assert_eq!(&out[4..], &[0xff, 0xff]);
    }

    #[test]
    fn test_zero_capacity_is_noop() {
        let mut buffer = CircularBuffer::new(0);
        assert_eq!(buffer.scatter(5, &[1, 2, 3]), 0);
        let mut out = [7u8; 3];
        assert_eq!(buffer.gather(5, &mut out, true), 0);
        assert_eq!(out, [7, 7, 7]);
        assert!(buffer.address(5, 3).is_empty());
    }
}
