//! Mock devices for testing without hardware.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{
    AudioDriver, BlockingDevice, BlockingDriver, DeviceCallback, DeviceControl, DeviceFormat,
    DeviceState,
};
use crate::format::i16_to_le_bytes;
use crate::{DeviceError, StreamTimelineError};

/// How long a mock blocking read waits for input before returning 0.
const READ_TIMEOUT: Duration = Duration::from_millis(5);

#[derive(Default)]
struct MockInner {
    callback: Option<DeviceCallback>,
    format: Option<DeviceFormat>,
    states: Vec<DeviceState>,
    closed: bool,
    fail: Option<String>,
}

impl MockInner {
    fn playing(&self) -> bool {
        !self.closed && self.states.last() == Some(&DeviceState::Playing)
    }
}

/// A callback-driven device whose callbacks are invoked by the test.
///
/// Clones share the same device, so a test keeps one clone and hands the
/// other to the builder. Like real hardware, the mock only invokes the
/// stream's callback while it is in the [`DeviceState::Playing`] state.
///
/// # Example
///
/// ```
/// use stream_timeline::{AudioStream, QueueRequest};
/// use stream_timeline::device::{DeviceState, MockDriver};
///
/// let driver = MockDriver::new();
/// let mut stream = AudioStream::builder().driver(driver.clone()).build()?;
///
/// stream.queue(&QueueRequest::new(0, &[0u8; 1920]));
/// assert_eq!(driver.states(), vec![DeviceState::Playing]);
/// # Ok::<(), stream_timeline::StreamTimelineError>(())
/// ```
#[derive(Clone, Default)]
pub struct MockDriver {
    inner: Arc<Mutex<MockInner>>,
}

impl MockDriver {
    /// Creates a working mock device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock whose `open` fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        let driver = Self::new();
        driver.inner.lock().fail = Some(reason.into());
        driver
    }

    /// Runs one playback callback of `len` bytes and returns its output.
    pub fn render(&self, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        self.render_into(&mut out);
        out
    }

    /// Runs one playback callback into `out`.
    ///
    /// Returns `false` (and leaves silence) when the device isn't playing
    /// or the stream isn't ready.
    pub fn render_into(&self, out: &mut [u8]) -> bool {
        let mut inner = self.inner.lock();
        if !inner.playing() {
            out.fill(0);
            return false;
        }
        match inner.callback.as_mut() {
            Some(callback) => callback.render(out),
            None => false,
        }
    }

    /// Sample-typed variant of [`render`](Self::render).
    pub fn render_i16(&self, samples: usize) -> Vec<i16> {
        let mut out = vec![0i16; samples];
        let mut inner = self.inner.lock();
        if inner.playing() {
            if let Some(callback) = inner.callback.as_mut() {
                callback.render_i16(&mut out);
            }
        }
        out
    }

    /// Runs one capture callback with `data`.
    pub fn capture(&self, data: &[u8]) -> bool {
        let mut inner = self.inner.lock();
        if !inner.playing() {
            return false;
        }
        inner
            .callback
            .as_mut()
            .is_some_and(|callback| callback.capture(data))
    }

    /// Sample-typed variant of [`capture`](Self::capture).
    pub fn capture_i16(&self, samples: &[i16]) -> bool {
        let mut inner = self.inner.lock();
        if !inner.playing() {
            return false;
        }
        inner
            .callback
            .as_mut()
            .is_some_and(|callback| callback.capture_i16(samples))
    }

    /// Every state the stream requested, in order.
    pub fn states(&self) -> Vec<DeviceState> {
        self.inner.lock().states.clone()
    }

    /// Returns `true` once the stream closed the device.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Format the device was opened with, if it was opened.
    pub fn format(&self) -> Option<DeviceFormat> {
        self.inner.lock().format
    }
}

impl AudioDriver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    fn open(
        &mut self,
        format: &DeviceFormat,
        callback: DeviceCallback,
    ) -> Result<Box<dyn DeviceControl>, StreamTimelineError> {
        let mut inner = self.inner.lock();
        if let Some(reason) = &inner.fail {
            return Err(StreamTimelineError::open_failed("mock", reason.clone()));
        }
        inner.format = Some(*format);
        inner.callback = Some(callback);
        inner.closed = false;
        Ok(Box::new(MockControl {
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MockControl {
    inner: Arc<Mutex<MockInner>>,
}

impl DeviceControl for MockControl {
    fn set_state(&mut self, state: DeviceState) -> Result<(), DeviceError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(DeviceError::Closed);
        }
        inner.states.push(state);
        Ok(())
    }

    fn close(self: Box<Self>) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.callback = None;
    }
}

#[derive(Default)]
struct BlockingInner {
    format: Option<DeviceFormat>,
    written: Vec<u8>,
    writes: usize,
    input: VecDeque<u8>,
    closed: bool,
    fail: Option<String>,
    write_error: Option<String>,
}

#[derive(Default)]
struct BlockingShared {
    inner: Mutex<BlockingInner>,
    changed: Condvar,
}

/// A blocking-I/O device backed by memory.
///
/// Written audio is recorded; input pushed by the test is returned from
/// `read` in whole frames.
#[derive(Clone, Default)]
pub struct MockBlockingDriver {
    shared: Arc<BlockingShared>,
}

impl MockBlockingDriver {
    /// Creates a working mock device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock whose `open` fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        let driver = Self::new();
        driver.shared.inner.lock().fail = Some(reason.into());
        driver
    }

    /// Makes every subsequent `write` fail with `reason`.
    pub fn fail_writes(&self, reason: impl Into<String>) {
        self.shared.inner.lock().write_error = Some(reason.into());
    }

    /// Queues bytes for the device to "capture".
    pub fn push_input(&self, data: &[u8]) {
        self.shared.inner.lock().input.extend(data.iter().copied());
        self.shared.changed.notify_all();
    }

    /// Everything written to the device so far.
    pub fn written(&self) -> Vec<u8> {
        self.shared.inner.lock().written.clone()
    }

    /// Number of `write` calls so far.
    pub fn writes(&self) -> usize {
        self.shared.inner.lock().writes
    }

    /// Waits until at least `count` writes happened. Returns `false` on timeout.
    pub fn wait_for_writes(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.shared.inner.lock();
        while inner.writes < count {
            if self.shared.changed.wait_until(&mut inner, deadline).timed_out() {
                return inner.writes >= count;
            }
        }
        true
    }

    /// Waits until all pushed input was read. Returns `false` on timeout.
    pub fn wait_for_input_drained(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.shared.inner.lock();
        while !inner.input.is_empty() {
            if self.shared.changed.wait_until(&mut inner, deadline).timed_out() {
                return inner.input.is_empty();
            }
        }
        true
    }

    /// Returns `true` once the device was closed.
    pub fn is_closed(&self) -> bool {
        self.shared.inner.lock().closed
    }

    /// Format the device was opened with, if it was opened.
    pub fn format(&self) -> Option<DeviceFormat> {
        self.shared.inner.lock().format
    }
}

impl BlockingDriver for MockBlockingDriver {
    fn name(&self) -> &str {
        "mock-blocking"
    }

    fn open(&mut self, format: &DeviceFormat) -> Result<Box<dyn BlockingDevice>, StreamTimelineError> {
        let mut inner = self.shared.inner.lock();
        if let Some(reason) = &inner.fail {
            return Err(StreamTimelineError::open_failed("mock-blocking", reason.clone()));
        }
        inner.format = Some(*format);
        inner.closed = false;
        Ok(Box::new(MockBlockingDevice {
            shared: Arc::clone(&self.shared),
            block_align: format.block_align().max(1),
        }))
    }
}

struct MockBlockingDevice {
    shared: Arc<BlockingShared>,
    block_align: usize,
}

impl BlockingDevice for MockBlockingDevice {
    fn write(&mut self, data: &[u8]) -> Result<(), DeviceError> {
        let mut inner = self.shared.inner.lock();
        if inner.closed {
            return Err(DeviceError::Closed);
        }
        if let Some(reason) = &inner.write_error {
            return Err(DeviceError::write_failed(reason.clone()));
        }
        inner.written.extend_from_slice(data);
        inner.writes += 1;
        self.shared.changed.notify_all();
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        let mut inner = self.shared.inner.lock();
        if inner.closed {
            return Err(DeviceError::Closed);
        }
        if inner.input.len() < self.block_align {
            self.shared.changed.wait_for(&mut inner, READ_TIMEOUT);
        }
        let available = inner.input.len().min(buf.len());
        let len = available - available % self.block_align;
        for (slot, byte) in buf[..len].iter_mut().zip(inner.input.drain(..len)) {
            *slot = byte;
        }
        if len > 0 {
            self.shared.changed.notify_all();
        }
        Ok(len)
    }

    fn close(&mut self) {
        self.shared.inner.lock().closed = true;
        self.shared.changed.notify_all();
    }
}

/// Generator for synthetic interleaved 16-bit PCM.
///
/// # Example
///
/// ```
/// use stream_timeline::device::TestSignal;
///
/// let mut signal = TestSignal::new(48000, 2);
///
/// // 20ms of silence followed by 20ms of a 440Hz sine wave
/// signal.silence(20);
/// signal.sine(440.0, 20);
///
/// let pcm = signal.to_bytes();
/// assert_eq!(pcm.len(), 2 * 960 * 2 * 2);
/// ```
#[derive(Debug, Clone)]
pub struct TestSignal {
    sample_rate: u32,
    channels: u16,
    samples: Vec<i16>,
}

impl TestSignal {
    /// Creates an empty signal with the given format.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            samples: Vec::new(),
        }
    }

    /// Appends silence for the given duration in milliseconds.
    pub fn silence(&mut self, duration_ms: u64) -> &mut Self {
        let num_samples = self.samples_for_duration(duration_ms);
        self.samples.resize(self.samples.len() + num_samples, 0);
        self
    }

    /// Appends a full-scale sine wave, identical on every channel.
    pub fn sine(&mut self, frequency: f64, duration_ms: u64) -> &mut Self {
        let num_frames = self.samples_for_duration(duration_ms) / self.channels as usize;
        let sample_rate = f64::from(self.sample_rate);

        for i in 0..num_frames {
            let t = i as f64 / sample_rate;
            let value = (2.0 * std::f64::consts::PI * frequency * t).sin();
            let sample = (value * 32767.0) as i16;
            for _ in 0..self.channels {
                self.samples.push(sample);
            }
        }
        self
    }

    /// Appends deterministic white noise at the given amplitude (0.0–1.0).
    pub fn noise(&mut self, duration_ms: u64, amplitude: f64) -> &mut Self {
        let num_samples = self.samples_for_duration(duration_ms);
        let amplitude = (amplitude * 32767.0) as i16;

        // Simple LCG for deterministic "random" noise
        let mut seed: u32 = 12345;
        for _ in 0..num_samples {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let random = ((seed >> 16) as i32 - 32768) as i16;
            let sample = (i32::from(random) * i32::from(amplitude) / 32767) as i16;
            self.samples.push(sample);
        }
        self
    }

    /// Appends raw samples.
    pub fn add_samples(&mut self, samples: &[i16]) -> &mut Self {
        self.samples.extend_from_slice(samples);
        self
    }

    /// Takes all accumulated samples, clearing the signal.
    pub fn take_samples(&mut self) -> Vec<i16> {
        std::mem::take(&mut self.samples)
    }

    /// Returns the accumulated samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Returns the duration of the accumulated samples.
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() / self.channels as usize;
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }

    /// Returns the samples as little-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        i16_to_le_bytes(&self.samples)
    }

    fn samples_for_duration(&self, duration_ms: u64) -> usize {
        let frames = (u64::from(self.sample_rate) * duration_ms / 1000) as usize;
        frames * self.channels as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Direction;

    fn format(direction: Direction) -> DeviceFormat {
        DeviceFormat {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 16,
            direction,
        }
    }

    #[test]
    fn test_failing_driver() {
        let mut driver = MockBlockingDriver::failing("no such card");
        let err = driver.open(&format(Direction::Playback)).err().unwrap();
        assert!(err.to_string().contains("no such card"));
    }

    #[test]
    fn test_blocking_read_whole_frames() {
        let mut driver = MockBlockingDriver::new();
        let mut device = driver.open(&format(Direction::Capture)).unwrap();
        driver.push_input(&[1, 2, 3, 4, 5, 6]);

        let mut buf = [0u8; 16];
        assert_eq!(device.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], &[1, 2, 3, 4]);
        // A partial frame stays queued until the rest arrives.
        assert_eq!(device.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_blocking_write_records() {
        let mut driver = MockBlockingDriver::new();
        let mut device = driver.open(&format(Direction::Playback)).unwrap();
        device.write(&[9, 9]).unwrap();
        assert_eq!(driver.written(), vec![9, 9]);
        assert!(driver.wait_for_writes(1, Duration::from_millis(10)));

        device.close();
        assert!(driver.is_closed());
        assert!(matches!(device.write(&[0]), Err(DeviceError::Closed)));
    }

    #[test]
    fn test_signal_silence() {
        let mut signal = TestSignal::new(16000, 1);
        signal.silence(100);

        let samples = signal.take_samples();
        assert_eq!(samples.len(), 1600); // 16000 * 0.1 = 1600
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_signal_sine() {
        let mut signal = TestSignal::new(16000, 1);
        signal.sine(440.0, 100);

        let samples = signal.samples();
        assert_eq!(samples.len(), 1600);

        // Sine wave should have positive and negative values
        assert!(samples.iter().any(|&s| s > 0));
        assert!(samples.iter().any(|&s| s < 0));
    }

    #[test]
    fn test_signal_stereo_bytes() {
        let mut signal = TestSignal::new(48000, 2);
        signal.noise(10, 0.5).add_samples(&[1, 2]);

        // 480 frames * 2 channels + 2 raw samples, 2 bytes each
        assert_eq!(signal.to_bytes().len(), (960 + 2) * 2);
    }

    #[test]
    fn test_signal_duration() {
        let mut signal = TestSignal::new(16000, 1);
        signal.silence(500);

        assert_eq!(signal.duration(), Duration::from_millis(500));
    }
}
