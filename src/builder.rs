//! Builder pattern for `AudioStream`.

use std::sync::Arc;
use std::time::Duration;

use ringbuf::traits::Split;
use ringbuf::HeapRb;

use crate::device::{AudioDriver, BlockingDriver, CpalDriver, DeviceCallback, DeviceFormat};
use crate::state::StreamState;
use crate::stream::{AudioStream, Backend};
use crate::timeline::BYTES_PER_SAMPLE;
use crate::{
    event_callback, worker, Direction, EventCallback, StreamConfig, StreamEvent,
    StreamTimelineError, SyncConfig,
};

/// Capacity of the queue carrying events from the device side.
/// Events beyond this between two drains are dropped.
const EVENT_QUEUE_CAPACITY: usize = 256;

/// Which device regime the stream runs in.
enum DriverSelection {
    Callback(Box<dyn AudioDriver>),
    Blocking(Box<dyn BlockingDriver>),
}

impl Default for DriverSelection {
    fn default() -> Self {
        Self::Callback(Box::new(CpalDriver::default()))
    }
}

/// Builder for configuring and opening an audio stream.
///
/// Use [`AudioStream::builder()`] to create a new builder.
///
/// # Playback Example
///
/// ```ignore
/// use stream_timeline::{AudioStream, QueueRequest};
/// use std::time::Duration;
///
/// let mut stream = AudioStream::builder()
///     .playback()
///     .sample_rate(48000)
///     .channels(2)
///     .buffer_duration(Duration::from_secs(2))
///     .on_event(|e| tracing::warn!(?e, "stream event"))
///     .build()?;
///
/// stream.queue(&QueueRequest::new(packet.timestamp_us, &packet.pcm).now(clock.now_us()));
/// ```
///
/// # Worker-Thread Example
///
/// ```ignore
/// let stream = AudioStream::builder()
///     .capture()
///     .blocking_driver(MyAlsaDriver::new("hw:0"))
///     .build()?;
/// ```
///
/// [`AudioStream::builder()`]: crate::AudioStream::builder
#[must_use]
pub struct AudioStreamBuilder {
    /// Stream configuration.
    config: StreamConfig,
    /// Device regime and driver.
    driver: DriverSelection,
    /// Event callback.
    event_callback: Option<EventCallback>,
}

impl Default for AudioStreamBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioStreamBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: StreamConfig::default(),
            driver: DriverSelection::default(),
            event_callback: None,
        }
    }

    /// Set custom stream configuration.
    pub fn with_config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Queue timestamped audio for a device to play.
    pub fn playback(self) -> Self {
        self.direction(Direction::Playback)
    }

    /// Dequeue audio a device captured.
    pub fn capture(self) -> Self {
        self.direction(Direction::Capture)
    }

    /// Set the stream direction.
    pub fn direction(mut self, direction: Direction) -> Self {
        self.config.direction = direction;
        self
    }

    /// Set the interleaved channel count.
    ///
    /// Default: 2
    pub fn channels(mut self, channels: u16) -> Self {
        self.config.channels = channels;
        self
    }

    /// Set the sample rate in Hz.
    ///
    /// Default: 48000
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Set how much audio the ring buffer holds.
    ///
    /// Default: 2 seconds
    pub fn buffer_duration(mut self, duration: Duration) -> Self {
        self.config.buffer_duration = duration;
        self
    }

    /// Set the initial linear gain.
    ///
    /// Default: 1.0
    pub fn gain(mut self, gain: f32) -> Self {
        self.config.initial_gain = gain;
        self
    }

    /// Set all drift-correction parameters.
    pub fn sync(mut self, sync: SyncConfig) -> Self {
        self.config.sync = sync;
        self
    }

    /// Set the maximum tolerated distance between producer and consumer.
    ///
    /// Default: 500ms
    pub fn jitter_window(mut self, window: Duration) -> Self {
        self.config.sync.jitter_window = window;
        self
    }

    /// Set how far behind its reference a snapped cursor lands.
    ///
    /// Default: 100ms
    pub fn snap_back(mut self, snap_back: Duration) -> Self {
        self.config.sync.snap_back = snap_back;
        self
    }

    /// Set the default first-chunk runway in device quanta.
    ///
    /// Default: 2
    pub fn gap(mut self, quanta: u32) -> Self {
        self.config.sync.default_gap = quanta;
        self
    }

    /// Use a callback-driven device.
    ///
    /// Default: [`CpalDriver`] on the system default device.
    pub fn driver<D: AudioDriver + 'static>(mut self, driver: D) -> Self {
        self.driver = DriverSelection::Callback(Box::new(driver));
        self
    }

    /// Use a blocking device driven by a dedicated worker thread.
    pub fn blocking_driver<D: BlockingDriver + 'static>(mut self, driver: D) -> Self {
        self.driver = DriverSelection::Blocking(Box::new(driver));
        self
    }

    /// Set a callback to receive runtime events.
    ///
    /// Events include resyncs, backlog drops and device faults. The callback
    /// runs on the thread that calls into the stream.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(StreamEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Returns the configuration assembled so far.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Opens the device and returns the stream in the priming phase.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The audio device cannot be found or opened
    /// - The worker thread cannot be started
    ///
    /// Nothing is left open when an error is returned.
    pub fn build(self) -> Result<AudioStream, StreamTimelineError> {
        let Self {
            config,
            driver,
            event_callback,
        } = self;
        config.validate()?;

        let state = Arc::new(StreamState::new(&config));
        let (event_tx, event_rx) = HeapRb::<StreamEvent>::new(EVENT_QUEUE_CAPACITY).split();
        let callback = DeviceCallback::new(Arc::clone(&state), event_tx);

        let format = DeviceFormat {
            channels: config.channels,
            sample_rate: config.sample_rate,
            bits_per_sample: (BYTES_PER_SAMPLE * 8) as u16,
            direction: config.direction,
        };

        let (driver_name, backend) = match driver {
            DriverSelection::Callback(mut driver) => {
                let device = driver.open(&format, callback)?;
                (driver.name().to_string(), Backend::Callback(Some(device)))
            }
            DriverSelection::Blocking(mut driver) => {
                let device = driver.open(&format)?;
                let handle = worker::spawn(config.direction, device, callback)
                    .map_err(StreamTimelineError::WorkerSpawn)?;
                (driver.name().to_string(), Backend::Worker(Some(handle)))
            }
        };

        tracing::info!(
            driver = %driver_name,
            direction = ?config.direction,
            channels = config.channels,
            sample_rate = config.sample_rate,
            capacity = config.buffer_capacity(),
            "audio stream opened"
        );

        Ok(AudioStream::new(state, backend, event_rx, event_callback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{MockBlockingDriver, MockDriver};

    #[test]
    fn test_builder_default() {
        let builder = AudioStreamBuilder::new();
        assert_eq!(builder.config(), &StreamConfig::default());
        assert!(builder.event_callback.is_none());
    }

    #[test]
    fn test_builder_setters() {
        let builder = AudioStream::builder()
            .capture()
            .channels(1)
            .sample_rate(16000)
            .buffer_duration(Duration::from_secs(4))
            .gain(0.5)
            .jitter_window(Duration::from_millis(300))
            .snap_back(Duration::from_millis(60))
            .gap(3);

        let config = builder.config();
        assert_eq!(config.direction, Direction::Capture);
        assert_eq!(config.channels, 1);
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.buffer_duration, Duration::from_secs(4));
        assert_eq!(config.sync.jitter_window, Duration::from_millis(300));
        assert_eq!(config.sync.snap_back, Duration::from_millis(60));
        assert_eq!(config.sync.default_gap, 3);
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let driver = MockDriver::new();
        let result = AudioStream::builder()
            .channels(0)
            .driver(driver.clone())
            .build();
        assert!(matches!(
            result,
            Err(StreamTimelineError::InvalidConfig { .. })
        ));
        // The device is never touched for an invalid configuration.
        assert!(driver.format().is_none());
    }

    #[test]
    fn test_build_with_mock_driver() {
        let driver = MockDriver::new();
        let stream = AudioStream::builder()
            .sample_rate(44100)
            .driver(driver.clone())
            .build()
            .unwrap();

        let format = driver.format().unwrap();
        assert_eq!(format.sample_rate, 44100);
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(format.direction, Direction::Playback);
        drop(stream);
        assert!(driver.is_closed());
    }

    #[test]
    fn test_build_with_blocking_driver() {
        let driver = MockBlockingDriver::new();
        let stream = AudioStream::builder()
            .blocking_driver(driver.clone())
            .build()
            .unwrap();
        stream.close();
        assert!(driver.is_closed());
    }
}
