//! The application-side stream handle.

use std::sync::Arc;
use std::thread::JoinHandle;

use ringbuf::traits::Consumer;
use ringbuf::HeapCons;

use crate::builder::AudioStreamBuilder;
use crate::config::Direction;
use crate::device::{DeviceControl, DeviceState};
use crate::gain::GainControl;
use crate::pipeline::CursorSnapshot;
use crate::state::{Queued, StreamState};
use crate::{EventCallback, StreamEvent};

/// One timestamped chunk of interleaved 16-bit PCM for a playback stream.
///
/// All times are microseconds on the caller's clock. `timestamp_us` is when
/// the chunk should be heard; `now_us` is the caller's clock at the moment
/// of the call and only matters for the first chunk and for free-running
/// streams.
///
/// # Example
///
/// ```
/// use stream_timeline::QueueRequest;
///
/// let pcm = vec![0u8; 3840];
/// let request = QueueRequest::new(20_000, &pcm)
///     .now(18_500)
///     .adjust(-1_200)
///     .gap(3);
/// assert_eq!(request.data.len(), 3840);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct QueueRequest<'a> {
    /// Caller's clock at the time of the call.
    pub now_us: u64,
    /// When the first sample of `data` should play.
    pub timestamp_us: u64,
    /// Signed correction added to every timestamp.
    pub adjust_us: i64,
    /// Interleaved little-endian PCM; a whole number of frames.
    pub data: &'a [u8],
    /// Runway in quanta for the first chunk. `None` uses the configured default.
    pub gap: Option<u32>,
    /// Follow the timestamps (`true`) or append contiguously (`false`).
    pub sync: bool,
}

impl<'a> QueueRequest<'a> {
    /// Creates a synchronized request with `now == timestamp` and no adjust.
    #[must_use]
    pub fn new(timestamp_us: u64, data: &'a [u8]) -> Self {
        Self {
            now_us: timestamp_us,
            timestamp_us,
            adjust_us: 0,
            data,
            gap: None,
            sync: true,
        }
    }

    /// Sets the caller's current clock.
    #[must_use]
    pub fn now(mut self, now_us: u64) -> Self {
        self.now_us = now_us;
        self
    }

    /// Sets the timestamp correction.
    #[must_use]
    pub fn adjust(mut self, adjust_us: i64) -> Self {
        self.adjust_us = adjust_us;
        self
    }

    /// Sets the first-chunk runway in device quanta.
    #[must_use]
    pub fn gap(mut self, quanta: u32) -> Self {
        self.gap = Some(quanta);
        self
    }

    /// Appends contiguously instead of following the timestamps.
    #[must_use]
    pub fn free_running(mut self) -> Self {
        self.sync = false;
        self
    }
}

/// Lifecycle phase of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Waiting for the first queue (playback) or dequeue (capture).
    Priming,
    /// Primed. `running` is `false` while paused or stopped.
    Active {
        /// Whether the device is consuming/producing audio.
        running: bool,
    },
    /// Teardown has started.
    Cancelling,
}

/// Statistics about a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Chunks accepted by `queue`.
    pub chunks_queued: u64,
    /// Bytes accepted by `queue`.
    pub bytes_queued: u64,
    /// Successful `dequeue` calls.
    pub chunks_dequeued: u64,
    /// Bytes returned by `dequeue`.
    pub bytes_dequeued: u64,
    /// Device callbacks served after priming.
    pub callbacks: u64,
    /// Playback callbacks that produced silence.
    pub silent_callbacks: u64,
    /// Producer cursor snaps.
    pub producer_resyncs: u64,
    /// Consumer cursor snaps.
    pub consumer_resyncs: u64,
    /// Send cursor rebaselines.
    pub rebaselines: u64,
    /// Captured bytes skipped by `dequeue` with `drop`.
    pub dropped_bytes: u64,
    /// Capture overruns.
    pub overruns: u64,
    /// Callbacks that found the buffer locked.
    pub contended_callbacks: u64,
}

pub(crate) enum Backend {
    Callback(Option<Box<dyn DeviceControl>>),
    Worker(Option<JoinHandle<()>>),
}

/// Handle to an open audio stream.
///
/// Created by [`AudioStreamBuilder::build()`]. A playback stream accepts
/// timestamped chunks through [`queue`](Self::queue) and plays them at the
/// matching device time; a capture stream hands captured audio out through
/// [`dequeue`](Self::dequeue).
///
/// # Lifecycle
///
/// 1. Created by [`AudioStreamBuilder::build()`] in the priming phase
/// 2. The first `queue` (or `dequeue`) primes the stream and arms the device
/// 3. For playback, the second `queue` starts consumption
/// 4. [`close()`](Self::close) or dropping the stream tears it down
///
/// # Example
///
/// ```
/// use stream_timeline::{AudioStream, QueueRequest};
/// use stream_timeline::device::MockDriver;
///
/// let driver = MockDriver::new();
/// let mut stream = AudioStream::builder()
///     .playback()
///     .driver(driver.clone())
///     .build()?;
///
/// let chunk = vec![0u8; 3840];
/// stream.queue(&QueueRequest::new(0, &chunk));
/// stream.queue(&QueueRequest::new(20_000, &chunk));
///
/// let played = driver.render(3840);
/// assert_eq!(played.len(), 3840);
/// stream.close();
/// # Ok::<(), stream_timeline::StreamTimelineError>(())
/// ```
///
/// [`AudioStreamBuilder::build()`]: crate::AudioStreamBuilder::build
pub struct AudioStream {
    state: Arc<StreamState>,
    backend: Backend,
    events: HeapCons<StreamEvent>,
    on_event: Option<EventCallback>,
    device_state: Option<DeviceState>,
    closed: bool,
}

impl AudioStream {
    /// Returns a builder with default settings.
    pub fn builder() -> AudioStreamBuilder {
        AudioStreamBuilder::new()
    }

    pub(crate) fn new(
        state: Arc<StreamState>,
        backend: Backend,
        events: HeapCons<StreamEvent>,
        on_event: Option<EventCallback>,
    ) -> Self {
        Self {
            state,
            backend,
            events,
            on_event,
            device_state: None,
            closed: false,
        }
    }

    /// Returns the stream direction.
    pub fn direction(&self) -> Direction {
        self.state.direction()
    }

    /// Places a timestamped chunk on the playback timeline.
    ///
    /// Returns the predicted playback position (the consumer cursor) in
    /// microseconds, or 0 if the chunk was rejected: empty, not a whole
    /// number of frames, larger than the buffer, or queued on a capture
    /// stream.
    pub fn queue(&mut self, request: &QueueRequest<'_>) -> u64 {
        let mut pending = Vec::new();
        let outcome = self.state.queue(request, &mut |event| pending.push(event));
        self.dispatch(pending);

        let position = match outcome {
            Queued::Rejected => return 0,
            Queued::Primed(position) | Queued::Accepted(position) => {
                if self.device_state != Some(DeviceState::Playing) {
                    self.set_device_state(DeviceState::Playing);
                }
                position
            }
        };
        self.state.signal.release();
        self.drain_events();
        position
    }

    /// Copies captured audio into `out` without blocking.
    ///
    /// Returns `out.len()` when that many bytes were available, otherwise 0
    /// and nothing is consumed. The first call primes the stream and starts
    /// the device. With `drop` set, whole seconds of backlog are discarded
    /// first so the caller catches up with real time.
    pub fn dequeue(&mut self, out: &mut [u8], drop: bool) -> usize {
        let mut pending = Vec::new();
        let result = self.state.dequeue(out, drop, &mut |event| pending.push(event));
        self.dispatch(pending);
        if result.primed {
            self.set_device_state(DeviceState::Playing);
        }
        self.drain_events();
        result.bytes
    }

    /// Resumes consumption after [`pause`](Self::pause) or [`stop`](Self::stop).
    pub fn play(&mut self) {
        self.state.set_running(true);
        self.set_device_state(DeviceState::Playing);
    }

    /// Suspends consumption; buffered audio is kept.
    ///
    /// The next `queue` resumes playback.
    pub fn pause(&mut self) {
        self.state.set_running(false);
        self.set_device_state(DeviceState::Paused);
    }

    /// Stops consumption; buffered audio is kept.
    pub fn stop(&mut self) {
        self.state.set_running(false);
        self.set_device_state(DeviceState::Stopped);
    }

    /// Returns the stream to priming.
    ///
    /// The next `queue` re-seeds both cursors from its timestamps and
    /// discards whatever was left in the buffer.
    pub fn reset(&mut self) {
        self.state.reset();
        tracing::debug!(direction = ?self.direction(), "stream reset to priming");
    }

    /// Sets the linear gain applied from the next device callback on.
    pub fn set_volume(&self, gain: f32) {
        self.state.gain().set(gain);
    }

    /// Returns the current linear gain.
    pub fn volume(&self) -> f32 {
        self.state.gain().get()
    }

    /// Returns a handle for changing the gain from another thread.
    pub fn gain_control(&self) -> GainControl {
        self.state.gain().clone()
    }

    /// Returns the lifecycle phase.
    pub fn phase(&self) -> StreamPhase {
        self.state.phase()
    }

    /// Returns the current cursor offsets in bytes.
    pub fn position(&self) -> CursorSnapshot {
        self.state.position()
    }

    /// Returns current stream statistics.
    pub fn stats(&self) -> StreamStats {
        self.state.stats()
    }

    /// Delivers events queued by the device side to the event callback.
    ///
    /// Called automatically by `queue` and `dequeue`; call it directly when
    /// the stream is idle. Returns the number of events delivered.
    pub fn drain_events(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.events.try_pop() {
            self.emit(event);
            delivered += 1;
        }
        delivered
    }

    /// Tears the stream down: stops the device, joins the worker and frees
    /// the buffer.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn dispatch(&self, events: Vec<StreamEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    fn emit(&self, event: StreamEvent) {
        tracing::debug!(?event, "stream event");
        if let Some(ref callback) = self.on_event {
            callback(event);
        }
    }

    fn set_device_state(&mut self, state: DeviceState) {
        self.device_state = Some(state);
        let result = match &mut self.backend {
            Backend::Callback(Some(device)) => device.set_state(state),
            _ => return,
        };
        if let Err(e) = result {
            tracing::warn!(?state, error = %e, "device state change failed");
            self.emit(StreamEvent::DeviceFault {
                reason: e.to_string(),
            });
        }
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.state.cancel();

        match &mut self.backend {
            Backend::Callback(device) => {
                if let Some(mut device) = device.take() {
                    if let Err(e) = device.set_state(DeviceState::Stopped) {
                        tracing::debug!(error = %e, "device stop during close failed");
                    }
                    device.close();
                }
            }
            Backend::Worker(handle) => {
                if let Some(handle) = handle.take() {
                    self.state.signal.release();
                    if handle.join().is_err() {
                        tracing::error!("audio worker panicked");
                    }
                }
            }
        }

        self.drain_events();
        tracing::info!(direction = ?self.direction(), stats = ?self.stats(), "stream closed");
    }
}

impl Drop for AudioStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioStream")
            .field("direction", &self.direction())
            .field("phase", &self.phase())
            .field("position", &self.position())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_request_defaults() {
        let data = [0u8; 8];
        let request = QueueRequest::new(5_000, &data);
        assert_eq!(request.now_us, 5_000);
        assert_eq!(request.adjust_us, 0);
        assert_eq!(request.gap, None);
        assert!(request.sync);
    }

    #[test]
    fn test_queue_request_builders() {
        let data = [0u8; 8];
        let request = QueueRequest::new(5_000, &data)
            .now(4_000)
            .adjust(-250)
            .gap(1)
            .free_running();
        assert_eq!(request.now_us, 4_000);
        assert_eq!(request.adjust_us, -250);
        assert_eq!(request.gap, Some(1));
        assert!(!request.sync);
    }

    #[test]
    fn test_stream_stats_default() {
        let stats = StreamStats::default();
        assert_eq!(stats.chunks_queued, 0);
        assert_eq!(stats.callbacks, 0);
        assert_eq!(stats.overruns, 0);
    }
}
