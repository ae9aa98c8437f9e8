//! Shared stream state and the data-path algorithms.
//!
//! `StreamState` is shared (via `Arc`) between the [`AudioStream`] handle
//! on the application thread and the [`DeviceCallback`] on the device's
//! thread. The ring buffer sits behind a mutex that is held only for
//! memory copies; the device side never waits for it (`try_lock`). Every
//! other field is atomic.
//!
//! [`AudioStream`]: crate::AudioStream
//! [`DeviceCallback`]: crate::device::DeviceCallback

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::config::{Direction, StreamConfig};
use crate::format::scale_bytes;
use crate::gain::GainControl;
use crate::pipeline::{
    initial_sync, CircularBuffer, CursorPair, CursorSnapshot, DriftCorrector, Signal,
};
use crate::stream::{QueueRequest, StreamPhase, StreamStats};
use crate::timeline::{apply_adjust, Timeline};
use crate::StreamEvent;

/// Result of handing a chunk to a playback stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Queued {
    /// Wrong direction, empty, misaligned or oversized chunk.
    Rejected,
    /// First chunk: the stream went from priming to active.
    Primed(u64),
    /// Chunk written; predicted playback position in microseconds.
    Accepted(u64),
}

/// Result of a capture read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Dequeued {
    /// Bytes copied out (0 or the requested size).
    pub bytes: usize,
    /// This call primed the stream.
    pub primed: bool,
}

/// What a playback callback produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Render {
    /// Priming or cancelled; the caller outputs silence.
    NotReady,
    /// Active but paused or contended; the caller outputs silence.
    Silence,
    /// The full request was copied out of the ring.
    Played,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub chunks_queued: AtomicU64,
    pub bytes_queued: AtomicU64,
    pub chunks_dequeued: AtomicU64,
    pub bytes_dequeued: AtomicU64,
    pub callbacks: AtomicU64,
    pub silent_callbacks: AtomicU64,
    pub producer_resyncs: AtomicU64,
    pub consumer_resyncs: AtomicU64,
    pub rebaselines: AtomicU64,
    pub dropped_bytes: AtomicU64,
    pub overruns: AtomicU64,
    pub contended_callbacks: AtomicU64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

pub(crate) struct StreamState {
    direction: Direction,
    timeline: Timeline,
    drift: DriftCorrector,
    default_gap: u32,
    capacity: u64,
    buffer: Mutex<CircularBuffer>,
    cursors: CursorPair,
    /// Playback offset below which the ring has been zeroed behind the consumer.
    swept: AtomicU64,
    quantum: AtomicU64,
    gain: GainControl,
    ready: AtomicBool,
    go: AtomicBool,
    cancel: AtomicBool,
    sync: AtomicBool,
    pub(crate) signal: Signal,
    pub(crate) counters: Counters,
}

impl StreamState {
    /// Allocates the ring buffer for a validated configuration.
    pub fn new(config: &StreamConfig) -> Self {
        let timeline = config.timeline();
        let capacity = config.buffer_capacity();
        // validate() guarantees the capacity fits in memory.
        let storage = usize::try_from(capacity).unwrap_or(0);

        Self {
            direction: config.direction,
            timeline,
            drift: DriftCorrector::from_config(&timeline, &config.sync),
            default_gap: config.sync.default_gap,
            capacity,
            buffer: Mutex::new(CircularBuffer::new(storage)),
            cursors: CursorPair::new(),
            swept: AtomicU64::new(0),
            quantum: AtomicU64::new(0),
            gain: GainControl::new(config.initial_gain),
            ready: AtomicBool::new(false),
            go: AtomicBool::new(false),
            cancel: AtomicBool::new(false),
            sync: AtomicBool::new(true),
            signal: Signal::new(),
            counters: Counters::default(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn timeline(&self) -> Timeline {
        self.timeline
    }

    pub fn gain(&self) -> &GainControl {
        &self.gain
    }

    pub fn position(&self) -> CursorSnapshot {
        self.cursors.snapshot()
    }

    /// Device quantum in bytes, learned from the first queue/dequeue.
    pub fn quantum(&self) -> usize {
        usize::try_from(self.quantum.load(Ordering::Acquire)).unwrap_or(0)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> StreamPhase {
        if self.is_cancelled() {
            StreamPhase::Cancelling
        } else if self.ready.load(Ordering::Acquire) {
            StreamPhase::Active {
                running: self.go.load(Ordering::Acquire),
            }
        } else {
            StreamPhase::Priming
        }
    }

    pub fn set_running(&self, running: bool) {
        self.go.store(running, Ordering::Release);
    }

    /// Returns the stream to priming without touching the buffers.
    pub fn reset(&self) {
        self.go.store(false, Ordering::Release);
        self.ready.store(false, Ordering::Release);
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn stats(&self) -> StreamStats {
        let c = &self.counters;
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StreamStats {
            chunks_queued: load(&c.chunks_queued),
            bytes_queued: load(&c.bytes_queued),
            chunks_dequeued: load(&c.chunks_dequeued),
            bytes_dequeued: load(&c.bytes_dequeued),
            callbacks: load(&c.callbacks),
            silent_callbacks: load(&c.silent_callbacks),
            producer_resyncs: load(&c.producer_resyncs),
            consumer_resyncs: load(&c.consumer_resyncs),
            rebaselines: load(&c.rebaselines),
            dropped_bytes: load(&c.dropped_bytes),
            overruns: load(&c.overruns),
            contended_callbacks: load(&c.contended_callbacks),
        }
    }

    /// Places a timestamped chunk on the playback timeline.
    pub fn queue(&self, request: &QueueRequest<'_>, emit: &mut dyn FnMut(StreamEvent)) -> Queued {
        if self.direction.is_capture() || request.data.is_empty() {
            return Queued::Rejected;
        }
        let len = request.data.len() as u64;
        if !self.timeline.is_frame_aligned(len) {
            tracing::warn!(
                len,
                block_align = self.timeline.block_align(),
                "rejecting chunk that is not a whole number of frames"
            );
            return Queued::Rejected;
        }
        if len > self.capacity {
            tracing::warn!(len, capacity = self.capacity, "rejecting chunk larger than the ring buffer");
            return Queued::Rejected;
        }

        let timeline = &self.timeline;
        let target = timeline.quantize(
            timeline.to_offset(apply_adjust(request.timestamp_us, request.adjust_us)),
            len,
        );
        let ready = self.ready.load(Ordering::Acquire);
        let mut send = self.cursors.send();

        if !ready {
            send = target;
            self.cursors.set_send_adjust(request.adjust_us);
        } else if self.cursors.send_adjust() != request.adjust_us {
            send = target;
            self.cursors.set_send_adjust(request.adjust_us);
            bump(&self.counters.rebaselines, 1);
            tracing::debug!(offset = send, adjust_us = request.adjust_us, "caller adjust changed, rebaselining");
            emit(StreamEvent::Rebaselined {
                offset: send,
                adjust_us: request.adjust_us,
            });
        } else if request.sync {
            if let Some(resync) = self.drift.producer(send, target) {
                send = resync.to;
                bump(&self.counters.producer_resyncs, 1);
                tracing::debug!(from = resync.from, to = resync.to, target, "producer resync");
                emit(StreamEvent::ProducerResync {
                    from: resync.from,
                    to: resync.to,
                });
            } else {
                // Lost packets leave a gap that plays as silence.
                send = target;
            }
        } else {
            let pick = self.cursors.pick();
            if !self.drift.within_window(send, pick) {
                let pick_adjust = self.cursors.pick_adjust();
                send = timeline.quantize(
                    timeline.to_offset(apply_adjust(request.now_us, pick_adjust)),
                    len,
                );
                bump(&self.counters.rebaselines, 1);
                tracing::debug!(offset = send, pick, "free-running producer left the window, rebaselining");
                emit(StreamEvent::Rebaselined {
                    offset: send,
                    adjust_us: pick_adjust,
                });
            }
        }

        {
            let mut buffer = self.buffer.lock();
            if !ready {
                // Audio left over from before a reset must not replay.
                buffer.clear();
            }
            buffer.scatter(send, request.data);
        }
        self.cursors.set_send(send + len);
        self.sync.store(request.sync, Ordering::Release);
        bump(&self.counters.chunks_queued, 1);
        bump(&self.counters.bytes_queued, len);

        if !ready {
            let gap = request.gap.unwrap_or(self.default_gap);
            let seed = initial_sync(
                timeline,
                request.now_us,
                request.timestamp_us,
                request.adjust_us,
                len,
                gap,
            );
            self.cursors.set_pick(seed.pick);
            self.cursors.set_pick_adjust(seed.pick_adjust);
            self.swept.store(seed.pick, Ordering::Release);
            self.quantum.store(len, Ordering::Release);
            self.go.store(false, Ordering::Release);
            self.ready.store(true, Ordering::Release);

            let position_us = timeline.to_timestamp(seed.pick);
            tracing::info!(
                send = send + len,
                pick = seed.pick,
                pick_adjust_us = seed.pick_adjust,
                quantum = len,
                gap,
                "playback stream primed"
            );
            emit(StreamEvent::Primed { position_us });
            return Queued::Primed(position_us);
        }

        self.go.store(true, Ordering::Release);
        Queued::Accepted(timeline.to_timestamp(self.cursors.pick()))
    }

    /// Copies captured audio out of the ring without blocking.
    pub fn dequeue(
        &self,
        out: &mut [u8],
        drop_backlog: bool,
        emit: &mut dyn FnMut(StreamEvent),
    ) -> Dequeued {
        let mut result = Dequeued {
            bytes: 0,
            primed: false,
        };
        if !self.direction.is_capture() || out.is_empty() {
            return result;
        }
        let len = out.len() as u64;

        if !self.ready.load(Ordering::Acquire) {
            // The device side drops input until `ready`, so `send` is stable here.
            self.cursors.set_pick(self.cursors.send());
            self.quantum.store(len, Ordering::Release);
            self.go.store(true, Ordering::Release);
            self.ready.store(true, Ordering::Release);
            result.primed = true;
            tracing::info!(quantum = len, "capture stream primed");
            emit(StreamEvent::Primed {
                position_us: self.timeline.to_timestamp(self.cursors.pick()),
            });
        }

        let send = self.cursors.send();
        let mut pick = self.cursors.pick();
        let bytes_per_second = self.timeline.bytes_per_second();

        let available = send.saturating_sub(pick);
        if drop_backlog && available > bytes_per_second {
            let seconds = (available - 1) / bytes_per_second;
            pick += seconds * bytes_per_second;
            bump(&self.counters.dropped_bytes, seconds * bytes_per_second);
            tracing::debug!(seconds, available, "dropping capture backlog");
            emit(StreamEvent::BacklogDropped {
                dropped_ms: seconds * 1000,
            });
        }

        let available = send.saturating_sub(pick);
        if available > self.capacity {
            let lost = available - self.capacity;
            pick = send - self.capacity;
            bump(&self.counters.overruns, 1);
            tracing::debug!(lost, "capture overrun");
            emit(StreamEvent::CaptureOverrun {
                lost_ms: self.timeline.duration_of(lost).as_millis() as u64,
            });
        }

        if send < pick.saturating_add(len) {
            self.cursors.set_pick(pick);
            return result;
        }

        self.buffer.lock().gather(pick, out, true);
        self.cursors.set_pick(pick + len);
        bump(&self.counters.chunks_dequeued, 1);
        bump(&self.counters.bytes_dequeued, len);
        result.bytes = out.len();
        result
    }

    /// Consumer side of a playback stream; runs on the device's thread.
    ///
    /// `emit` receives each contiguous run of `len` bytes in order, already
    /// scaled. The ring region is cleared behind it, including regions a
    /// contended callback or a forward snap skipped over.
    pub fn render_with(
        &self,
        len: usize,
        events: &mut dyn FnMut(StreamEvent),
        mut emit: impl FnMut(usize, &[u8]),
    ) -> Render {
        if self.is_cancelled() {
            self.ready.store(false, Ordering::Release);
            return Render::NotReady;
        }
        if !self.ready.load(Ordering::Acquire) {
            return Render::NotReady;
        }
        bump(&self.counters.callbacks, 1);
        if !self.go.load(Ordering::Acquire) {
            bump(&self.counters.silent_callbacks, 1);
            return Render::Silence;
        }

        let mut pick = self.cursors.pick();
        if self.sync.load(Ordering::Acquire) {
            if let Some(resync) = self.drift.consumer(pick, self.cursors.send()) {
                pick = resync.to;
                bump(&self.counters.consumer_resyncs, 1);
                events(StreamEvent::ConsumerResync {
                    from: resync.from,
                    to: resync.to,
                });
            }
        }

        let Some(mut buffer) = self.buffer.try_lock() else {
            // Keep time moving; the producer holds the lock only for a copy.
            self.cursors.set_pick(pick + len as u64);
            bump(&self.counters.contended_callbacks, 1);
            bump(&self.counters.silent_callbacks, 1);
            events(StreamEvent::CallbackContended);
            return Render::Silence;
        };

        let swept = self.swept.load(Ordering::Acquire);
        if swept < pick {
            // Stop short of offsets that alias audio queued ahead of `pick`.
            let reach = self
                .capacity
                .saturating_sub(2 * self.drift.half_window() + len as u64);
            let from = swept.max(pick.saturating_sub(reach));
            buffer.zero(from, usize::try_from(pick - from).unwrap_or(0));
        }

        let gain = self.gain.get();
        let mut done = 0;
        while done < len {
            let run = buffer.address_mut(pick + done as u64, len - done);
            if run.is_empty() {
                break;
            }
            scale_bytes(run, gain);
            emit(done, &*run);
            run.fill(0);
            done += run.len();
        }
        drop(buffer);

        self.swept.store(pick + len as u64, Ordering::Release);
        self.cursors.set_pick(pick + len as u64);
        Render::Played
    }

    /// Producer side of a capture stream; runs on the device's thread.
    ///
    /// `fill` writes each contiguous run of the ring in order; the run is
    /// scaled in place afterwards. Returns `false` while priming or cancelled.
    pub fn capture_with(
        &self,
        len: usize,
        events: &mut dyn FnMut(StreamEvent),
        mut fill: impl FnMut(usize, &mut [u8]),
    ) -> bool {
        if self.is_cancelled() {
            self.ready.store(false, Ordering::Release);
            return false;
        }
        if !self.ready.load(Ordering::Acquire) {
            return false;
        }
        bump(&self.counters.callbacks, 1);

        let Some(mut buffer) = self.buffer.try_lock() else {
            // Dropping the input leaves a gap; advancing would expose stale bytes.
            bump(&self.counters.contended_callbacks, 1);
            events(StreamEvent::CallbackContended);
            return true;
        };

        let send = self.cursors.send();
        let gain = self.gain.get();
        let mut done = 0;
        while done < len {
            let run = buffer.address_mut(send + done as u64, len - done);
            if run.is_empty() {
                break;
            }
            fill(done, run);
            scale_bytes(run, gain);
            done += run.len();
        }
        drop(buffer);

        self.cursors.set_send(send + len as u64);
        true
    }
}
