//! Runtime events for monitoring stream health.
//!
//! Events are non-fatal notifications about stream behavior. The stream
//! keeps running after an event is emitted; they're for logging/metrics,
//! not error handling. Underruns, overruns and clock steps are absorbed by
//! the data path and only surface here.

use std::sync::Arc;

/// Runtime events emitted by a stream.
///
/// Events raised inside the device callback are queued without blocking
/// and delivered on the application thread the next time the stream is
/// used (or on [`AudioStream::drain_events`]).
///
/// [`AudioStream::drain_events`]: crate::AudioStream::drain_events
///
/// # Example
///
/// ```
/// use stream_timeline::StreamEvent;
///
/// fn handle_event(event: StreamEvent) {
///     match event {
///         StreamEvent::Primed { position_us } => {
///             eprintln!("stream primed at {}us", position_us);
///         }
///         StreamEvent::ProducerResync { from, to } | StreamEvent::ConsumerResync { from, to } => {
///             eprintln!("cursor snapped {} -> {}", from, to);
///         }
///         StreamEvent::Rebaselined { offset, adjust_us } => {
///             eprintln!("timeline rebased at {} (adjust {}us)", offset, adjust_us);
///         }
///         StreamEvent::BacklogDropped { dropped_ms } => {
///             eprintln!("dropped {}ms of captured audio", dropped_ms);
///         }
///         StreamEvent::CaptureOverrun { lost_ms } => {
///             eprintln!("capture overran by {}ms", lost_ms);
///         }
///         StreamEvent::CallbackContended => {
///             eprintln!("callback emitted silence while the buffer was busy");
///         }
///         StreamEvent::DeviceFault { reason } => {
///             eprintln!("device fault: {}", reason);
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The first chunk was accepted and the device was armed.
    Primed {
        /// Consumer position at the moment of priming, in microseconds.
        position_us: u64,
    },

    /// The producer cursor was snapped to follow the caller's timestamps.
    ///
    /// Happens when the application stalls for longer than the jitter
    /// window or its timestamps jump backwards.
    ProducerResync {
        /// Send offset before the snap.
        from: u64,
        /// Send offset after the snap.
        to: u64,
    },

    /// The consumer cursor was snapped back into the jitter window.
    ConsumerResync {
        /// Pick offset before the snap.
        from: u64,
        /// Pick offset after the snap.
        to: u64,
    },

    /// The send cursor was recomputed from a new timestamp baseline.
    ///
    /// Happens when the caller supplies a different `adjust`, or when a
    /// free-running producer drifted out of the window.
    Rebaselined {
        /// New send offset.
        offset: u64,
        /// Adjust in effect after the rebaseline, in microseconds.
        adjust_us: i64,
    },

    /// Captured audio was skipped to shed backlog (`dequeue` with `drop`).
    BacklogDropped {
        /// Duration of audio skipped.
        dropped_ms: u64,
    },

    /// The device wrote more audio than the ring buffer holds before the
    /// application dequeued it; the oldest audio was lost.
    CaptureOverrun {
        /// Approximate duration of audio lost.
        lost_ms: u64,
    },

    /// The device callback found the buffer busy and emitted silence.
    CallbackContended,

    /// The device reported an error while running.
    DeviceFault {
        /// Description of the fault.
        reason: String,
    },
}

/// Callback type for receiving runtime events.
///
/// Register an event callback via [`AudioStreamBuilder::on_event()`].
/// It is only ever invoked on the thread that drives the stream handle,
/// never on the device's real-time thread.
///
/// [`AudioStreamBuilder::on_event()`]: crate::AudioStreamBuilder::on_event
pub type EventCallback = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use stream_timeline::{event_callback, StreamEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// callback(StreamEvent::CallbackContended);
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(StreamEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}
