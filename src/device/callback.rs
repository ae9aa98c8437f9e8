//! The stream's side of the device contract.

use std::fmt;
use std::sync::Arc;

use ringbuf::traits::Producer;
use ringbuf::HeapProd;

use crate::config::Direction;
use crate::format::{decode_le_into, encode_le_into};
use crate::state::{Render, StreamState};
use crate::timeline::Timeline;
use crate::StreamEvent;

/// Callback handed to a device when it is opened.
///
/// Everything here is safe to call from a real-time audio thread: it never
/// blocks, never logs and never allocates. Conditions worth reporting are
/// queued as [`StreamEvent`]s and delivered on the application thread.
///
/// A `false` return from any of the data methods means the stream is not
/// ready (still priming, or being torn down); the device should output
/// silence and keep running.
pub struct DeviceCallback {
    state: Arc<StreamState>,
    events: HeapProd<StreamEvent>,
}

impl DeviceCallback {
    pub(crate) fn new(state: Arc<StreamState>, events: HeapProd<StreamEvent>) -> Self {
        Self { state, events }
    }

    /// Direction of the owning stream.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.state.direction()
    }

    /// Chunk size in bytes the stream primed with, or 0 while priming.
    #[must_use]
    pub fn quantum(&self) -> usize {
        self.state.quantum()
    }

    /// Returns `true` once the stream is being torn down.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// Fills `out` with the next interleaved little-endian PCM bytes.
    ///
    /// Silence is written whenever there is nothing to play.
    pub fn render(&mut self, out: &mut [u8]) -> bool {
        let Self { state, events } = self;
        let result = state.render_with(
            out.len(),
            &mut |event| {
                let _ = events.try_push(event);
            },
            |pos, run| out[pos..pos + run.len()].copy_from_slice(run),
        );
        if result != Render::Played {
            out.fill(0);
        }
        result != Render::NotReady
    }

    /// Sample-typed variant of [`render`](Self::render).
    pub fn render_i16(&mut self, out: &mut [i16]) -> bool {
        let Self { state, events } = self;
        let result = state.render_with(
            out.len() * 2,
            &mut |event| {
                let _ = events.try_push(event);
            },
            |pos, run| {
                decode_le_into(run, &mut out[pos / 2..]);
            },
        );
        if result != Render::Played {
            out.fill(0);
        }
        result != Render::NotReady
    }

    /// Hands captured interleaved little-endian PCM bytes to the stream.
    pub fn capture(&mut self, data: &[u8]) -> bool {
        let Self { state, events } = self;
        state.capture_with(
            data.len(),
            &mut |event| {
                let _ = events.try_push(event);
            },
            |pos, run| run.copy_from_slice(&data[pos..pos + run.len()]),
        )
    }

    /// Sample-typed variant of [`capture`](Self::capture).
    pub fn capture_i16(&mut self, data: &[i16]) -> bool {
        let Self { state, events } = self;
        state.capture_with(
            data.len() * 2,
            &mut |event| {
                let _ = events.try_push(event);
            },
            |pos, run| {
                encode_le_into(&data[pos / 2..], run);
            },
        )
    }

    pub(crate) fn timeline(&self) -> Timeline {
        self.state.timeline()
    }

    /// Blocks until the application queues more audio or the stream closes.
    pub(crate) fn wait(&self) {
        self.state.signal.acquire();
    }

    /// Queues an event for the application thread.
    pub(crate) fn report(&mut self, event: StreamEvent) {
        let _ = self.events.try_push(event);
    }
}

impl fmt::Debug for DeviceCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCallback")
            .field("direction", &self.direction())
            .field("quantum", &self.quantum())
            .finish_non_exhaustive()
    }
}
