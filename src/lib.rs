//! # stream-timeline
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Timestamp-aligned PCM streaming between an application and a real-time
//! audio device.
//!
//! `stream-timeline` sits between a producer that delivers audio in bursts
//! (network packets, a decoder, a mixer) and a device that consumes it on a
//! rigid hardware clock. Each chunk carries a microsecond timestamp; the
//! stream maps it onto a byte offset in a ring buffer, so the device plays
//! it at the intended moment regardless of arrival jitter. Drift between
//! the two clocks is absorbed by bounded cursor snaps instead of growing
//! latency.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stream_timeline::{AudioStream, QueueRequest};
//!
//! let mut stream = AudioStream::builder()
//!     .playback()
//!     .sample_rate(48000)
//!     .channels(2)
//!     .on_event(|e| tracing::warn!(?e, "stream event"))
//!     .build()?;
//!
//! while let Some(packet) = socket.next_packet() {
//!     let request = QueueRequest::new(packet.timestamp_us, &packet.pcm).now(clock.now_us());
//!     stream.queue(&request);
//! }
//!
//! stream.close();
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary:
//!
//! - **Device Thread**: real-time callback that never blocks, logs or
//!   waits on the application; it falls back to silence instead
//! - **Ring Buffer**: byte-addressed circular buffer indexed by timeline
//!   offsets, with atomic send/pick cursors
//! - **Application Thread**: `queue`/`dequeue` calls place and fetch audio
//!   and deliver queued events to the event callback
//!
//! Devices with blocking I/O instead of callbacks are driven by a worker
//! thread that runs the same callback path.

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod builder;
mod config;
pub mod device;
mod error;
mod event;
pub mod format;
mod gain;
pub mod pipeline;
mod state;
mod stream;
pub mod timeline;
mod worker;

pub use builder::AudioStreamBuilder;
pub use config::{Direction, StreamConfig, SyncConfig};
pub use device::{
    list_input_devices, list_output_devices, AudioDriver, BlockingDevice, BlockingDriver,
    CpalDriver, DeviceCallback, DeviceControl, DeviceFormat, DeviceState,
};
pub use error::{DeviceError, StreamTimelineError};
pub use event::{event_callback, EventCallback, StreamEvent};
pub use gain::GainControl;
pub use pipeline::CursorSnapshot;
pub use stream::{AudioStream, QueueRequest, StreamPhase, StreamStats};
pub use timeline::Timeline;
