//! Core buffering primitives.
//!
//! The stream moves audio between two clocks through a ring buffer:
//!
//! ```text
//! Application (Queue) → send cursor → Circular Buffer → pick cursor → Device callback
//! Device callback      → send cursor → Circular Buffer → pick cursor → Application (Dequeue)
//! ```
//!
//! - **Circular Buffer**: Fixed-capacity byte store addressed by absolute offsets
//! - **Cursor Pair**: Send/pick offsets, each advanced by exactly one side
//! - **Drift Corrector**: Snaps the lagging cursor back into the jitter window
//! - **Signal**: Counting wake-up for streams served by a worker thread

mod cursor;
mod drift;
mod ring_buffer;
mod signal;

pub use cursor::{CursorPair, CursorSnapshot};
pub use drift::{initial_sync, DriftCorrector, InitialSync, Resync};
pub use ring_buffer::CircularBuffer;
pub(crate) use signal::Signal;
