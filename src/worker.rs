//! Worker thread for devices with blocking I/O.
//!
//! The worker owns the device and drives the stream's [`DeviceCallback`]
//! exactly as a callback-driven device would, one quantum per iteration.
//! A playback worker sleeps on the stream's signal between chunks; a
//! capture worker is paced by the device's `read`.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::Direction;
use crate::device::{BlockingDevice, DeviceCallback};
use crate::StreamEvent;

/// Read size used before a capture stream learns its quantum.
const DEFAULT_CAPTURE_PERIOD: Duration = Duration::from_millis(20);

/// Closes the device when the worker exits, or when it never started.
struct DeviceGuard(Box<dyn BlockingDevice>);

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Spawns the worker thread for `direction`.
pub(crate) fn spawn(
    direction: Direction,
    device: Box<dyn BlockingDevice>,
    callback: DeviceCallback,
) -> io::Result<JoinHandle<()>> {
    let device = DeviceGuard(device);
    let name = format!("stream-timeline-{}", direction.device_kind());
    thread::Builder::new().name(name).spawn(move || {
        let mut device = device;
        match direction {
            Direction::Playback => run_playback(&mut *device.0, callback),
            Direction::Capture => run_capture(&mut *device.0, callback),
        }
        tracing::debug!(?direction, "audio worker exiting");
    })
}

fn run_playback(device: &mut dyn BlockingDevice, mut callback: DeviceCallback) {
    let mut scratch = Vec::new();
    loop {
        callback.wait();
        if callback.is_cancelled() {
            return;
        }
        let quantum = callback.quantum();
        if quantum == 0 {
            continue;
        }
        scratch.resize(quantum, 0);
        if !callback.render(&mut scratch) {
            continue;
        }
        if let Err(e) = device.write(&scratch) {
            tracing::warn!(error = %e, "blocking device write failed, stopping worker");
            callback.report(StreamEvent::DeviceFault {
                reason: e.to_string(),
            });
            return;
        }
    }
}

fn run_capture(device: &mut dyn BlockingDevice, mut callback: DeviceCallback) {
    let mut scratch = Vec::new();
    loop {
        if callback.is_cancelled() {
            return;
        }
        let len = match callback.quantum() {
            0 => default_period_bytes(&callback),
            quantum => quantum,
        };
        scratch.resize(len, 0);
        match device.read(&mut scratch) {
            Ok(0) => {}
            Ok(read) => {
                callback.capture(&scratch[..read.min(len)]);
            }
            Err(e) => {
                tracing::warn!(error = %e, "blocking device read failed, stopping worker");
                callback.report(StreamEvent::DeviceFault {
                    reason: e.to_string(),
                });
                return;
            }
        }
    }
}

fn default_period_bytes(callback: &DeviceCallback) -> usize {
    let timeline = callback.timeline();
    usize::try_from(timeline.bytes_for(DEFAULT_CAPTURE_PERIOD)).unwrap_or(0).max(2)
}
