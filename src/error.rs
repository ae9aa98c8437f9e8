//! Error types for stream-timeline.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`StreamTimelineError`]): Prevent a stream from being created
//! - **Device errors** ([`DeviceError`]): Reported by a device while running; logged
//!   and counted, never propagated out of the data path

/// Fatal errors that prevent an audio stream from being created.
///
/// These errors are returned from [`AudioStreamBuilder::build()`]. Any
/// resources allocated before the failure (ring buffer, partially opened
/// device) are released before the error is returned.
///
/// [`AudioStreamBuilder::build()`]: crate::AudioStreamBuilder::build
#[derive(Debug, thiserror::Error)]
pub enum StreamTimelineError {
    /// The stream configuration is unusable.
    #[error("invalid stream configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The requested audio device was not found.
    #[error("device not found: {name}")]
    DeviceNotFound {
        /// Name of the device that wasn't found.
        name: String,
    },

    /// No default device is configured for the requested direction.
    #[error("no default {direction} device configured")]
    NoDefaultDevice {
        /// "output" or "input".
        direction: &'static str,
    },

    /// The device's native sample format cannot carry 16-bit PCM.
    #[error("unsupported sample format: {format}")]
    UnsupportedFormat {
        /// The format that wasn't supported.
        format: String,
    },

    /// The device refused to open with the requested format.
    #[error("device '{device}' failed to open: {reason}")]
    DeviceOpenFailed {
        /// Name of the device.
        device: String,
        /// Why the device failed to open.
        reason: String,
    },

    /// An error from the underlying audio library (CPAL).
    #[error("audio backend error: {0}")]
    BackendError(String),

    /// The worker thread for a blocking device could not be started.
    #[error("failed to spawn audio worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

impl StreamTimelineError {
    /// Creates an invalid configuration error with the given reason.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Creates a device open failure for the given device.
    pub fn open_failed(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeviceOpenFailed {
            device: device.into(),
            reason: reason.into(),
        }
    }
}

/// Errors reported by a device implementation while a stream runs.
///
/// Device errors are recoverable from the stream's point of view: the
/// data path absorbs them as silence and the controller logs them.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Writing a buffer to the device failed.
    #[error("device write failed: {reason}")]
    WriteFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// Reading captured audio from the device failed.
    #[error("device read failed: {reason}")]
    ReadFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// The device rejected a play/pause/stop request.
    #[error("device state change failed: {reason}")]
    StateChange {
        /// Description of what went wrong.
        reason: String,
    },

    /// The device has been closed.
    #[error("device closed")]
    Closed,
}

impl DeviceError {
    /// Creates a write failed error with the given reason.
    pub fn write_failed(reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            reason: reason.into(),
        }
    }

    /// Creates a read failed error with the given reason.
    pub fn read_failed(reason: impl Into<String>) -> Self {
        Self::ReadFailed {
            reason: reason.into(),
        }
    }

    /// Creates a state change error with the given reason.
    pub fn state_change(reason: impl Into<String>) -> Self {
        Self::StateChange {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_display() {
        let err = StreamTimelineError::invalid_config("channels must be non-zero");
        assert_eq!(
            err.to_string(),
            "invalid stream configuration: channels must be non-zero"
        );
    }

    #[test]
    fn test_no_default_device_display() {
        let err = StreamTimelineError::NoDefaultDevice {
            direction: "output",
        };
        assert_eq!(err.to_string(), "no default output device configured");
    }

    #[test]
    fn test_open_failed_display() {
        let err = StreamTimelineError::open_failed("mock", "busy");
        assert_eq!(err.to_string(), "device 'mock' failed to open: busy");
    }

    #[test]
    fn test_device_error_helpers() {
        assert_eq!(
            DeviceError::write_failed("queue full").to_string(),
            "device write failed: queue full"
        );
        assert_eq!(
            DeviceError::read_failed("overflow").to_string(),
            "device read failed: overflow"
        );
        assert_eq!(DeviceError::Closed.to_string(), "device closed");
    }

    #[test]
    fn test_worker_spawn_source() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::Other, "no threads");
        let err = StreamTimelineError::WorkerSpawn(io);
        assert!(err.source().is_some());
    }
}
