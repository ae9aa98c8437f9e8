//! CPAL-backed callback driver.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleFormat, SampleRate, Stream, StreamConfig as CpalStreamConfig};

use super::{AudioDriver, DeviceCallback, DeviceControl, DeviceFormat, DeviceState};
use crate::config::Direction;
use crate::format::{f32_to_i16, i16_to_f32};
use crate::{DeviceError, StreamTimelineError};

/// Opens system audio devices through CPAL.
///
/// The device is opened at the stream's sample rate and channel count;
/// only the sample type follows the device (16-bit integer or 32-bit
/// float, converted on the fly).
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct CpalDriver {
    device_name: Option<String>,
    buffer_frames: Option<u32>,
}

impl CpalDriver {
    /// Uses the system default device for the stream's direction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a specific device by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
            buffer_frames: None,
        }
    }

    /// Requests a fixed callback size in frames instead of the device default.
    pub fn buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_frames = Some(frames);
        self
    }

    fn find_device(&self, direction: Direction) -> Result<Device, StreamTimelineError> {
        let host = cpal::default_host();
        let Some(name) = &self.device_name else {
            let device = match direction {
                Direction::Playback => host.default_output_device(),
                Direction::Capture => host.default_input_device(),
            };
            return device.ok_or(StreamTimelineError::NoDefaultDevice {
                direction: direction.device_kind(),
            });
        };

        let devices = match direction {
            Direction::Playback => host.output_devices(),
            Direction::Capture => host.input_devices(),
        }
        .map_err(|e| StreamTimelineError::BackendError(e.to_string()))?;

        for device in devices {
            if let Ok(device_name) = device.name() {
                if &device_name == name {
                    return Ok(device);
                }
            }
        }

        Err(StreamTimelineError::DeviceNotFound { name: name.clone() })
    }
}

impl AudioDriver for CpalDriver {
    fn name(&self) -> &str {
        self.device_name.as_deref().unwrap_or("cpal-default")
    }

    fn open(
        &mut self,
        format: &DeviceFormat,
        callback: DeviceCallback,
    ) -> Result<Box<dyn DeviceControl>, StreamTimelineError> {
        let device = self.find_device(format.direction)?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let supported = match format.direction {
            Direction::Playback => device.default_output_config(),
            Direction::Capture => device.default_input_config(),
        }
        .map_err(|e| StreamTimelineError::open_failed(&device_name, e.to_string()))?;

        let config = CpalStreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: self
                .buffer_frames
                .map_or(BufferSize::Default, BufferSize::Fixed),
        };

        let stream = match (format.direction, supported.sample_format()) {
            (Direction::Playback, SampleFormat::I16) => build_i16_output(&device, &config, callback),
            (Direction::Playback, SampleFormat::F32) => build_f32_output(&device, &config, callback),
            (Direction::Capture, SampleFormat::I16) => build_i16_input(&device, &config, callback),
            (Direction::Capture, SampleFormat::F32) => build_f32_input(&device, &config, callback),
            (_, sample_format) => {
                return Err(StreamTimelineError::UnsupportedFormat {
                    format: format!("{sample_format:?}"),
                });
            }
        }
        .map_err(|e| StreamTimelineError::open_failed(&device_name, e.to_string()))?;

        // Some backends start streams on creation; nothing plays until armed.
        if let Err(e) = stream.pause() {
            tracing::debug!(device = %device_name, error = %e, "initial pause not supported");
        }

        tracing::debug!(
            device = %device_name,
            sample_format = ?supported.sample_format(),
            channels = format.channels,
            sample_rate = format.sample_rate,
            "cpal stream built"
        );

        Ok(Box::new(CpalStream {
            stream,
            device_name,
        }))
    }
}

fn log_stream_error(err: cpal::StreamError) {
    tracing::error!("Audio stream error: {}", err);
}

fn build_i16_output(
    device: &Device,
    config: &CpalStreamConfig,
    mut callback: DeviceCallback,
) -> Result<Stream, cpal::BuildStreamError> {
    device.build_output_stream(
        config,
        move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
            callback.render_i16(data);
        },
        log_stream_error,
        None,
    )
}

fn build_f32_output(
    device: &Device,
    config: &CpalStreamConfig,
    mut callback: DeviceCallback,
) -> Result<Stream, cpal::BuildStreamError> {
    let mut scratch: Vec<i16> = Vec::new();
    device.build_output_stream(
        config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            if scratch.len() < data.len() {
                scratch.resize(data.len(), 0);
            }
            let samples = &mut scratch[..data.len()];
            callback.render_i16(samples);
            for (out, &sample) in data.iter_mut().zip(samples.iter()) {
                *out = i16_to_f32(sample);
            }
        },
        log_stream_error,
        None,
    )
}

fn build_i16_input(
    device: &Device,
    config: &CpalStreamConfig,
    mut callback: DeviceCallback,
) -> Result<Stream, cpal::BuildStreamError> {
    device.build_input_stream(
        config,
        move |data: &[i16], _: &cpal::InputCallbackInfo| {
            callback.capture_i16(data);
        },
        log_stream_error,
        None,
    )
}

fn build_f32_input(
    device: &Device,
    config: &CpalStreamConfig,
    mut callback: DeviceCallback,
) -> Result<Stream, cpal::BuildStreamError> {
    let mut scratch: Vec<i16> = Vec::new();
    device.build_input_stream(
        config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            scratch.clear();
            scratch.extend(data.iter().map(|&sample| f32_to_i16(sample)));
            callback.capture_i16(&scratch);
        },
        log_stream_error,
        None,
    )
}

/// A running CPAL stream.
///
/// Dropping the inner stream stops the device and releases it.
struct CpalStream {
    stream: Stream,
    device_name: String,
}

impl DeviceControl for CpalStream {
    fn set_state(&mut self, state: DeviceState) -> Result<(), DeviceError> {
        let result = match state {
            DeviceState::Playing => self.stream.play().map_err(|e| e.to_string()),
            DeviceState::Paused | DeviceState::Stopped => {
                self.stream.pause().map_err(|e| e.to_string())
            }
        };
        result.map_err(DeviceError::state_change)
    }

    fn close(self: Box<Self>) {
        if let Err(e) = self.stream.pause() {
            tracing::debug!(device = %self.device_name, error = %e, "pause before close failed");
        }
        tracing::debug!(device = %self.device_name, "cpal stream closed");
    }
}
