//! CPAL device output fed from the sample ring buffer
//!
//! The device callback reads straight into its output buffer (viewed as
//! bytes through bytemuck) and fills whatever the ring could not supply with
//! silence. The callback never blocks: an empty ring is an underrun, not a
//! stall.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleRate, Stream, StreamConfig};

use super::{AudioError, AudioFormat, AudioResult, OutputStats, SampleFormat};
use crate::ring::SampleRingBuffer;

/// Running device output
///
/// Keeps the stream alive. Drop this to stop audio.
pub struct CpalOutput {
    _stream: Stream,
    stats: Arc<OutputStats>,
    device_name: String,
}

impl CpalOutput {
    /// Open the default output device and start draining `ring`
    ///
    /// The ring must carry interleaved f32 samples in `format`'s layout.
    pub fn start(ring: Arc<SampleRingBuffer>, format: AudioFormat) -> AudioResult<Self> {
        if format.sample_format != SampleFormat::F32 {
            return Err(AudioError::UnsupportedFormat(format.sample_format));
        }

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevices)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("[AUDIO] Using audio device: {}", device_name);

        let stream_config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: CpalBufferSize::Default,
        };

        let stats = Arc::new(OutputStats::default());
        let callback_stats = stats.clone();

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let bytes: &mut [u8] = bytemuck::cast_slice_mut(data);
                    let read = ring.read(bytes);
                    if read < bytes.len() {
                        bytes[read..].fill(0);
                    }
                    callback_stats.record_period(read, bytes.len());
                },
                |err| log::error!("[AUDIO] Stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

        log::info!(
            "[AUDIO] Device output started: {} Hz, {} ch",
            format.sample_rate,
            format.channels
        );

        Ok(Self {
            _stream: stream,
            stats,
            device_name,
        })
    }

    pub fn stats(&self) -> Arc<OutputStats> {
        self.stats.clone()
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}
