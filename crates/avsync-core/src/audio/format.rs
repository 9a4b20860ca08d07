//! PCM layout of the bytes in the sample ring buffer
//!
//! The ring buffer is byte-oriented; this format is what turns a byte count
//! into playback time for the audio clock.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default sample rate (48kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Default channel count (stereo)
pub const DEFAULT_CHANNELS: u16 = 2;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Encoding of a single PCM sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SampleFormat {
    /// 32-bit float, native endian
    #[default]
    F32,
    /// 16-bit signed integer, native endian
    I16,
}

impl SampleFormat {
    pub fn bytes(&self) -> usize {
        match self {
            SampleFormat::F32 => 4,
            SampleFormat::I16 => 2,
        }
    }
}

/// Interleaved PCM format of the decoded audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFormat {
    /// Sample frames per second
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
    pub sample_format: SampleFormat,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            sample_format: SampleFormat::default(),
        }
    }
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16, sample_format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format,
        }
    }

    /// Bytes per sample frame (one sample for every channel)
    pub fn bytes_per_frame(&self) -> usize {
        self.channels.max(1) as usize * self.sample_format.bytes()
    }

    /// Duration of one sample frame in nanoseconds
    pub fn nanos_per_sample(&self) -> f64 {
        NANOS_PER_SECOND as f64 / self.sample_rate.max(1) as f64
    }

    /// Playback time covered by `bytes` of PCM, in nanoseconds
    ///
    /// Partial sample frames are ignored. Integer math, so long sessions
    /// don't accumulate rounding drift.
    pub fn bytes_to_nanos(&self, bytes: u64) -> i64 {
        let frames = bytes as u128 / self.bytes_per_frame() as u128;
        let nanos = frames * NANOS_PER_SECOND / self.sample_rate.max(1) as u128;
        i64::try_from(nanos).unwrap_or(i64::MAX)
    }

    /// Bytes of PCM covering `duration`, rounded down to whole sample frames
    pub fn duration_to_bytes(&self, duration: Duration) -> usize {
        let frames = duration.as_nanos() * self.sample_rate as u128 / NANOS_PER_SECOND;
        usize::try_from(frames).unwrap_or(usize::MAX / self.bytes_per_frame())
            * self.bytes_per_frame()
    }

    /// Bytes per second of audio
    pub fn byte_rate(&self) -> usize {
        self.sample_rate as usize * self.bytes_per_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_frame() {
        assert_eq!(AudioFormat::default().bytes_per_frame(), 8);
        assert_eq!(
            AudioFormat::new(44100, 1, SampleFormat::I16).bytes_per_frame(),
            2
        );
    }

    #[test]
    fn test_one_second_of_bytes_is_one_second() {
        let format = AudioFormat::default();
        let bytes = format.byte_rate() as u64;
        assert_eq!(format.bytes_to_nanos(bytes), 1_000_000_000);
    }

    #[test]
    fn test_partial_frames_are_ignored() {
        let format = AudioFormat::default();
        assert_eq!(format.bytes_to_nanos(7), 0);
        assert_eq!(format.bytes_to_nanos(8), 20_833);
    }

    #[test]
    fn test_duration_to_bytes_is_frame_aligned() {
        let format = AudioFormat::new(48000, 2, SampleFormat::F32);
        assert_eq!(format.duration_to_bytes(Duration::from_millis(10)), 480 * 8);
        let odd = format.duration_to_bytes(Duration::from_micros(30));
        assert_eq!(odd % format.bytes_per_frame(), 0);
    }

    #[test]
    fn test_nanos_per_sample() {
        let format = AudioFormat::new(1000, 1, SampleFormat::F32);
        assert!((format.nanos_per_sample() - 1_000_000.0).abs() < f64::EPSILON);
    }
}
