//! Common types for avsync
//!
//! This module contains the time and pixel types shared by the ring buffer,
//! the frame queue and the presentation scheduler.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const NANOS_PER_MILLI: i64 = 1_000_000;

/// Default number of ready frames the frame queue holds
pub const DEFAULT_FRAME_QUEUE_CAPACITY: usize = 5;

/// Default pool cap as a multiple of the frame queue capacity
pub const POOL_CAPACITY_FACTOR: usize = 3;

/// A presentation timestamp in signed nanoseconds
///
/// Signed so that differences between timestamps and clock readings can be
/// taken directly. `END_OF_STREAM` is reserved as the sentinel a decoder
/// enqueues to end playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Start of the presentation timeline
    pub const ZERO: Timestamp = Timestamp(0);

    /// Sentinel marking the end of the video stream
    pub const END_OF_STREAM: Timestamp = Timestamp(i64::MIN);

    #[inline]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(NANOS_PER_MILLI))
    }

    /// Convert a duration since the start of playback, saturating on overflow
    pub fn from_duration(duration: Duration) -> Self {
        Self(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX))
    }

    #[inline]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn as_millis(self) -> i64 {
        self.0 / NANOS_PER_MILLI
    }

    #[inline]
    pub fn is_end_of_stream(self) -> bool {
        self == Self::END_OF_STREAM
    }

    /// Signed distance `self - earlier` in nanoseconds
    #[inline]
    pub fn nanos_since(self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_end_of_stream() {
            write!(f, "EOS")
        } else {
            write!(f, "{:.3}ms", self.0 as f64 / NANOS_PER_MILLI as f64)
        }
    }
}

/// Convert a non-negative nanosecond count to a `Duration` (negative clamps to zero)
#[inline]
pub fn nanos_to_duration(nanos: i64) -> Duration {
    Duration::from_nanos(nanos.max(0) as u64)
}

/// Convert a `Duration` to signed nanoseconds, saturating on overflow
#[inline]
pub fn duration_to_nanos(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX)
}

/// Pixel layout of a video frame payload
///
/// The core never interprets pixels; the format only sizes the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 8-bit RGBA, 4 bytes per pixel
    #[default]
    Rgba8,
    /// 8-bit BGRA, 4 bytes per pixel
    Bgra8,
    /// Planar YUV 4:2:0, 12 bits per pixel
    Yuv420p,
}

impl PixelFormat {
    /// Bytes needed for a `width` × `height` image in this format
    pub fn frame_size(&self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => pixels * 4,
            PixelFormat::Yuv420p => {
                let chroma_w = (width as usize).div_ceil(2);
                let chroma_h = (height as usize).div_ceil(2);
                pixels + 2 * chroma_w * chroma_h
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PixelFormat::Rgba8 => "RGBA8",
            PixelFormat::Bgra8 => "BGRA8",
            PixelFormat::Yuv420p => "YUV420P",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_millis_roundtrip() {
        let ts = Timestamp::from_millis(33);
        assert_eq!(ts.as_nanos(), 33_000_000);
        assert_eq!(ts.as_millis(), 33);
    }

    #[test]
    fn test_timestamp_ordering_and_distance() {
        let a = Timestamp::from_millis(100);
        let b = Timestamp::from_millis(5000);
        assert!(a < b);
        assert_eq!(b.nanos_since(a), 4_900_000_000);
        assert_eq!(a.nanos_since(b), -4_900_000_000);
    }

    #[test]
    fn test_end_of_stream_sentinel() {
        assert!(Timestamp::END_OF_STREAM.is_end_of_stream());
        assert!(!Timestamp::ZERO.is_end_of_stream());
        assert_eq!(Timestamp::END_OF_STREAM.to_string(), "EOS");
    }

    #[test]
    fn test_nanos_to_duration_clamps_negative() {
        assert_eq!(nanos_to_duration(-5), Duration::ZERO);
        assert_eq!(nanos_to_duration(1_500), Duration::from_nanos(1_500));
    }

    #[test]
    fn test_frame_sizes() {
        assert_eq!(PixelFormat::Rgba8.frame_size(4, 2), 32);
        assert_eq!(PixelFormat::Yuv420p.frame_size(4, 4), 16 + 2 * 4);
        assert_eq!(PixelFormat::Yuv420p.frame_size(3, 3), 9 + 2 * 4);
    }
}
