//! Decoded video frame

use crate::types::{PixelFormat, Timestamp};

/// A decoded video frame travelling decoder → queue → scheduler → pool
///
/// Frames are moved, never shared: whoever holds the value owns the pixel
/// buffer. The buffer allocation survives recycling through the pool, so
/// `prepare` only reallocates when a larger image arrives.
#[derive(Debug)]
pub struct VideoFrame {
    /// Presentation timestamp
    pub timestamp: Timestamp,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Pixel payload, sized by `format.frame_size(width, height)`
    pub data: Vec<u8>,
}

impl VideoFrame {
    /// Allocate a new frame for the given geometry
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            timestamp: Timestamp::ZERO,
            width,
            height,
            format,
            data: vec![0; format.frame_size(width, height)],
        }
    }

    /// A payload-less frame carrying the end-of-stream sentinel
    pub fn end_of_stream() -> Self {
        Self {
            timestamp: Timestamp::END_OF_STREAM,
            width: 0,
            height: 0,
            format: PixelFormat::default(),
            data: Vec::new(),
        }
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.timestamp.is_end_of_stream()
    }

    /// Reshape a (possibly recycled) frame for new content
    ///
    /// Keeps the existing allocation when it is large enough. Payload bytes
    /// left over from a previous use are not cleared; the decoder overwrites
    /// them.
    pub fn prepare(&mut self, width: u32, height: u32, format: PixelFormat) {
        self.width = width;
        self.height = height;
        self.format = format;
        self.timestamp = Timestamp::ZERO;
        self.data.resize(format.frame_size(width, height), 0);
    }

    /// Size of the backing allocation in bytes
    pub fn allocated_bytes(&self) -> usize {
        self.data.capacity()
    }
}
