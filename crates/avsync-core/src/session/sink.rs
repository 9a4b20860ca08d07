//! Decoder-facing endpoint for video frames

use std::sync::Arc;

use crate::frame::{FramePool, FrameQueue, VideoFrame};
use crate::types::{PixelFormat, Timestamp};

/// What a video decoder uses to hand frames to the session
///
/// Wraps the pool/queue protocol: take a recycled buffer, fill it, submit
/// it. Cloning is cheap; all clones feed the same queue.
#[derive(Clone)]
pub struct VideoSink {
    queue: Arc<FrameQueue>,
    pool: Arc<FramePool>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl VideoSink {
    pub(crate) fn new(
        queue: Arc<FrameQueue>,
        pool: Arc<FramePool>,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Self {
        Self {
            queue,
            pool,
            width,
            height,
            format,
        }
    }

    /// A frame buffer sized for this stream, recycled when possible. Never blocks.
    pub fn acquire_frame(&self) -> VideoFrame {
        self.pool
            .acquire_or_allocate(self.width, self.height, self.format)
    }

    /// Queue a filled frame for presentation, blocking while the queue is full
    ///
    /// Returns `false` if the session has been stopped; the frame is recycled.
    pub fn submit(&self, frame: VideoFrame) -> bool {
        match self.queue.enqueue(frame) {
            Ok(()) => true,
            Err(frame) => {
                self.pool.release(frame);
                false
            }
        }
    }

    /// Fill-and-submit helper: acquire a buffer, let `fill` write the pixels,
    /// stamp it with `timestamp` and submit it
    pub fn submit_with<F>(&self, timestamp: Timestamp, fill: F) -> bool
    where
        F: FnOnce(&mut [u8]),
    {
        let mut frame = self.acquire_frame();
        fill(&mut frame.data);
        frame.timestamp = timestamp;
        self.submit(frame)
    }

    /// Signal end of stream by queueing the sentinel frame
    pub fn finish(&self) -> bool {
        let mut frame = self.acquire_frame();
        frame.timestamp = Timestamp::END_OF_STREAM;
        self.submit(frame)
    }

    /// Frames currently waiting for presentation
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}
