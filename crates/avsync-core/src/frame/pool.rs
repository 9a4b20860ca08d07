//! Recycling pool for video frame buffers
//!
//! The decoder acquires a buffer here before filling it and the scheduler
//! releases it after presentation, so steady-state playback allocates
//! nothing. The pool is an optimization, not a capacity limit:
//!
//! - `acquire` on an empty pool returns `None` and the caller allocates
//! - `release` on a full pool drops the frame to bound memory
//!
//! Backed by a lock-free `crossbeam` array queue, so concurrent
//! acquire/release from the decoder and presentation threads never block.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::queue::ArrayQueue;

use super::VideoFrame;
use crate::types::PixelFormat;

/// Pool of idle video frames
pub struct FramePool {
    frames: ArrayQueue<VideoFrame>,
    /// Frames allocated because the pool was empty
    allocated: AtomicU64,
    /// Frames dropped because the pool was full
    dropped: AtomicU64,
}

impl FramePool {
    /// Create a pool holding at most `max_frames` idle frames
    pub fn new(max_frames: usize) -> Self {
        Self {
            frames: ArrayQueue::new(max_frames.max(1)),
            allocated: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Take an idle frame if one is available. Never blocks.
    pub fn acquire(&self) -> Option<VideoFrame> {
        self.frames.pop()
    }

    /// Take an idle frame or allocate a fresh one, prepared for the given geometry
    pub fn acquire_or_allocate(&self, width: u32, height: u32, format: PixelFormat) -> VideoFrame {
        match self.frames.pop() {
            Some(mut frame) => {
                frame.prepare(width, height, format);
                frame
            }
            None => {
                let total = self.allocated.fetch_add(1, Ordering::Relaxed) + 1;
                log::trace!(
                    "[POOL] Empty, allocating {}x{} {} frame (total allocated: {})",
                    width,
                    height,
                    format.name(),
                    total
                );
                VideoFrame::new(width, height, format)
            }
        }
    }

    /// Hand a frame back to the pool. Never blocks.
    ///
    /// Ownership moves into the pool unconditionally; if the pool is already
    /// at its cap the frame is dropped.
    pub fn release(&self, frame: VideoFrame) {
        if let Err(frame) = self.frames.push(frame) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            log::trace!("[POOL] Full, dropping frame at {}", frame.timestamp);
        }
    }

    /// Number of idle frames currently pooled
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Maximum number of idle frames kept
    pub fn max_frames(&self) -> usize {
        self.frames.capacity()
    }

    /// Frames allocated by `acquire_or_allocate` because the pool was empty
    pub fn allocated_count(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Frames dropped by `release` because the pool was full
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
