//! Bounded FIFO of decoded frames waiting for presentation
//!
//! The decoder thread pushes, the presentation thread pops. Both ends block:
//! the producer while the queue is full, the consumer while it is empty.
//! Closing the queue releases both so shutdown never hangs on a blocked
//! thread.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use super::{FramePool, VideoFrame};
use crate::clock::VideoClock;
use crate::types::DEFAULT_FRAME_QUEUE_CAPACITY;

struct QueueState {
    frames: VecDeque<VideoFrame>,
    closed: bool,
}

/// Fixed-capacity queue of ready-to-present video frames
pub struct FrameQueue {
    state: Mutex<QueueState>,
    capacity: usize,
    /// Signalled when a frame is pushed (or the queue closes)
    frame_available: Condvar,
    /// Signalled when a frame is popped (or the queue closes)
    space_available: Condvar,
    /// Timestamp of the last frame produced
    video_clock: VideoClock,
}

impl FrameQueue {
    /// Create a queue holding at most `capacity` frames (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                frames: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            frame_available: Condvar::new(),
            space_available: Condvar::new(),
            video_clock: VideoClock::new(),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_FRAME_QUEUE_CAPACITY)
    }

    /// Append a frame, blocking while the queue is full
    ///
    /// Every accepted frame other than the end-of-stream sentinel advances the
    /// video clock. If the queue is closed the frame is handed back in `Err`
    /// so the caller can recycle it.
    pub fn enqueue(&self, frame: VideoFrame) -> Result<(), VideoFrame> {
        let mut state = self.state.lock();
        while !state.closed && state.frames.len() >= self.capacity {
            self.space_available.wait(&mut state);
        }
        if state.closed {
            return Err(frame);
        }

        if !frame.is_end_of_stream() {
            self.video_clock.record(frame.timestamp);
        }
        state.frames.push_back(frame);
        drop(state);
        self.frame_available.notify_one();
        Ok(())
    }

    /// Remove the oldest frame, blocking while the queue is empty
    ///
    /// Returns `None` once the queue has been closed.
    pub fn dequeue(&self) -> Option<VideoFrame> {
        let mut state = self.state.lock();
        while !state.closed && state.frames.is_empty() {
            self.frame_available.wait(&mut state);
        }
        if state.closed {
            return None;
        }

        let frame = state.frames.pop_front();
        drop(state);
        self.space_available.notify_one();
        frame
    }

    /// Remove the oldest frame if one is ready. Never blocks.
    pub fn try_dequeue(&self) -> Option<VideoFrame> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        let frame = state.frames.pop_front();
        drop(state);
        if frame.is_some() {
            self.space_available.notify_one();
        }
        frame
    }

    /// Move every queued frame into `pool`, returning how many were moved
    pub fn drain_into(&self, pool: &FramePool) -> usize {
        let drained: Vec<VideoFrame> = {
            let mut state = self.state.lock();
            state.frames.drain(..).collect()
        };
        self.space_available.notify_all();

        let count = drained.len();
        for frame in drained {
            pool.release(frame);
        }
        count
    }

    /// Close the queue and wake every blocked producer and consumer
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        drop(state);
        self.frame_available.notify_all();
        self.space_available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Handle to the clock tracking the most recently produced frame
    pub fn video_clock(&self) -> VideoClock {
        self.video_clock.clone()
    }
}
