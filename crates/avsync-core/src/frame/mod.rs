//! Video frame transport - frames, ready queue, recycling pool
//!
//! ```text
//!  decoder ──acquire──► FramePool ◄──release── SyncScheduler
//!     │                                             ▲
//!     └──────enqueue──► FrameQueue ──dequeue────────┘
//! ```
//!
//! A frame is owned by exactly one of these at any time; every hand-off is a
//! move.

mod pool;
mod queue;
mod video_frame;

pub use pool::FramePool;
pub use queue::FrameQueue;
pub use video_frame::VideoFrame;
