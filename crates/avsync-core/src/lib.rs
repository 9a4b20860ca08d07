//! avsync Core - Audio/video playback synchronization pipeline
//!
//! Buffers, clocks and the presentation scheduler that keep decoded video
//! frames in step with the audio being played.

pub mod audio;
pub mod clock;
pub mod config;
pub mod frame;
pub mod ring;
pub mod session;
pub mod sync;
pub mod types;

pub use types::*;
