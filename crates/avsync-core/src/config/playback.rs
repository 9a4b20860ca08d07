//! Playback session configuration
//!
//! Sizes of the audio ring buffer, frame queue and frame pool, the PCM
//! format that drives the audio clock, and the drift-correction thresholds.
//! Everything here is fixed for the lifetime of a session.

use serde::{Deserialize, Serialize};

use crate::audio::AudioFormat;
use crate::sync::SyncConfig;
use crate::types::{DEFAULT_FRAME_QUEUE_CAPACITY, POOL_CAPACITY_FACTOR};
use std::time::Duration;

/// Default audio ring buffer length (500ms of audio)
pub const DEFAULT_AUDIO_BUFFER_MS: u32 = 500;

/// Configuration for a [`PlaybackSession`](crate::session::PlaybackSession)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Whether the session carries an audio stream
    /// Without audio the system clock is the master.
    pub audio_enabled: bool,

    /// PCM layout of the audio stream
    pub audio: AudioFormat,

    /// Audio ring buffer length in milliseconds of audio
    pub audio_buffer_ms: u32,

    /// Ready frames the queue holds before the decoder blocks
    pub frame_queue_capacity: usize,

    /// Maximum idle frames kept for reuse
    /// None = 3 × frame_queue_capacity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_capacity: Option<usize>,

    /// Drift correction thresholds
    pub sync: SyncConfig,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            audio_enabled: true,
            audio: AudioFormat::default(),
            audio_buffer_ms: DEFAULT_AUDIO_BUFFER_MS,
            frame_queue_capacity: DEFAULT_FRAME_QUEUE_CAPACITY,
            pool_capacity: None,
            sync: SyncConfig::default(),
        }
    }
}

impl PlaybackConfig {
    /// Create config for a video-only session
    pub fn video_only() -> Self {
        Self {
            audio_enabled: false,
            ..Default::default()
        }
    }

    /// Ring buffer storage size in bytes
    ///
    /// Sized so the writable capacity (one byte less than the storage) still
    /// holds `audio_buffer_ms` worth of whole sample frames.
    pub fn ring_buffer_bytes(&self) -> usize {
        let duration = Duration::from_millis(self.audio_buffer_ms as u64);
        self.audio
            .duration_to_bytes(duration)
            .max(self.audio.bytes_per_frame())
            + 1
    }

    /// Effective pool capacity
    pub fn pool_capacity(&self) -> usize {
        self.pool_capacity
            .unwrap_or(self.frame_queue_capacity * POOL_CAPACITY_FACTOR)
            .max(1)
    }

    /// Set the audio format
    pub fn with_audio_format(mut self, format: AudioFormat) -> Self {
        self.audio = format;
        self
    }

    /// Enable or disable the audio stream
    pub fn with_audio_enabled(mut self, enabled: bool) -> Self {
        self.audio_enabled = enabled;
        self
    }

    /// Set the ring buffer length in milliseconds
    pub fn with_audio_buffer_ms(mut self, ms: u32) -> Self {
        self.audio_buffer_ms = ms;
        self
    }

    /// Set the frame queue capacity
    pub fn with_frame_queue_capacity(mut self, capacity: usize) -> Self {
        self.frame_queue_capacity = capacity;
        self
    }

    /// Set an explicit pool capacity
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = Some(capacity);
        self
    }

    /// Set the drift correction thresholds
    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }
}
