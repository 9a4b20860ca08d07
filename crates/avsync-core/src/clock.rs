//! Playback clocks and master clock selection
//!
//! Three read-only time sources, all in presentation-timeline nanoseconds:
//!
//! - **System**: wall time elapsed since the session started
//! - **Video**: timestamp of the most recently *produced* frame
//! - **Audio**: how much audio the device has actually consumed
//!   (`total_read` of the ring buffer through the [`AudioFormat`])
//!
//! None of them can be set. They are projections of counters that move on
//! their own (elapsed time, frame production, ring buffer reads).
//!
//! The master clock is the one video presentation tracks. Audio is preferred
//! because the output device drains samples at a fixed hardware rate; without
//! an audio stream the system clock is used. The choice is made once per
//! session so the reference never flips mid-playback.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::audio::AudioFormat;
use crate::ring::SampleRingBuffer;
use crate::types::Timestamp;

/// Which clock video presentation is synchronized against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterClock {
    Audio,
    System,
}

impl MasterClock {
    pub fn name(&self) -> &'static str {
        match self {
            MasterClock::Audio => "audio",
            MasterClock::System => "system",
        }
    }
}

/// Timestamp of the most recently produced video frame
///
/// Written by the frame queue on every accepted frame, read by the clock set.
/// Cloning shares the same underlying value.
#[derive(Debug, Clone, Default)]
pub struct VideoClock {
    last_produced: Arc<AtomicI64>,
}

impl VideoClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, timestamp: Timestamp) {
        self.last_produced
            .store(timestamp.as_nanos(), Ordering::Release);
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.last_produced.load(Ordering::Acquire))
    }
}

/// Clock derived from audio consumption
#[derive(Clone)]
pub struct AudioClock {
    ring: Arc<SampleRingBuffer>,
    format: AudioFormat,
}

impl AudioClock {
    pub fn new(ring: Arc<SampleRingBuffer>, format: AudioFormat) -> Self {
        Self { ring, format }
    }

    /// Playback time of the audio consumed so far
    pub fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.format.bytes_to_nanos(self.ring.total_read()))
    }

    /// Whether the decoder has produced at least one sample
    pub fn has_samples(&self) -> bool {
        self.ring.total_written() > 0
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }
}

/// The system, video and audio clocks of one playback session
pub struct ClockSet {
    start: Instant,
    video: VideoClock,
    audio: Option<AudioClock>,
    master: OnceLock<MasterClock>,
}

impl ClockSet {
    /// Create the clock set; the system clock starts counting now
    pub fn new(video: VideoClock, audio: Option<AudioClock>) -> Self {
        Self {
            start: Instant::now(),
            video,
            audio,
            master: OnceLock::new(),
        }
    }

    /// Time elapsed since playback start
    pub fn system_now(&self) -> Timestamp {
        Timestamp::from_duration(self.start.elapsed())
    }

    /// Timestamp of the last produced video frame
    pub fn video_now(&self) -> Timestamp {
        self.video.now()
    }

    /// Audio consumed so far, or `None` for sessions without audio
    pub fn audio_now(&self) -> Option<Timestamp> {
        self.audio.as_ref().map(AudioClock::now)
    }

    /// Pick the master clock for this session
    ///
    /// Audio wins if an audio stream exists and has produced at least one
    /// sample at the time of the first call. Every later call returns the
    /// same choice.
    pub fn select_master(&self) -> MasterClock {
        *self.master.get_or_init(|| {
            let master = match &self.audio {
                Some(audio) if audio.has_samples() => MasterClock::Audio,
                Some(_) => {
                    log::warn!("[CLOCK] Audio stream has no samples yet, falling back to system clock");
                    MasterClock::System
                }
                None => MasterClock::System,
            };
            log::info!("[CLOCK] Master clock: {}", master.name());
            master
        })
    }

    /// The selected master, if selection has happened
    pub fn master(&self) -> Option<MasterClock> {
        self.master.get().copied()
    }

    /// Current reading of the master clock (selects it on first use)
    pub fn master_now(&self) -> Timestamp {
        match self.select_master() {
            MasterClock::Audio => self
                .audio_now()
                .unwrap_or_else(|| self.system_now()),
            MasterClock::System => self.system_now(),
        }
    }
}
