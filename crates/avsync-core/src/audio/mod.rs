//! Audio side of the pipeline - PCM format and output devices
//!
//! The decoder writes PCM into a [`SampleRingBuffer`](crate::ring::SampleRingBuffer);
//! an output device drains it at its own hardware pace. Two outputs are
//! provided:
//!
//! - **PacedOutput**: a software device thread, for headless playback and tests
//! - **CpalOutput**: the system's default output device (`cpal-output` feature)
//!
//! Both tolerate short reads: missing samples become silence and are counted
//! as underruns in [`OutputStats`].

mod error;
mod format;
mod paced;

#[cfg(feature = "cpal-output")]
mod cpal_output;

use std::sync::atomic::{AtomicU64, Ordering};

pub use error::{AudioError, AudioResult};
pub use format::{AudioFormat, SampleFormat, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE};
pub use paced::{PacedOutput, DEFAULT_PERIOD_FRAMES};

#[cfg(feature = "cpal-output")]
pub use cpal_output::CpalOutput;

/// Counters shared between an output device and its owner
#[derive(Debug, Default)]
pub struct OutputStats {
    bytes_played: AtomicU64,
    periods: AtomicU64,
    underruns: AtomicU64,
}

impl OutputStats {
    /// Record one device period that wanted `requested` bytes and got `read`
    pub(crate) fn record_period(&self, read: usize, requested: usize) {
        self.bytes_played.fetch_add(read as u64, Ordering::Relaxed);
        self.periods.fetch_add(1, Ordering::Relaxed);
        if read < requested {
            self.underruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// PCM bytes actually taken from the ring
    pub fn bytes_played(&self) -> u64 {
        self.bytes_played.load(Ordering::Relaxed)
    }

    pub fn periods(&self) -> u64 {
        self.periods.load(Ordering::Relaxed)
    }

    /// Periods that could not be filled completely
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}
