//! Drift-correction thresholds
//!
//! Both thresholds are empirical tuning values. They are fixed when a
//! session is built and not changed during playback.

use serde::{Deserialize, Serialize};

use crate::types::duration_to_nanos;
use std::time::Duration;

/// Default minimum sync threshold (1ms)
pub const DEFAULT_MIN_SYNC_THRESHOLD_MS: u64 = 1;

/// Default large-desync cutoff (1s)
pub const DEFAULT_LARGE_DESYNC_THRESHOLD_MS: u64 = 1000;

/// Drift correction configuration for the presentation scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Lower bound of the in-sync window
    ///
    /// Keeps tiny jitter from triggering a correction when the nominal frame
    /// interval is zero or very small.
    pub min_sync_threshold_ms: u64,

    /// Drift at or beyond which a frame is treated as a discontinuity (seek)
    /// and presented immediately instead of corrected
    pub large_desync_threshold_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            min_sync_threshold_ms: DEFAULT_MIN_SYNC_THRESHOLD_MS,
            large_desync_threshold_ms: DEFAULT_LARGE_DESYNC_THRESHOLD_MS,
        }
    }
}

impl SyncConfig {
    pub fn min_sync_threshold(&self) -> Duration {
        Duration::from_millis(self.min_sync_threshold_ms)
    }

    pub fn large_desync_threshold(&self) -> Duration {
        Duration::from_millis(self.large_desync_threshold_ms)
    }

    pub(crate) fn min_sync_threshold_nanos(&self) -> i64 {
        duration_to_nanos(self.min_sync_threshold())
    }

    pub(crate) fn large_desync_threshold_nanos(&self) -> i64 {
        duration_to_nanos(self.large_desync_threshold())
    }

    /// Set the minimum sync threshold
    pub fn with_min_sync_threshold_ms(mut self, ms: u64) -> Self {
        self.min_sync_threshold_ms = ms;
        self
    }

    /// Set the large-desync cutoff
    pub fn with_large_desync_threshold_ms(mut self, ms: u64) -> Self {
        self.large_desync_threshold_ms = ms;
        self
    }
}
