//! Drift correction - how long to hold a frame before presenting it
//!
//! For a frame at `ts`, with the previous frame presented at `last` and the
//! master clock reading `master`:
//!
//! ```text
//! nominal   = ts - last                       (frame interval, 0 for the first frame)
//! diff      = ts - master                     (> 0: frame is early, < 0: late)
//! threshold = max(nominal, min_sync_threshold)
//!
//! |diff| >= large_desync   → discontinuity, present now
//! diff <= -threshold       → late, present now (catch up)
//! diff >=  threshold       → early, wait 2 × nominal (slow down)
//! otherwise                → in sync, wait nominal
//! ```
//!
//! The result is applied as a single sleep; the next frame corrects whatever
//! error remains.

use std::time::Duration;

use super::SyncConfig;
use crate::types::{nanos_to_duration, Timestamp};

/// Which drift rule produced a delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// Within the threshold: present at the nominal frame rate
    InSync,
    /// Behind the master clock: present immediately
    CatchUp,
    /// Ahead of the master clock: hold for twice the nominal interval
    SlowDown,
    /// Too far from the master clock to correct (seek): present immediately
    Discontinuity,
}

impl Correction {
    pub fn name(&self) -> &'static str {
        match self {
            Correction::InSync => "in-sync",
            Correction::CatchUp => "catch-up",
            Correction::SlowDown => "slow-down",
            Correction::Discontinuity => "discontinuity",
        }
    }
}

/// Outcome of the drift computation for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayDecision {
    /// How long to wait before presenting
    pub delay: Duration,
    pub correction: Correction,
    /// Interval since the previously presented frame
    pub nominal_nanos: i64,
    /// Frame timestamp minus master clock
    pub diff_nanos: i64,
}

/// Compute the presentation delay for a frame
///
/// `last_presented` is `None` before the first frame, which makes the
/// nominal interval zero: the first frame is never held back.
pub fn compute_delay(
    timestamp: Timestamp,
    last_presented: Option<Timestamp>,
    master_now: Timestamp,
    config: &SyncConfig,
) -> DelayDecision {
    let nominal = last_presented
        .map(|last| timestamp.nanos_since(last))
        .unwrap_or(0)
        .max(0);
    let diff = timestamp.nanos_since(master_now);
    let threshold = nominal.max(config.min_sync_threshold_nanos());

    let (delay, correction) = if diff.unsigned_abs() >= config.large_desync_threshold_nanos() as u64 {
        (0, Correction::Discontinuity)
    } else if diff <= -threshold {
        (0, Correction::CatchUp)
    } else if diff >= threshold {
        (nominal.saturating_mul(2), Correction::SlowDown)
    } else {
        (nominal, Correction::InSync)
    };

    DelayDecision {
        delay: nanos_to_duration(delay),
        correction,
        nominal_nanos: nominal,
        diff_nanos: diff,
    }
}
