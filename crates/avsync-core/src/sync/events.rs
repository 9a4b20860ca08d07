//! Observability hook for the presentation loop
//!
//! The scheduler reports what it does as [`SyncEvent`]s to an injected
//! [`SyncObserver`]. None of these events are errors: stale frames,
//! discontinuities and cancellation are all expected during playback. A host
//! can log them ([`LogObserver`], the default), count them ([`SyncStats`],
//! always attached), or forward them anywhere else.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use super::drift::Correction;
use super::scheduler::StopReason;
use crate::clock::MasterClock;
use crate::types::Timestamp;

/// Something the presentation loop did
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The master clock for the session was chosen
    MasterSelected { master: MasterClock },

    /// A frame was presented and returned to the pool
    FramePresented {
        timestamp: Timestamp,
        delay: Duration,
        correction: Correction,
        /// Frame timestamp minus master clock at decision time
        drift_nanos: i64,
    },

    /// A frame older than the last presented one was recycled unseen
    StaleFrameDropped {
        timestamp: Timestamp,
        last_presented: Timestamp,
    },

    /// A frame was too far from the master clock to correct
    Discontinuity {
        timestamp: Timestamp,
        drift_nanos: i64,
    },

    /// The loop reached its terminal state
    Stopped { reason: StopReason },
}

/// Receiver for scheduler events
///
/// Called on the presentation thread, so implementations should be quick.
pub trait SyncObserver: Send + Sync {
    fn on_event(&self, event: &SyncEvent);
}

impl<F> SyncObserver for F
where
    F: Fn(&SyncEvent) + Send + Sync,
{
    fn on_event(&self, event: &SyncEvent) {
        self(event)
    }
}

/// Observer that writes events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl SyncObserver for LogObserver {
    fn on_event(&self, event: &SyncEvent) {
        match event {
            SyncEvent::MasterSelected { master } => {
                log::info!("[SYNC] Synchronizing video to {} clock", master.name());
            }
            SyncEvent::FramePresented {
                timestamp,
                delay,
                correction,
                drift_nanos,
            } => {
                log::trace!(
                    "[SYNC] Presented {} after {:?} ({}, drift {:.2}ms)",
                    timestamp,
                    delay,
                    correction.name(),
                    *drift_nanos as f64 / 1e6
                );
            }
            SyncEvent::StaleFrameDropped {
                timestamp,
                last_presented,
            } => {
                log::debug!(
                    "[SYNC] Dropped stale frame {} (last presented {})",
                    timestamp,
                    last_presented
                );
            }
            SyncEvent::Discontinuity {
                timestamp,
                drift_nanos,
            } => {
                log::debug!(
                    "[SYNC] Discontinuity at {}: {:.1}ms from master, presenting immediately",
                    timestamp,
                    *drift_nanos as f64 / 1e6
                );
            }
            SyncEvent::Stopped { reason } => {
                log::info!("[SYNC] Presentation stopped: {}", reason.name());
            }
        }
    }
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SyncObserver for NullObserver {
    fn on_event(&self, _event: &SyncEvent) {}
}

/// Lock-free counters over the scheduler's events
#[derive(Debug, Default)]
pub struct SyncStats {
    presented: AtomicU64,
    stale_dropped: AtomicU64,
    in_sync: AtomicU64,
    caught_up: AtomicU64,
    slowed_down: AtomicU64,
    discontinuities: AtomicU64,
    /// Drift of the last presented frame
    last_drift_nanos: AtomicI64,
    /// Largest absolute drift seen outside discontinuities
    max_drift_nanos: AtomicI64,
}

/// Point-in-time copy of [`SyncStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatsSnapshot {
    pub presented: u64,
    pub stale_dropped: u64,
    pub in_sync: u64,
    pub caught_up: u64,
    pub slowed_down: u64,
    pub discontinuities: u64,
    pub last_drift_nanos: i64,
    pub max_drift_nanos: i64,
}

impl SyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presented(&self) -> u64 {
        self.presented.load(Ordering::Relaxed)
    }

    pub fn stale_dropped(&self) -> u64 {
        self.stale_dropped.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> SyncStatsSnapshot {
        SyncStatsSnapshot {
            presented: self.presented.load(Ordering::Relaxed),
            stale_dropped: self.stale_dropped.load(Ordering::Relaxed),
            in_sync: self.in_sync.load(Ordering::Relaxed),
            caught_up: self.caught_up.load(Ordering::Relaxed),
            slowed_down: self.slowed_down.load(Ordering::Relaxed),
            discontinuities: self.discontinuities.load(Ordering::Relaxed),
            last_drift_nanos: self.last_drift_nanos.load(Ordering::Relaxed),
            max_drift_nanos: self.max_drift_nanos.load(Ordering::Relaxed),
        }
    }
}

impl SyncObserver for SyncStats {
    fn on_event(&self, event: &SyncEvent) {
        match event {
            SyncEvent::FramePresented {
                correction,
                drift_nanos,
                ..
            } => {
                self.presented.fetch_add(1, Ordering::Relaxed);
                self.last_drift_nanos.store(*drift_nanos, Ordering::Relaxed);
                let counter = match correction {
                    Correction::InSync => &self.in_sync,
                    Correction::CatchUp => &self.caught_up,
                    Correction::SlowDown => &self.slowed_down,
                    Correction::Discontinuity => &self.discontinuities,
                };
                counter.fetch_add(1, Ordering::Relaxed);
                if *correction != Correction::Discontinuity {
                    let magnitude = drift_nanos.saturating_abs();
                    self.max_drift_nanos.fetch_max(magnitude, Ordering::Relaxed);
                }
            }
            SyncEvent::StaleFrameDropped { .. } => {
                self.stale_dropped.fetch_add(1, Ordering::Relaxed);
            }
            SyncEvent::MasterSelected { .. }
            | SyncEvent::Discontinuity { .. }
            | SyncEvent::Stopped { .. } => {}
        }
    }
}
