//! Video presentation scheduling against the master clock
//!
//! This module contains the presentation side of the pipeline:
//! - SyncScheduler: the dequeue → wait → present → recycle loop
//! - Drift correction: the pure delay computation behind each wait
//! - SyncConfig: the tunable thresholds
//! - Events: the observer hook and built-in counters

mod config;
mod drift;
mod events;
mod scheduler;
mod stop;

pub use config::{SyncConfig, DEFAULT_LARGE_DESYNC_THRESHOLD_MS, DEFAULT_MIN_SYNC_THRESHOLD_MS};
pub use drift::{compute_delay, Correction, DelayDecision};
pub use events::{LogObserver, NullObserver, SyncEvent, SyncObserver, SyncStats, SyncStatsSnapshot};
pub use scheduler::{
    FramePresenter, SchedulerHandle, SchedulerReport, SchedulerState, StopReason, SyncScheduler,
};
pub use stop::StopSignal;
