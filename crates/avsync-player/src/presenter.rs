//! Headless presenter - stands in for a renderer
//!
//! Checks each frame's payload, measures the wall-clock interval between
//! presentations and logs a summary once per second of stream time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use avsync_core::frame::VideoFrame;
use avsync_core::sync::FramePresenter;
use avsync_core::Timestamp;

const REPORT_INTERVAL_NANOS: i64 = 1_000_000_000;

/// Counters readable from outside the presentation thread
#[derive(Debug, Default)]
pub struct PresenterStats {
    frames: AtomicU64,
    /// Frames whose payload didn't match their size
    malformed: AtomicU64,
    /// Longest gap between two presentations, in microseconds
    max_interval_us: AtomicU64,
}

impl PresenterStats {
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_micros(self.max_interval_us.load(Ordering::Relaxed))
    }
}

pub struct HeadlessPresenter {
    stats: Arc<PresenterStats>,
    last_wall: Option<Instant>,
    next_report: Timestamp,
    window_frames: u64,
    window_start: Option<Instant>,
}

impl HeadlessPresenter {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(PresenterStats::default()),
            last_wall: None,
            next_report: Timestamp::ZERO,
            window_frames: 0,
            window_start: None,
        }
    }

    pub fn stats(&self) -> Arc<PresenterStats> {
        self.stats.clone()
    }
}

impl Default for HeadlessPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl FramePresenter for HeadlessPresenter {
    fn present(&mut self, frame: &VideoFrame) {
        let now = Instant::now();
        self.stats.frames.fetch_add(1, Ordering::Relaxed);

        if frame.data.len() != frame.format.frame_size(frame.width, frame.height) {
            self.stats.malformed.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "[PRESENT] Frame {} has {} bytes, expected {}x{} {}",
                frame.timestamp,
                frame.data.len(),
                frame.width,
                frame.height,
                frame.format.name()
            );
        }

        if let Some(last) = self.last_wall {
            let interval = (now - last).as_micros() as u64;
            self.stats.max_interval_us.fetch_max(interval, Ordering::Relaxed);
        }
        self.last_wall = Some(now);

        let window_start = *self.window_start.get_or_insert(now);
        self.window_frames += 1;

        if frame.timestamp >= self.next_report {
            let elapsed = now - window_start;
            let fps = if elapsed.is_zero() {
                0.0
            } else {
                (self.window_frames - 1) as f64 / elapsed.as_secs_f64()
            };
            log::info!("[PRESENT] {} ({:.1} fps)", frame.timestamp, fps);
            self.next_report =
                Timestamp::from_nanos(frame.timestamp.as_nanos().saturating_add(REPORT_INTERVAL_NANOS));
            self.window_frames = 1;
            self.window_start = Some(now);
        }
    }
}
