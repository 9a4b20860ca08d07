//! Presentation loop - dequeue, wait, present, recycle
//!
//! ```text
//!        ┌──────────────────────────────────────────────┐
//!        ▼                                              │
//!     ┌──────┐  dequeue   ┌─────────────────┐  sleep  ┌─┴──────────┐
//!     │ Idle │──────────► │ Waiting(ts, d)  │───────► │ Presenting │
//!     └──┬───┘            └───────┬─────────┘         └────────────┘
//!        │ EOS / closed           │ stop
//!        ▼                        ▼
//!     ┌─────────────────────────────────┐
//!     │ Stopped(EndOfStream | Cancelled)│
//!     └─────────────────────────────────┘
//! ```
//!
//! Each frame is held for the delay computed by [`compute_delay`] against the
//! session's master clock, handed to the [`FramePresenter`], then returned to
//! the [`FramePool`]. Frames older than the last presented one are recycled
//! without being shown. Every frame that leaves the queue goes back to the
//! pool, whether presented, stale, cancelled or the end-of-stream marker.

use std::sync::Arc;
use std::time::Duration;

use super::drift::{compute_delay, Correction};
use super::events::{LogObserver, SyncEvent, SyncObserver, SyncStats, SyncStatsSnapshot};
use super::stop::StopSignal;
use super::SyncConfig;
use crate::clock::ClockSet;
use crate::frame::{FramePool, FrameQueue, VideoFrame};
use crate::types::Timestamp;

/// Renderer side of the presentation loop
///
/// `present` gets a borrow, so the frame cannot be kept past the call; it is
/// recycled right after.
pub trait FramePresenter: Send {
    fn present(&mut self, frame: &VideoFrame);
}

impl<F> FramePresenter for F
where
    F: FnMut(&VideoFrame) + Send,
{
    fn present(&mut self, frame: &VideoFrame) {
        self(frame)
    }
}

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The decoder enqueued the end-of-stream sentinel
    EndOfStream,
    /// A stop was requested from outside
    Cancelled,
}

impl StopReason {
    pub fn name(&self) -> &'static str {
        match self {
            StopReason::EndOfStream => "end of stream",
            StopReason::Cancelled => "cancelled",
        }
    }
}

/// Where the loop is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Waiting { timestamp: Timestamp, delay: Duration },
    Presenting { timestamp: Timestamp },
    Stopped(StopReason),
}

impl SchedulerState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, SchedulerState::Stopped(_))
    }
}

/// Summary returned when the loop finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerReport {
    pub reason: StopReason,
    pub last_presented: Option<Timestamp>,
    pub stats: SyncStatsSnapshot,
}

/// Cross-thread control for a running scheduler
#[derive(Clone)]
pub struct SchedulerHandle {
    stop: Arc<StopSignal>,
    queue: Arc<FrameQueue>,
}

impl SchedulerHandle {
    /// Stop the loop as soon as possible
    ///
    /// Aborts an in-progress wait and closes the frame queue, so a scheduler
    /// blocked on an empty queue wakes up too. The frame in flight is
    /// recycled without being presented.
    pub fn stop(&self) {
        self.stop.request_stop();
        self.queue.close();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_stopped()
    }
}

/// The presentation loop
pub struct SyncScheduler<P: FramePresenter> {
    queue: Arc<FrameQueue>,
    pool: Arc<FramePool>,
    clocks: Arc<ClockSet>,
    config: SyncConfig,
    presenter: P,
    observer: Arc<dyn SyncObserver>,
    stats: Arc<SyncStats>,
    stop: Arc<StopSignal>,
    state: SchedulerState,
    last_presented: Option<Timestamp>,
}

impl<P: FramePresenter> SyncScheduler<P> {
    pub fn new(
        queue: Arc<FrameQueue>,
        pool: Arc<FramePool>,
        clocks: Arc<ClockSet>,
        config: SyncConfig,
        presenter: P,
    ) -> Self {
        Self {
            queue,
            pool,
            clocks,
            config,
            presenter,
            observer: Arc::new(LogObserver),
            stats: Arc::new(SyncStats::new()),
            stop: Arc::new(StopSignal::new()),
            state: SchedulerState::Idle,
            last_presented: None,
        }
    }

    /// Replace the default [`LogObserver`]
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Share counters with the caller instead of using private ones
    pub fn with_stats(mut self, stats: Arc<SyncStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            stop: self.stop.clone(),
            queue: self.queue.clone(),
        }
    }

    pub fn stats(&self) -> Arc<SyncStats> {
        self.stats.clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn last_presented(&self) -> Option<Timestamp> {
        self.last_presented
    }

    /// Run until end of stream or cancellation
    pub fn run(mut self) -> SchedulerReport {
        log::debug!("[SYNC] Presentation loop started");
        let reason = loop {
            if let SchedulerState::Stopped(reason) = self.step() {
                break reason;
            }
        };
        SchedulerReport {
            reason,
            last_presented: self.last_presented,
            stats: self.stats.snapshot(),
        }
    }

    /// Run one cycle: take frames until one is presented or the loop stops
    ///
    /// Stale frames are recycled inside the cycle. Returns the resulting state,
    /// which is `Idle` after a presentation. Once stopped, further calls
    /// return the stopped state without touching the queue.
    pub fn step(&mut self) -> SchedulerState {
        if self.state.is_stopped() {
            return self.state;
        }
        self.state = SchedulerState::Idle;

        loop {
            let Some(frame) = self.queue.dequeue() else {
                return self.finish(StopReason::Cancelled);
            };

            if self.stop.is_stopped() {
                self.pool.release(frame);
                return self.finish(StopReason::Cancelled);
            }

            if frame.is_end_of_stream() {
                self.pool.release(frame);
                return self.finish(StopReason::EndOfStream);
            }

            if let Some(last) = self.last_presented {
                if frame.timestamp < last {
                    let timestamp = frame.timestamp;
                    self.pool.release(frame);
                    self.emit(SyncEvent::StaleFrameDropped {
                        timestamp,
                        last_presented: last,
                    });
                    continue;
                }
            }

            return self.schedule(frame);
        }
    }

    /// Wait out the drift-corrected delay, then present and recycle
    fn schedule(&mut self, frame: VideoFrame) -> SchedulerState {
        let timestamp = frame.timestamp;

        if self.clocks.master().is_none() {
            let master = self.clocks.select_master();
            self.emit(SyncEvent::MasterSelected { master });
        }

        let decision = compute_delay(
            timestamp,
            self.last_presented,
            self.clocks.master_now(),
            &self.config,
        );
        if decision.correction == Correction::Discontinuity {
            self.emit(SyncEvent::Discontinuity {
                timestamp,
                drift_nanos: decision.diff_nanos,
            });
        }

        if !decision.delay.is_zero() {
            self.state = SchedulerState::Waiting {
                timestamp,
                delay: decision.delay,
            };
            if !self.stop.sleep(decision.delay) {
                self.pool.release(frame);
                return self.finish(StopReason::Cancelled);
            }
        }

        self.state = SchedulerState::Presenting { timestamp };
        self.presenter.present(&frame);
        self.last_presented = Some(timestamp);
        self.pool.release(frame);

        self.emit(SyncEvent::FramePresented {
            timestamp,
            delay: decision.delay,
            correction: decision.correction,
            drift_nanos: decision.diff_nanos,
        });

        self.state = SchedulerState::Idle;
        self.state
    }

    fn finish(&mut self, reason: StopReason) -> SchedulerState {
        self.state = SchedulerState::Stopped(reason);
        self.emit(SyncEvent::Stopped { reason });
        self.state
    }

    fn emit(&self, event: SyncEvent) {
        self.stats.on_event(&event);
        self.observer.on_event(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VideoClock;
    use crate::sync::NullObserver;
    use crate::types::PixelFormat;
    use parking_lot::Mutex;
    use std::thread;
    use std::time::Instant;

    struct Fixture {
        queue: Arc<FrameQueue>,
        pool: Arc<FramePool>,
        clocks: Arc<ClockSet>,
        presented: Arc<Mutex<Vec<Timestamp>>>,
    }

    impl Fixture {
        fn new() -> Self {
            let queue = Arc::new(FrameQueue::new(8));
            let clocks = Arc::new(ClockSet::new(VideoClock::new(), None));
            Self {
                queue,
                pool: Arc::new(FramePool::new(24)),
                clocks,
                presented: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn scheduler(&self) -> SyncScheduler<impl FramePresenter> {
            let presented = self.presented.clone();
            SyncScheduler::new(
                self.queue.clone(),
                self.pool.clone(),
                self.clocks.clone(),
                SyncConfig::default(),
                move |frame: &VideoFrame| presented.lock().push(frame.timestamp),
            )
            .with_observer(Arc::new(NullObserver))
        }

        fn push(&self, millis: i64) {
            let mut frame = VideoFrame::new(2, 2, PixelFormat::Rgba8);
            frame.timestamp = Timestamp::from_millis(millis);
            self.queue.enqueue(frame).unwrap();
        }

        fn push_eos(&self) {
            self.queue.enqueue(VideoFrame::end_of_stream()).unwrap();
        }
    }

    #[test]
    fn test_end_of_stream_stops() {
        let fx = Fixture::new();
        fx.push(0);
        fx.push_eos();

        let report = fx.scheduler().run();
        assert_eq!(report.reason, StopReason::EndOfStream);
        assert_eq!(report.last_presented, Some(Timestamp::ZERO));
        assert_eq!(report.stats.presented, 1);
        assert_eq!(*fx.presented.lock(), vec![Timestamp::ZERO]);
        // The presented frame and the sentinel both went back to the pool
        assert_eq!(fx.pool.len(), 2);
    }

    #[test]
    fn test_stopped_state_is_terminal() {
        let fx = Fixture::new();
        fx.push_eos();
        let mut scheduler = fx.scheduler();

        assert_eq!(
            scheduler.step(),
            SchedulerState::Stopped(StopReason::EndOfStream)
        );
        fx.push(10);
        assert_eq!(
            scheduler.step(),
            SchedulerState::Stopped(StopReason::EndOfStream)
        );
        assert_eq!(fx.queue.len(), 1);
    }

    #[test]
    fn test_stale_frame_is_discarded() {
        let fx = Fixture::new();
        let mut scheduler = fx.scheduler();

        // 5000ms is far ahead of the system clock: discontinuity, shown now
        fx.push(5000);
        assert_eq!(scheduler.step(), SchedulerState::Idle);
        assert_eq!(scheduler.last_presented(), Some(Timestamp::from_millis(5000)));

        // Backward jump: recycled unseen, then the next good frame is shown
        fx.push(100);
        fx.push(5000);
        let start = Instant::now();
        assert_eq!(scheduler.step(), SchedulerState::Idle);
        assert!(start.elapsed() < Duration::from_millis(500));

        let stats = scheduler.stats().snapshot();
        assert_eq!(stats.stale_dropped, 1);
        assert_eq!(stats.presented, 2);
        assert_eq!(
            *fx.presented.lock(),
            vec![Timestamp::from_millis(5000), Timestamp::from_millis(5000)]
        );
        assert_eq!(fx.pool.len(), 3);
    }

    #[test]
    fn test_frames_paced_to_system_clock() {
        let fx = Fixture::new();
        for ts in [0, 40, 80] {
            fx.push(ts);
        }
        fx.push_eos();

        let start = Instant::now();
        let report = fx.scheduler().run();
        let elapsed = start.elapsed();

        assert_eq!(report.stats.presented, 3);
        assert!(elapsed >= Duration::from_millis(70), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(400), "elapsed {:?}", elapsed);
        assert_eq!(fx.clocks.master(), Some(crate::clock::MasterClock::System));
    }

    #[test]
    fn test_stop_aborts_wait_without_presenting() {
        let fx = Fixture::new();
        fx.push(0);
        fx.push(900);

        let scheduler = fx.scheduler();
        let handle = scheduler.handle();
        let worker = thread::spawn(move || scheduler.run());

        // First frame shows immediately, second waits ~900ms
        thread::sleep(Duration::from_millis(100));
        let start = Instant::now();
        handle.stop();
        let report = worker.join().unwrap();

        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(report.reason, StopReason::Cancelled);
        assert_eq!(*fx.presented.lock(), vec![Timestamp::ZERO]);
        // In-flight frame was recycled, not lost
        assert_eq!(fx.pool.len(), 2);
        assert!(handle.is_stop_requested());
    }

    #[test]
    fn test_stop_wakes_scheduler_blocked_on_empty_queue() {
        let fx = Fixture::new();
        let scheduler = fx.scheduler();
        let handle = scheduler.handle();
        let worker = thread::spawn(move || scheduler.run());

        thread::sleep(Duration::from_millis(30));
        handle.stop();
        let report = worker.join().unwrap();
        assert_eq!(report.reason, StopReason::Cancelled);
        assert_eq!(report.stats.presented, 0);
    }

    #[test]
    fn test_observer_sees_lifecycle() {
        let fx = Fixture::new();
        fx.push(0);
        fx.push_eos();

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let report = fx
            .scheduler()
            .with_observer(Arc::new(move |event: &SyncEvent| sink.lock().push(event.clone())))
            .run();
        assert_eq!(report.reason, StopReason::EndOfStream);

        let events = events.lock();
        assert!(matches!(events[0], SyncEvent::MasterSelected { .. }));
        assert!(matches!(events[1], SyncEvent::FramePresented { .. }));
        assert_eq!(
            events[2],
            SyncEvent::Stopped {
                reason: StopReason::EndOfStream
            }
        );
    }
}
