//! Playback session - wires buffers, clocks and the scheduler together
//!
//! ```text
//!                  ┌──────────────────┐  read   ┌──────────────┐
//!   decoder ──────►│ SampleRingBuffer │────────►│ audio output │
//!     │  write     └────────┬─────────┘         └──────────────┘
//!     │                     │ total_read
//!     │                     ▼
//!     │            ┌──────────────────┐
//!     │            │     ClockSet     │
//!     │            └────────┬─────────┘
//!     │ VideoSink           │ master_now
//!     ▼                     ▼
//!  ┌────────────┐  dequeue ┌───────────────┐  present  ┌───────────┐
//!  │ FrameQueue │─────────►│ SyncScheduler │──────────►│ presenter │
//!  └────────────┘          └───────┬───────┘           └───────────┘
//!        ▲                         │ release
//!        │ acquire         ┌───────▼───────┐
//!        └─────────────────│   FramePool   │
//!                          └───────────────┘
//! ```
//!
//! A session is built from a [`PlaybackConfig`], hands out the decoder and
//! device endpoints, and runs the scheduler on a dedicated `av-sync` thread
//! once [`start`](PlaybackSession::start)ed. The system clock counts from
//! `start`, so a decoder can pre-fill the queue and ring beforehand.

mod error;
mod sink;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub use error::{SessionError, SessionResult};
pub use sink::VideoSink;

use crate::clock::{AudioClock, ClockSet};
use crate::config::PlaybackConfig;
use crate::frame::{FramePool, FrameQueue};
use crate::ring::SampleRingBuffer;
use crate::sync::{
    FramePresenter, SchedulerHandle, SchedulerReport, SyncObserver, SyncScheduler, SyncStats,
};
use crate::types::PixelFormat;

/// One playback session's shared state
pub struct PlaybackSession {
    config: PlaybackConfig,
    ring: Option<Arc<SampleRingBuffer>>,
    queue: Arc<FrameQueue>,
    pool: Arc<FramePool>,
    stats: Arc<SyncStats>,
    started: AtomicBool,
}

impl PlaybackSession {
    pub fn new(config: PlaybackConfig) -> Self {
        let ring = config
            .audio_enabled
            .then(|| Arc::new(SampleRingBuffer::new(config.ring_buffer_bytes())));
        let queue = Arc::new(FrameQueue::new(config.frame_queue_capacity));
        let pool = Arc::new(FramePool::new(config.pool_capacity()));

        log::info!(
            "[SESSION] Created: audio {}, ring {} bytes, queue {} frames, pool {} frames",
            if ring.is_some() { "on" } else { "off" },
            ring.as_ref().map_or(0, |r| r.capacity()),
            queue.capacity(),
            pool.max_frames()
        );

        Self {
            config,
            ring,
            queue,
            pool,
            stats: Arc::new(SyncStats::new()),
            started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// The PCM ring buffer, for the audio decoder (write) and device (read)
    ///
    /// `None` for video-only sessions.
    pub fn audio_ring(&self) -> Option<Arc<SampleRingBuffer>> {
        self.ring.clone()
    }

    /// Decoder endpoint for a video stream of the given geometry
    pub fn video_sink(&self, width: u32, height: u32, format: PixelFormat) -> VideoSink {
        VideoSink::new(self.queue.clone(), self.pool.clone(), width, height, format)
    }

    pub fn frame_queue(&self) -> Arc<FrameQueue> {
        self.queue.clone()
    }

    pub fn frame_pool(&self) -> Arc<FramePool> {
        self.pool.clone()
    }

    pub fn stats(&self) -> Arc<SyncStats> {
        self.stats.clone()
    }

    /// Fast-forward the audio stream by discarding up to `duration` of
    /// unread PCM (whole sample frames only). Returns the bytes skipped.
    pub fn skip_audio(&self, duration: Duration) -> usize {
        let Some(ring) = &self.ring else {
            return 0;
        };
        let skipped = ring.skip(self.config.audio.duration_to_bytes(duration));
        if skipped > 0 {
            log::debug!("[SESSION] Skipped {} bytes of audio", skipped);
        }
        skipped
    }

    /// Start the clocks and the presentation thread
    ///
    /// Can only be called once per session.
    pub fn start<P>(&self, presenter: P, observer: Arc<dyn SyncObserver>) -> SessionResult<SessionHandle>
    where
        P: FramePresenter + 'static,
    {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(SessionError::AlreadyStarted);
        }

        let audio_clock = self
            .ring
            .as_ref()
            .map(|ring| AudioClock::new(ring.clone(), self.config.audio));
        let clocks = Arc::new(ClockSet::new(self.queue.video_clock(), audio_clock));

        let scheduler = SyncScheduler::new(
            self.queue.clone(),
            self.pool.clone(),
            clocks.clone(),
            self.config.sync,
            presenter,
        )
        .with_observer(observer)
        .with_stats(self.stats.clone());
        let scheduler_handle = scheduler.handle();

        let thread = thread::Builder::new()
            .name("av-sync".into())
            .spawn(move || scheduler.run());
        let thread = match thread {
            Ok(thread) => thread,
            Err(e) => {
                self.started.store(false, Ordering::Release);
                return Err(SessionError::SpawnFailed(e));
            }
        };

        log::info!("[SESSION] Presentation thread started");

        Ok(SessionHandle {
            scheduler: scheduler_handle,
            clocks,
            stats: self.stats.clone(),
            ring: self.ring.clone(),
            queue: self.queue.clone(),
            pool: self.pool.clone(),
            thread: Some(thread),
        })
    }
}

/// Control handle for a running session
///
/// Dropping the handle stops the session and waits for the presentation
/// thread.
pub struct SessionHandle {
    scheduler: SchedulerHandle,
    clocks: Arc<ClockSet>,
    stats: Arc<SyncStats>,
    ring: Option<Arc<SampleRingBuffer>>,
    queue: Arc<FrameQueue>,
    pool: Arc<FramePool>,
    thread: Option<thread::JoinHandle<SchedulerReport>>,
}

impl SessionHandle {
    /// Stop playback
    ///
    /// Aborts the presentation wait, wakes a decoder blocked on the frame
    /// queue or the ring buffer, and lets the audio device drain what is
    /// left in the ring.
    pub fn stop(&self) {
        log::info!("[SESSION] Stop requested");
        self.scheduler.stop();
        if let Some(ring) = &self.ring {
            ring.close();
        }
    }

    pub fn clocks(&self) -> Arc<ClockSet> {
        self.clocks.clone()
    }

    pub fn stats(&self) -> Arc<SyncStats> {
        self.stats.clone()
    }

    /// Whether the presentation loop has ended
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the presentation loop to end (end of stream or stop)
    ///
    /// Frames still queued are moved back into the pool.
    pub fn join(mut self) -> SessionResult<SchedulerReport> {
        let thread = self.thread.take().ok_or(SessionError::SchedulerPanicked)?;
        let report = thread.join().map_err(|_| SessionError::SchedulerPanicked)?;

        let recycled = self.queue.drain_into(&self.pool);
        log::info!(
            "[SESSION] Finished ({}): {} presented, {} stale, {} leftover frames recycled",
            report.reason.name(),
            report.stats.presented,
            report.stats.stale_dropped,
            recycled
        );
        Ok(report)
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.stop();
            if thread.join().is_err() {
                log::error!("[SESSION] Presentation thread panicked");
            }
            self.queue.drain_into(&self.pool);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioFormat, PacedOutput, SampleFormat};
    use crate::clock::MasterClock;
    use crate::frame::VideoFrame;
    use crate::sync::{NullObserver, StopReason, SyncEvent};
    use crate::types::Timestamp;
    use parking_lot::Mutex;
    use std::time::Instant;

    fn video_only() -> PlaybackSession {
        PlaybackSession::new(PlaybackConfig::video_only())
    }

    #[test]
    fn test_start_twice_fails() {
        let session = video_only();
        let handle = session
            .start(|_: &VideoFrame| {}, Arc::new(NullObserver))
            .unwrap();
        let second = session.start(|_: &VideoFrame| {}, Arc::new(NullObserver));
        assert!(matches!(second, Err(SessionError::AlreadyStarted)));
        handle.stop();
        assert_eq!(handle.join().unwrap().reason, StopReason::Cancelled);
    }

    #[test]
    fn test_video_only_session_at_30fps() {
        let session = video_only();
        let sink = session.video_sink(4, 4, PixelFormat::Rgba8);
        let queue = session.frame_queue();
        let pool = session.frame_pool();

        for ms in [0, 33, 66, 100] {
            assert!(sink.submit_with(Timestamp::from_millis(ms), |px| px.fill(ms as u8)));
        }
        assert_eq!(queue.len(), 4);

        // Pool and queue sizes observed right after each presentation
        let observed = Arc::new(Mutex::new(Vec::new()));
        let observer = {
            let observed = observed.clone();
            let queue = queue.clone();
            let pool = pool.clone();
            move |event: &SyncEvent| {
                if let SyncEvent::FramePresented { .. } = event {
                    observed.lock().push((pool.len(), queue.len()));
                }
            }
        };

        let shown = Arc::new(Mutex::new(Vec::new()));
        let presenter = {
            let shown = shown.clone();
            move |frame: &VideoFrame| {
                assert_eq!(frame.data[0], frame.timestamp.as_millis() as u8);
                shown.lock().push((Instant::now(), frame.timestamp));
            }
        };

        let handle = session.start(presenter, Arc::new(observer)).unwrap();
        let clocks = handle.clocks();

        let stats = handle.stats();
        let deadline = Instant::now() + Duration::from_secs(5);
        while stats.presented() < 4 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(sink.finish());

        let report = handle.join().unwrap();
        assert_eq!(report.reason, StopReason::EndOfStream);
        assert_eq!(report.last_presented, Some(Timestamp::from_millis(100)));

        let shown = shown.lock();
        let timestamps: Vec<i64> = shown.iter().map(|(_, ts)| ts.as_millis()).collect();
        assert_eq!(timestamps, vec![0, 33, 66, 100]);
        for pair in shown.windows(2) {
            let gap = pair[1].0 - pair[0].0;
            assert!(gap >= Duration::from_millis(20), "gap {:?}", gap);
            assert!(gap <= Duration::from_millis(120), "gap {:?}", gap);
        }

        assert_eq!(*observed.lock(), vec![(1, 3), (2, 2), (3, 1), (4, 0)]);
        assert_eq!(clocks.master(), Some(MasterClock::System));
        // Four presented frames plus the recycled end-of-stream buffer
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.allocated_count(), 4);
    }

    #[test]
    fn test_audio_master_session() {
        let format = AudioFormat::new(1000, 1, SampleFormat::F32);
        let config = PlaybackConfig::default()
            .with_audio_format(format)
            .with_audio_buffer_ms(2000)
            .with_frame_queue_capacity(16);
        let session = PlaybackSession::new(config);
        let ring = session.audio_ring().unwrap();
        let sink = session.video_sink(2, 2, PixelFormat::Rgba8);

        // 600ms of audio, and video frames every 50ms over the same span
        assert!(ring.write(&vec![0u8; format.byte_rate() * 6 / 10]));
        for i in 0..10 {
            assert!(sink.submit_with(Timestamp::from_millis(i * 50), |_| {}));
        }
        assert!(sink.finish());

        let start = Instant::now();
        let handle = session
            .start(|_: &VideoFrame| {}, Arc::new(NullObserver))
            .unwrap();
        let mut output = PacedOutput::spawn(ring.clone(), format, 10).unwrap();
        let clocks = handle.clocks();

        let report = handle.join().unwrap();
        output.stop();

        assert_eq!(clocks.master(), Some(MasterClock::Audio));
        assert_eq!(report.reason, StopReason::EndOfStream);
        assert_eq!(report.stats.presented, 10);
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert!(ring.total_read() > 0);
    }

    #[test]
    fn test_stop_releases_blocked_decoder() {
        let config = PlaybackConfig::default().with_frame_queue_capacity(1);
        let session = PlaybackSession::new(config);
        let ring = session.audio_ring().unwrap();
        let sink = session.video_sink(2, 2, PixelFormat::Rgba8);

        // Far-future frames: the scheduler waits on the first, the queue fills up
        let decoder = {
            let sink = sink.clone();
            thread::spawn(move || {
                let mut accepted = 0;
                for i in 0..10 {
                    if !sink.submit_with(Timestamp::from_millis(900 + i * 900), |_| {}) {
                        break;
                    }
                    accepted += 1;
                }
                accepted
            })
        };
        let audio_writer = {
            let ring = ring.clone();
            thread::spawn(move || {
                let chunk = vec![0u8; 4096];
                while ring.write(&chunk) {}
            })
        };

        let handle = session
            .start(|_: &VideoFrame| {}, Arc::new(NullObserver))
            .unwrap();
        thread::sleep(Duration::from_millis(100));

        let start = Instant::now();
        handle.stop();
        let report = handle.join().unwrap();
        let accepted = decoder.join().unwrap();
        audio_writer.join().unwrap();

        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(report.reason, StopReason::Cancelled);
        assert!(accepted < 10);
        assert!(session.frame_queue().is_empty());
    }

    #[test]
    fn test_skip_audio_advances_audio_clock() {
        let format = AudioFormat::new(1000, 2, SampleFormat::I16);
        let session = PlaybackSession::new(PlaybackConfig::default().with_audio_format(format));
        let ring = session.audio_ring().unwrap();
        ring.write(&vec![0u8; 400]); // 100ms

        assert_eq!(session.skip_audio(Duration::from_millis(30)), 120);
        assert_eq!(format.bytes_to_nanos(ring.total_read()), 30_000_000);
        assert_eq!(session.skip_audio(Duration::from_secs(1)), 280);
        assert_eq!(video_only().skip_audio(Duration::from_secs(1)), 0);
    }
}
