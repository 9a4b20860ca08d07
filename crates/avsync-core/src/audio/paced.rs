//! Software audio device that drains the ring buffer in real time
//!
//! Stands in for a hardware output when there is no sound card (headless
//! playback, tests). A dedicated thread reads one period of PCM every period
//! duration, on an absolute schedule so the consumption rate does not drift,
//! and counts short reads as underruns exactly like a device callback would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::{AudioFormat, AudioResult, OutputStats};
use crate::ring::SampleRingBuffer;

/// Default period in sample frames (~10.7ms at 48kHz)
pub const DEFAULT_PERIOD_FRAMES: u32 = 512;

/// Paced output thread handle
///
/// Dropping the handle stops the thread and waits for it.
pub struct PacedOutput {
    shutdown: Arc<AtomicBool>,
    stats: Arc<OutputStats>,
    handle: Option<thread::JoinHandle<()>>,
    period: Duration,
}

impl PacedOutput {
    /// Start draining `ring` at the rate given by `format`
    ///
    /// The thread exits on [`stop`](Self::stop), or by itself once the ring is
    /// closed and fully drained.
    pub fn spawn(
        ring: Arc<SampleRingBuffer>,
        format: AudioFormat,
        period_frames: u32,
    ) -> AudioResult<Self> {
        let period_frames = period_frames.max(1);
        let period_bytes = period_frames as usize * format.bytes_per_frame();
        let period = Duration::from_nanos(
            (period_frames as f64 * format.nanos_per_sample()).round() as u64,
        );

        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(OutputStats::default());

        let thread_shutdown = shutdown.clone();
        let thread_stats = stats.clone();
        let handle = thread::Builder::new()
            .name("audio-paced".into())
            .spawn(move || {
                Self::output_loop(&ring, period_bytes, period, &thread_shutdown, &thread_stats);
            })?;

        log::info!(
            "[AUDIO] Paced output started: {} Hz, {} ch, {} frames/period ({:.2}ms)",
            format.sample_rate,
            format.channels,
            period_frames,
            period.as_secs_f64() * 1000.0
        );

        Ok(Self {
            shutdown,
            stats,
            handle: Some(handle),
            period,
        })
    }

    fn output_loop(
        ring: &SampleRingBuffer,
        period_bytes: usize,
        period: Duration,
        shutdown: &AtomicBool,
        stats: &OutputStats,
    ) {
        let mut scratch = vec![0u8; period_bytes];
        let mut next_deadline = Instant::now();

        while !shutdown.load(Ordering::Relaxed) {
            let read = ring.read(&mut scratch);
            if read == 0 && ring.is_closed() {
                log::debug!("[AUDIO] Ring closed and drained, paced output exiting");
                break;
            }
            stats.record_period(read, period_bytes);

            next_deadline += period;
            let now = Instant::now();
            if next_deadline > now {
                thread::sleep(next_deadline - now);
            } else {
                // Fell behind (e.g. descheduled); resync rather than burst
                next_deadline = now;
            }
        }
    }

    /// Duration of one output period
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stats(&self) -> Arc<OutputStats> {
        self.stats.clone()
    }

    /// Whether the output thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Stop the output thread and wait for it
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("[AUDIO] Paced output thread panicked");
            }
        }
    }
}

impl Drop for PacedOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleFormat;

    #[test]
    fn test_drains_at_real_time_rate() {
        // 1kHz mono f32: 4 bytes per ms
        let format = AudioFormat::new(1000, 1, SampleFormat::F32);
        let ring = Arc::new(SampleRingBuffer::new(4096));
        ring.write(&[0u8; 400]); // 100ms of audio

        let mut output = PacedOutput::spawn(ring.clone(), format, 10).unwrap();
        assert_eq!(output.period(), Duration::from_millis(10));

        thread::sleep(Duration::from_millis(45));
        let consumed = ring.total_read();
        // ~5 periods of 40 bytes; generous bounds for scheduler jitter
        assert!(consumed >= 80, "consumed {}", consumed);
        assert!(consumed <= 320, "consumed {}", consumed);

        output.stop();
        assert!(output.is_finished());
    }

    #[test]
    fn test_counts_underruns_and_exits_when_closed() {
        let format = AudioFormat::new(1000, 1, SampleFormat::F32);
        let ring = Arc::new(SampleRingBuffer::new(256));
        ring.write(&[0u8; 20]); // half a period
        ring.close();

        let output = PacedOutput::spawn(ring.clone(), format, 10).unwrap();
        let stats = output.stats();
        for _ in 0..100 {
            if output.is_finished() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        assert!(output.is_finished());
        assert_eq!(ring.total_read(), 20);
        assert!(stats.underruns() >= 1);
        assert_eq!(stats.bytes_played(), 20);
    }
}
