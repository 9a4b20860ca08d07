//! Synthetic decoder - test-pattern video and a sine tone
//!
//! Stands in for a real demuxer/decoder: one thread produces timestamped
//! frames through a [`VideoSink`], another writes PCM into the session's
//! ring buffer. Both block on backpressure exactly like a real decoder
//! would, and both stop early once the session is stopped.

use std::f32::consts::TAU;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use avsync_core::audio::{AudioFormat, SampleFormat};
use avsync_core::ring::SampleRingBuffer;
use avsync_core::session::VideoSink;
use avsync_core::Timestamp;

/// Audio is generated in chunks of this length
const AUDIO_CHUNK: Duration = Duration::from_millis(10);

/// Presentation timestamp of frame `index` at `fps`
pub fn frame_timestamp(index: u64, fps: f64) -> Timestamp {
    Timestamp::from_nanos((index as f64 * 1_000_000_000.0 / fps).round() as i64)
}

/// Number of frames covering `duration` at `fps`
pub fn frame_count(duration: Duration, fps: f64) -> u64 {
    (duration.as_secs_f64() * fps).ceil() as u64
}

/// Diagonal gradient that scrolls one step per frame
pub fn fill_test_pattern(data: &mut [u8], width: u32, index: u64) {
    let row_bytes = (width as usize * 4).max(1);
    let offset = index as usize;
    for (i, byte) in data.iter_mut().enumerate() {
        let x = (i % row_bytes) / 4;
        let y = i / row_bytes;
        *byte = (x + y + offset) as u8;
    }
}

/// Spawn the video decoder thread
///
/// Returns the number of frames the session accepted. The end-of-stream
/// marker is queued after the last frame.
pub fn spawn_video(
    sink: VideoSink,
    width: u32,
    fps: f64,
    duration: Duration,
) -> io::Result<JoinHandle<u64>> {
    let total = frame_count(duration, fps);
    thread::Builder::new()
        .name("synth-video".into())
        .spawn(move || {
            let mut produced = 0;
            for index in 0..total {
                let accepted = sink.submit_with(frame_timestamp(index, fps), |data| {
                    fill_test_pattern(data, width, index)
                });
                if !accepted {
                    log::info!("[SYNTH] Video stopped by session after {} frames", produced);
                    return produced;
                }
                produced += 1;
            }
            if !sink.finish() {
                log::debug!("[SYNTH] Session stopped before end of stream");
            }
            log::info!("[SYNTH] Video finished: {} frames", produced);
            produced
        })
}

/// Generates an interleaved sine tone, continuous across chunks
pub struct ToneGenerator {
    format: AudioFormat,
    step: f32,
    level: f32,
    phase: f32,
}

impl ToneGenerator {
    pub fn new(format: AudioFormat, frequency: f32, level: f32) -> Self {
        Self {
            format,
            step: TAU * frequency / format.sample_rate as f32,
            level: level.clamp(0.0, 1.0),
            phase: 0.0,
        }
    }

    /// Next `frames` sample frames as PCM bytes in the generator's format
    pub fn next_chunk(&mut self, frames: usize) -> Vec<u8> {
        let channels = self.format.channels as usize;
        let mut samples = Vec::with_capacity(frames * channels);
        for _ in 0..frames {
            let value = self.phase.sin() * self.level;
            samples.extend(std::iter::repeat(value).take(channels));
            self.phase = (self.phase + self.step) % TAU;
        }

        match self.format.sample_format {
            SampleFormat::F32 => bytemuck::cast_slice(samples.as_slice()).to_vec(),
            SampleFormat::I16 => {
                let ints: Vec<i16> = samples
                    .iter()
                    .map(|s| (s * i16::MAX as f32) as i16)
                    .collect();
                bytemuck::cast_slice(ints.as_slice()).to_vec()
            }
        }
    }
}

/// Spawn the audio decoder thread
///
/// Writes `duration` of tone into `ring`, then closes it so the output
/// device drains and stops. Returns the bytes written.
pub fn spawn_audio(
    ring: Arc<SampleRingBuffer>,
    mut tone: ToneGenerator,
    duration: Duration,
) -> io::Result<JoinHandle<u64>> {
    let format = tone.format;
    let total_frames = (duration.as_secs_f64() * format.sample_rate as f64).round() as u64;
    let chunk_frames =
        (format.duration_to_bytes(AUDIO_CHUNK) / format.bytes_per_frame()).max(1) as u64;

    thread::Builder::new()
        .name("synth-audio".into())
        .spawn(move || {
            let mut written_frames = 0u64;
            let mut written_bytes = 0u64;
            while written_frames < total_frames {
                let frames = chunk_frames.min(total_frames - written_frames);
                let chunk = tone.next_chunk(frames as usize);
                if !ring.write(&chunk) {
                    log::info!("[SYNTH] Audio stopped by session");
                    break;
                }
                written_frames += frames;
                written_bytes += chunk.len() as u64;
            }
            ring.close();
            log::info!(
                "[SYNTH] Audio finished: {:.2}s written",
                written_frames as f64 / format.sample_rate as f64
            );
            written_bytes
        })
}
