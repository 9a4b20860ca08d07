//! avsync Player - headless A/V sync playback
//!
//! This is the main entry point. It:
//! 1. Loads the player config (and applies command line overrides)
//! 2. Starts a synthetic decoder feeding the playback session
//! 3. Runs the presentation loop against the audio (or system) clock
//! 4. Prints a sync summary at end of stream
//!
//! ## Command line flags
//!
//! - `--config <path>`: Use a config file other than ~/.config/avsync/player.yaml
//! - `--no-audio`: Video only; the system clock becomes the master
//! - `--fps <n>`: Frame rate of the generated video
//! - `--seconds <n>`: Length of the generated stream
//! - `--device`: Play audio on the default output device (`cpal-output` builds)
//! - `--save-config`: Write the effective config back to the config path

mod config;
mod presenter;
mod synth;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

use avsync_core::audio::{OutputStats, PacedOutput};
use avsync_core::config::{load_config, save_config};
use avsync_core::ring::SampleRingBuffer;
use avsync_core::session::PlaybackSession;
use avsync_core::sync::LogObserver;

use config::{OutputBackend, PlayerConfig};
use presenter::HeadlessPresenter;
use synth::ToneGenerator;

/// How long to wait for the audio decoder's first samples before starting
const AUDIO_PREROLL_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    no_audio: bool,
    fps: Option<f64>,
    seconds: Option<f64>,
    device: bool,
    save_config: bool,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut parsed = Args::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args.next().context("--config needs a path")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--no-audio" => parsed.no_audio = true,
                "--fps" => {
                    let value = args.next().context("--fps needs a value")?;
                    parsed.fps = Some(value.parse().with_context(|| format!("Invalid --fps: {}", value))?);
                }
                "--seconds" => {
                    let value = args.next().context("--seconds needs a value")?;
                    parsed.seconds =
                        Some(value.parse().with_context(|| format!("Invalid --seconds: {}", value))?);
                }
                "--device" => parsed.device = true,
                "--save-config" => parsed.save_config = true,
                other => bail!("Unknown argument: {}", other),
            }
        }
        Ok(parsed)
    }

    fn apply(&self, config: &mut PlayerConfig) {
        if self.no_audio {
            config.playback.audio_enabled = false;
        }
        if let Some(fps) = self.fps {
            config.video.fps = fps;
        }
        if let Some(seconds) = self.seconds {
            config.duration_secs = seconds;
        }
        if self.device {
            config.output.backend = OutputBackend::Device;
        }
    }
}

/// The running audio output; dropping it stops playback
enum AudioOutput {
    Paced(PacedOutput),
    #[cfg(feature = "cpal-output")]
    Device(avsync_core::audio::CpalOutput),
}

impl AudioOutput {
    fn start(ring: Arc<SampleRingBuffer>, config: &PlayerConfig) -> Result<Self> {
        match config.output.backend {
            #[cfg(feature = "cpal-output")]
            OutputBackend::Device => {
                let output = avsync_core::audio::CpalOutput::start(ring, config.playback.audio)
                    .context("Failed to open audio device")?;
                Ok(AudioOutput::Device(output))
            }
            #[cfg(not(feature = "cpal-output"))]
            OutputBackend::Device => {
                log::warn!("Built without cpal-output, using the paced software output");
                Self::start_paced(ring, config)
            }
            OutputBackend::Paced => Self::start_paced(ring, config),
        }
    }

    fn start_paced(ring: Arc<SampleRingBuffer>, config: &PlayerConfig) -> Result<Self> {
        let output = PacedOutput::spawn(ring, config.playback.audio, config.output.period_frames)
            .context("Failed to start paced audio output")?;
        Ok(AudioOutput::Paced(output))
    }

    fn stats(&self) -> Arc<OutputStats> {
        match self {
            AudioOutput::Paced(output) => output.stats(),
            #[cfg(feature = "cpal-output")]
            AudioOutput::Device(output) => output.stats(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse(std::env::args().skip(1))?;

    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("avsync-player starting up");

    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let mut config: PlayerConfig = load_config(&config_path);
    args.apply(&mut config);
    config::validate(&config)?;

    if args.save_config {
        save_config(&config, &config_path)?;
        println!("Config saved to {}", config_path.display());
    }

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                      avsync Player                           ║");
    println!("║           synthetic A/V stream, headless playback            ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!(
        "Video: {}x{} {} @ {:.2} fps, {:.1}s",
        config.video.width,
        config.video.height,
        config.video.pixel_format.name(),
        config.video.fps,
        config.duration_secs
    );

    let session = PlaybackSession::new(config.playback.clone());
    let duration = config.duration();

    // Decoders start first so the session can pre-roll
    let sink = session.video_sink(
        config.video.width,
        config.video.height,
        config.video.pixel_format,
    );
    let video_thread = synth::spawn_video(sink, config.video.width, config.video.fps, duration)
        .context("Failed to spawn video decoder")?;

    let audio_thread = match session.audio_ring() {
        Some(ring) => {
            let format = config.playback.audio;
            println!(
                "Audio: {} Hz, {} ch, {:?}, {:.0} Hz tone",
                format.sample_rate, format.channels, format.sample_format, config.output.tone_hz
            );
            let tone = ToneGenerator::new(format, config.output.tone_hz, config.output.tone_level);
            let handle = synth::spawn_audio(ring.clone(), tone, duration)
                .context("Failed to spawn audio decoder")?;

            // The master clock is picked on the first frame; give audio a chance
            let deadline = Instant::now() + AUDIO_PREROLL_TIMEOUT;
            while ring.total_written() == 0 && !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(1));
            }
            Some((ring, handle))
        }
        None => {
            println!("Audio: disabled (system clock is master)");
            None
        }
    };
    println!();

    let presenter = HeadlessPresenter::new();
    let presenter_stats = presenter.stats();
    let started = Instant::now();
    let handle = session.start(presenter, Arc::new(LogObserver))?;
    let clocks = handle.clocks();

    let output = match &audio_thread {
        Some((ring, _)) => Some(AudioOutput::start(ring.clone(), &config)?),
        None => None,
    };

    let frames_produced = video_thread
        .join()
        .map_err(|_| anyhow::anyhow!("Video decoder thread panicked"))?;
    let report = handle.join()?;
    let wall = started.elapsed();

    if let Some((ring, audio)) = audio_thread {
        // Video is done; stop feeding audio that nobody is synced to anymore
        ring.close();
        audio
            .join()
            .map_err(|_| anyhow::anyhow!("Audio decoder thread panicked"))?;
    }
    let audio_stats = output.as_ref().map(AudioOutput::stats);
    drop(output);

    println!();
    println!("Playback finished ({})", report.reason.name());
    println!("  Master clock:     {}", clocks.master().map_or("none", |m| m.name()));
    println!("  Wall time:        {:.2}s", wall.as_secs_f64());
    println!("  Frames produced:  {}", frames_produced);
    println!("  Frames presented: {}", report.stats.presented);
    println!("  Stale dropped:    {}", report.stats.stale_dropped);
    println!("  Caught up:        {}", report.stats.caught_up);
    println!("  Slowed down:      {}", report.stats.slowed_down);
    println!("  Discontinuities:  {}", report.stats.discontinuities);
    println!(
        "  Max drift:        {:.2}ms",
        report.stats.max_drift_nanos as f64 / 1_000_000.0
    );
    println!("  Max interval:     {:?}", presenter_stats.max_interval());
    if presenter_stats.malformed() > 0 {
        println!("  Malformed frames: {}", presenter_stats.malformed());
    }
    if let Some(stats) = audio_stats {
        println!(
            "  Audio:            {} bytes, {} periods, {} underruns",
            stats.bytes_played(),
            stats.periods(),
            stats.underruns()
        );
    }

    Ok(())
}
