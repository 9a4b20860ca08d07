//! Player configuration for avsync-player
//!
//! Configuration is stored as YAML in the user's config directory.
//! Default location: ~/.config/avsync/player.yaml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use avsync_core::audio::{SampleFormat, DEFAULT_PERIOD_FRAMES};
use avsync_core::config::{default_config_path as core_config_path, PlaybackConfig};
use avsync_core::PixelFormat;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Session sizing, audio format and sync thresholds
    pub playback: PlaybackConfig,
    /// Synthetic video stream settings
    pub video: VideoConfig,
    /// Synthetic audio stream and output device settings
    pub output: OutputConfig,
    /// Length of the generated stream in seconds
    pub duration_secs: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            video: VideoConfig::default(),
            output: OutputConfig::default(),
            duration_secs: 10.0,
        }
    }
}

impl PlayerConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs.max(0.0))
    }
}

/// Video stream section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    /// Frames per second of the generated stream
    pub fps: f64,
    pub pixel_format: PixelFormat,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 180,
            fps: 30.0,
            pixel_format: PixelFormat::Rgba8,
        }
    }
}

/// Where decoded audio is played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputBackend {
    /// Software device thread draining the ring at the sample rate
    #[default]
    Paced,
    /// Default system output device (needs the `cpal-output` feature)
    Device,
}

/// Audio output section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub backend: OutputBackend,
    /// Sample frames per period for the paced backend
    pub period_frames: u32,
    /// Frequency of the generated test tone
    pub tone_hz: f32,
    /// Tone amplitude (0.0 - 1.0)
    pub tone_level: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            backend: OutputBackend::Paced,
            period_frames: DEFAULT_PERIOD_FRAMES,
            tone_hz: 440.0,
            tone_level: 0.2,
        }
    }
}

/// Get the default config file path
///
/// Returns: ~/.config/avsync/player.yaml
pub fn default_config_path() -> PathBuf {
    core_config_path("player.yaml")
}

/// Check settings the core can't validate on its own
pub fn validate(config: &PlayerConfig) -> anyhow::Result<()> {
    if config.video.fps.is_nan() || config.video.fps <= 0.0 {
        anyhow::bail!("video.fps must be positive, got {}", config.video.fps);
    }
    if config.video.width == 0 || config.video.height == 0 {
        anyhow::bail!(
            "video size must be non-zero, got {}x{}",
            config.video.width,
            config.video.height
        );
    }
    if config.playback.audio_enabled
        && config.output.backend == OutputBackend::Device
        && config.playback.audio.sample_format != SampleFormat::F32
    {
        anyhow::bail!("the device backend plays f32 samples only");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlayerConfig::default();
        assert_eq!(config.video.fps, 30.0);
        assert_eq!(config.duration(), Duration::from_secs(10));
        assert_eq!(config.output.backend, OutputBackend::Paced);
        assert!(config.playback.audio_enabled);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "video:\n  fps: 25\noutput:\n  backend: device\n";
        let config: PlayerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.video.fps, 25.0);
        assert_eq!(config.video.width, 320);
        assert_eq!(config.output.backend, OutputBackend::Device);
        assert_eq!(config.playback.frame_queue_capacity, 5);
    }

    #[test]
    fn test_validate_rejects_bad_video() {
        let mut config = PlayerConfig::default();
        config.video.fps = 0.0;
        assert!(validate(&config).is_err());

        let mut config = PlayerConfig::default();
        config.video.height = 0;
        assert!(validate(&config).is_err());
    }
}
