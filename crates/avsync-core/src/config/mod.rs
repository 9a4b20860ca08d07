//! Configuration for avsync sessions and applications
//!
//! This module provides:
//!
//! - Generic YAML config loading/saving
//! - Standard config file locations
//! - The playback session configuration
//!
//! # Usage
//!
//! ```ignore
//! use avsync_core::config::{default_config_path, load_config, save_config, PlaybackConfig};
//!
//! let path = default_config_path("playback.yaml");
//! let config: PlaybackConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod io;
mod paths;
mod playback;

pub use io::{load_config, save_config, try_load_config};
pub use paths::{default_config_dir, default_config_path};
pub use playback::{PlaybackConfig, DEFAULT_AUDIO_BUFFER_MS};
