//! Standard locations for avsync configuration files

use std::path::PathBuf;

/// Get the avsync configuration directory
///
/// Returns: `<platform config dir>/avsync` (e.g. `~/.config/avsync` on Linux),
/// or `./avsync` when the platform has no config directory.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("avsync")
}

/// Get the default config file path for a given file name
///
/// # Arguments
/// * `filename` - Config file name (e.g., "player.yaml")
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}
