//! Standard tunebox locations

use std::path::PathBuf;

/// File name of the YAML config
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Where playlists and the library snapshot live by default.
///
/// Returns: `~/Music/tunebox`
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Music")
        .join("tunebox")
}

/// Default config file.
///
/// Returns: `<config dir>/tunebox/config.yaml`, or the data dir when the
/// platform has no config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("tunebox"))
        .unwrap_or_else(default_data_dir)
        .join(CONFIG_FILE_NAME)
}
