//! Application settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::paths::default_data_dir;
use crate::playlist::DEFAULT_STORAGE_KEY;
use crate::scanner::ScanConfig;

/// Library snapshot file name inside the data dir
pub const DEFAULT_LIBRARY_FILE: &str = "library.json";

/// Settings read from `config.yaml`
///
/// ```yaml
/// data_dir: /home/me/Music/tunebox
/// storage_key: virtual-playlists
/// library_file: library.json
/// scan:
///   extensions: [mp3, flac]
///   probe_threads: 4
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuneboxConfig {
    /// Overrides [`default_data_dir`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Key the playlist list is stored under
    pub storage_key: String,
    /// Library snapshot, relative to the data dir unless absolute
    pub library_file: PathBuf,
    pub scan: ScanConfig,
}

impl Default for TuneboxConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            library_file: PathBuf::from(DEFAULT_LIBRARY_FILE),
            scan: ScanConfig::default(),
        }
    }
}

impl TuneboxConfig {
    /// Effective data directory
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Effective library snapshot path
    pub fn library_path(&self) -> PathBuf {
        resolve(&self.data_dir(), &self.library_file)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
