//! Folder scanning for folder playlists and library import
//!
//! A scan lists the immediate files of one directory (no recursion), keeps
//! the ones with a supported extension and builds a track record for each.
//! Title and artist come from the file name; the duration is probed from the
//! file and falls back to zero when the file cannot be read.

mod duration;

pub use duration::{DurationProbe, ProbeError, SymphoniaProbe};

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::types::{TrackId, TrackMetadata, LOCAL_CATEGORY, UNKNOWN_ARTIST};

/// Extensions accepted by default
pub const DEFAULT_EXTENSIONS: [&str; 5] = ["mp3", "flac", "wav", "ogg", "m4a"];

/// Errors that stop a scan
#[derive(Error, Debug)]
pub enum ScanError {
    /// The path does not exist or is not a directory
    #[error("Not a directory: {0:?}")]
    NotADirectory(PathBuf),

    /// Listing the directory failed
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Scanner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Accepted file extensions, compared case-insensitively
    pub extensions: Vec<String>,
    /// Threads used for duration probing. `None` uses the global rayon pool.
    pub probe_threads: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            probe_threads: None,
        }
    }
}

/// Result of scanning one directory
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedFolder {
    pub folder: PathBuf,
    /// Tracks for supported files, in file-name order
    pub tracks: Vec<TrackMetadata>,
    /// Every file in the directory, supported or not
    pub total_files: usize,
    /// Files skipped because of their extension
    pub skipped_files: usize,
}

/// Directory scanner
pub struct FolderScanner {
    config: ScanConfig,
    probe: Box<dyn DurationProbe>,
}

impl Default for FolderScanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

impl FolderScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self::with_probe(config, Box::new(SymphoniaProbe))
    }

    pub fn with_probe(config: ScanConfig, probe: Box<dyn DurationProbe>) -> Self {
        Self { config, probe }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Check if a path has a supported audio extension
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Scan the immediate files of `dir`
    pub fn scan(&self, dir: &Path) -> Result<ScannedFolder, ScanError> {
        if !dir.is_dir() {
            return Err(ScanError::NotADirectory(dir.to_path_buf()));
        }

        let mut total_files = 0;
        let mut supported = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| ScanError::Io {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
                source: e.into(),
            })?;
            let path = entry.path();

            // Follows symlinks, unlike entry.file_type()
            if !path.is_file() {
                continue;
            }
            total_files += 1;

            if self.is_supported(path) {
                supported.push(path.to_path_buf());
            } else {
                log::debug!("scan: Skipping unsupported file {:?}", path);
            }
        }

        let skipped_files = total_files - supported.len();
        let tracks = self.build_tracks(&supported);

        log::info!(
            "scan: {:?}: {} tracks from {} files ({} skipped)",
            dir,
            tracks.len(),
            total_files,
            skipped_files
        );

        Ok(ScannedFolder {
            folder: dir.to_path_buf(),
            tracks,
            total_files,
            skipped_files,
        })
    }

    fn build_tracks(&self, paths: &[PathBuf]) -> Vec<TrackMetadata> {
        let build = || {
            paths
                .par_iter()
                .map(|path| self.track_for(path))
                .collect::<Vec<_>>()
        };

        match self.config.probe_threads {
            Some(threads) => match rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("tunebox-probe-{}", i))
                .build()
            {
                Ok(pool) => pool.install(build),
                Err(e) => {
                    log::warn!("scan: Failed to build probe pool ({}), using global pool", e);
                    build()
                }
            },
            None => build(),
        }
    }

    fn track_for(&self, path: &Path) -> TrackMetadata {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let (title, artist) = split_file_stem(&stem);

        let duration = match self.probe.duration_seconds(path) {
            Ok(secs) => secs,
            Err(e) => {
                log::debug!("scan: No duration for {:?}: {}", path, e);
                0.0
            }
        };

        TrackMetadata {
            id: TrackId::from_path(path),
            title,
            artist,
            duration,
            category: LOCAL_CATEGORY.to_string(),
            path: Some(path.to_path_buf()),
            virtual_playlists: Vec::new(),
        }
    }
}

/// Split a file stem into `(title, artist)`.
///
/// `"Artist - Title"` splits on the first `" - "`; anything else becomes the
/// title with [`UNKNOWN_ARTIST`].
pub fn split_file_stem(stem: &str) -> (String, String) {
    match stem.split_once(" - ") {
        Some((artist, title)) if !artist.trim().is_empty() && !title.trim().is_empty() => {
            (title.trim().to_string(), artist.trim().to_string())
        }
        _ => (stem.trim().to_string(), UNKNOWN_ARTIST.to_string()),
    }
}
