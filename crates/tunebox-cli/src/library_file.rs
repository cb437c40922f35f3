//! Library snapshot on disk (a JSON array of tracks)

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tunebox_core::{InMemoryLibrary, TrackLibrary, TrackMetadata};

/// Load the library snapshot. A missing file is an empty library.
pub fn load_library(path: &Path) -> Result<InMemoryLibrary> {
    if !path.exists() {
        log::info!("load_library: {:?} not found, starting empty", path);
        return Ok(InMemoryLibrary::new());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read library file: {:?}", path))?;
    let tracks: Vec<TrackMetadata> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse library file: {:?}", path))?;

    log::info!("load_library: {} tracks from {:?}", tracks.len(), path);
    Ok(InMemoryLibrary::from_tracks(tracks))
}

/// Write the library snapshot, replacing the previous file atomically
pub fn save_library(library: &InMemoryLibrary, path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create library directory: {:?}", parent))?;

    let json = serde_json::to_string_pretty(library.tracks())
        .context("Failed to serialize library")?;

    let mut staged = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {:?}", parent))?;
    staged
        .write_all(json.as_bytes())
        .and_then(|_| staged.as_file().sync_all())
        .with_context(|| format!("Failed to write library file: {:?}", path))?;
    staged
        .persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace library file: {:?}", path))?;

    log::debug!("save_library: {} tracks to {:?}", library.tracks().len(), path);
    Ok(())
}
