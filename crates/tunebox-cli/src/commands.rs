//! Command handlers
//!
//! Each handler writes its listing (if any) to `out` and returns the
//! one-line status message shown to the user.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use tunebox_core::config::{save_config, TuneboxConfig};
use tunebox_core::playlist::PlaylistPatch;
use tunebox_core::{
    DirectoryStore, FolderScanner, InMemoryLibrary, LocalPlaylistStore, Playlist,
    PlaylistManager, TrackId, TrackLibrary, TrackMetadata,
};

use crate::cli::Action;
use crate::library_file::{load_library, save_library};

pub type Manager = PlaylistManager<LocalPlaylistStore<DirectoryStore>, InMemoryLibrary>;

/// A loaded manager plus the settings it was opened with
pub struct Session {
    manager: Manager,
    library_path: PathBuf,
    config: TuneboxConfig,
    config_path: PathBuf,
}

impl Session {
    pub fn open(config: &TuneboxConfig, config_path: &Path) -> Result<Self> {
        let data_dir = config.data_dir();
        let kv = DirectoryStore::open(data_dir.clone())
            .with_context(|| format!("Failed to open data directory: {:?}", data_dir))?;
        let store = LocalPlaylistStore::with_key(kv, config.storage_key.clone());

        let library_path = config.library_path();
        let library = load_library(&library_path)?;

        let scanner = FolderScanner::new(config.scan.clone());
        let mut manager = PlaylistManager::with_scanner(store, library, scanner);
        manager.load().context("Failed to load playlists")?;

        Ok(Self {
            manager,
            library_path,
            config: config.clone(),
            config_path: config_path.to_path_buf(),
        })
    }

    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// Run one action, saving the library afterwards if it may have changed
    pub fn run(&mut self, action: Action, out: &mut impl Write) -> Result<String> {
        let touches_library = matches!(
            action,
            Action::Delete { .. }
                | Action::Add { .. }
                | Action::Remove { .. }
                | Action::Drop { .. }
                | Action::Import { .. }
                | Action::Cleanup
        );

        let message = self.dispatch(action, out)?;

        if touches_library {
            save_library(self.manager.library(), &self.library_path)?;
        }
        Ok(message)
    }

    fn dispatch(&mut self, action: Action, out: &mut impl Write) -> Result<String> {
        match action {
            Action::List => self.list(out),
            Action::Show { playlist } => self.show(&playlist, out),
            Action::Create { name, description } => {
                let created = self
                    .manager
                    .create_playlist(&name, description.as_deref())?;
                Ok(format!("Created playlist \"{}\" ({})", created.name(), created.id()))
            }
            Action::Rename { playlist, name } => {
                let target = self.resolve_playlist(&playlist)?;
                let renamed = self
                    .manager
                    .update_playlist(target.id(), PlaylistPatch::rename(name))?;
                Ok(format!("Renamed \"{}\" to \"{}\"", target.name(), renamed.name()))
            }
            Action::Describe { playlist, text } => {
                let target = self.resolve_playlist(&playlist)?;
                let cleared = text.is_none();
                self.manager
                    .update_playlist(target.id(), PlaylistPatch::describe(text))?;
                if cleared {
                    Ok(format!("Cleared description of \"{}\"", target.name()))
                } else {
                    Ok(format!("Updated description of \"{}\"", target.name()))
                }
            }
            Action::Delete { playlist } => {
                let target = self.resolve_playlist(&playlist)?;
                self.manager.delete_playlist(target.id())?;
                Ok(format!("Deleted playlist \"{}\"", target.name()))
            }
            Action::Add { track, playlist } => {
                let track = self.resolve_track(&track)?;
                let target = self.resolve_playlist(&playlist)?;
                let updated = self.manager.add_track_to_playlist(&track.id, target.id())?;
                Ok(format!(
                    "Added \"{}\" to \"{}\" ({} tracks)",
                    track.title,
                    updated.name(),
                    updated.track_count()
                ))
            }
            Action::Remove { track, playlist } => {
                let track = self.resolve_track(&track)?;
                let target = self.resolve_playlist(&playlist)?;
                let updated = self
                    .manager
                    .remove_track_from_playlist(&track.id, target.id())?;
                Ok(format!(
                    "Removed \"{}\" from \"{}\" ({} tracks)",
                    track.title,
                    updated.name(),
                    updated.track_count()
                ))
            }
            Action::Drop { track, playlist } => {
                let track = self.resolve_track(&track)?;
                let target = self.resolve_playlist(&playlist)?;
                let updated = self
                    .manager
                    .drop_track_on_playlist(&track.id, target.id())?;
                Ok(format!("Added \"{}\" to \"{}\"", track.title, updated.name()))
            }
            Action::Import { dir } => {
                let scanned = self.manager.scanner().scan(&dir)?;
                let found = scanned.tracks.len();
                let added = self.manager.library_mut().add_tracks(scanned.tracks);
                Ok(format!(
                    "Imported {} new tracks from {:?} ({} found, {} files skipped)",
                    added, dir, found, scanned.skipped_files
                ))
            }
            Action::Folder { dir, name } => {
                let created = self.manager.add_folder_playlist(&dir, name.as_deref())?;
                Ok(format!(
                    "Created folder playlist \"{}\" with {} tracks",
                    created.name(),
                    created.track_count()
                ))
            }
            Action::Rescan { playlist } => {
                let target = self.resolve_playlist(&playlist)?;
                let scanned = self.manager.rescan_folder_playlist(target.id())?;
                Ok(format!(
                    "Rescanned \"{}\": {} tracks ({} files skipped)",
                    target.name(),
                    scanned.tracks.len(),
                    scanned.skipped_files
                ))
            }
            Action::Cleanup => {
                let report = self.manager.cleanup_invalid_playlist_references()?;
                if report.is_clean() {
                    Ok("Playlists are consistent with the library".to_string())
                } else {
                    Ok(format!(
                        "Removed {} missing track references, repaired {} tracks",
                        report.dangling_references, report.tracks_repaired
                    ))
                }
            }
            Action::Play { playlist, start } => self.play(&playlist, start, out),
            Action::Tracks => self.tracks(out),
            Action::Init { force } => self.init(force),
        }
    }

    fn init(&self, force: bool) -> Result<String> {
        if self.config_path.exists() && !force {
            bail!(
                "Config file {:?} already exists, use --force to replace it",
                self.config_path
            );
        }
        save_config(&self.config, &self.config_path)?;
        Ok(format!("Wrote config to {:?}", self.config_path))
    }

    fn list(&self, out: &mut impl Write) -> Result<String> {
        let playlists = self.manager.playlists();
        for playlist in &playlists {
            writeln!(
                out,
                "{:<20} {:<8} {:>5}  {}",
                playlist.id(),
                playlist.kind(),
                playlist.track_count(),
                playlist.name()
            )?;
        }
        Ok(format!("{} playlists", playlists.len()))
    }

    fn show(&self, id_or_name: &str, out: &mut impl Write) -> Result<String> {
        let playlist = self.resolve_playlist(id_or_name)?;
        if let Some(description) = playlist.as_virtual().and_then(|p| p.description.as_deref()) {
            writeln!(out, "{}", description)?;
        }
        if let Some(folder) = playlist.as_folder() {
            writeln!(out, "Folder: {}", folder.folder_path.display())?;
        }

        let tracks = self.manager.playlist_tracks(playlist.id())?;
        write_tracks(&tracks, out)?;
        Ok(format!(
            "\"{}\" ({}, {} tracks)",
            playlist.name(),
            playlist.kind(),
            playlist.track_count()
        ))
    }

    fn play(&mut self, id_or_name: &str, start: usize, out: &mut impl Write) -> Result<String> {
        let playlist = self.resolve_playlist(id_or_name)?;
        self.manager.play_playlist(playlist.id(), start)?;

        let library = self.manager.library();
        write_tracks(library.playback_scope(), out)?;
        let current = library
            .now_playing()
            .ok_or_else(|| anyhow!("Playback did not start"))?;
        Ok(format!(
            "Now playing \"{}\" by {} from \"{}\"",
            current.title,
            current.artist,
            playlist.name()
        ))
    }

    fn tracks(&self, out: &mut impl Write) -> Result<String> {
        let tracks = self.manager.library().tracks();
        for track in tracks {
            let names: Vec<String> = self
                .manager
                .playlists_for_track(&track.id)
                .iter()
                .filter_map(|id| self.manager.playlist(id))
                .map(|p| p.name().to_string())
                .collect();
            writeln!(
                out,
                "{:<22} {} - {} [{}] {}",
                track.id,
                track.artist,
                track.title,
                track.format_duration(),
                names.join(", ")
            )?;
        }
        Ok(format!("{} tracks in library", tracks.len()))
    }

    fn resolve_playlist(&self, id_or_name: &str) -> Result<Playlist> {
        self.manager
            .find(id_or_name)
            .ok_or_else(|| anyhow!("No playlist with id or name \"{}\"", id_or_name))
    }

    /// Match a track by id, then by title when the title is unique
    fn resolve_track(&self, id_or_title: &str) -> Result<TrackMetadata> {
        let library = self.manager.library();
        if let Some(track) = library.track(&TrackId::new(id_or_title)) {
            return Ok(track.clone());
        }

        let matches: Vec<&TrackMetadata> = library
            .tracks()
            .iter()
            .filter(|t| t.title.eq_ignore_ascii_case(id_or_title.trim()))
            .collect();
        match matches.as_slice() {
            [track] => Ok((*track).clone()),
            [] => bail!("No track with id or title \"{}\"", id_or_title),
            _ => bail!(
                "{} tracks are titled \"{}\", use the track id",
                matches.len(),
                id_or_title
            ),
        }
    }
}

fn write_tracks(tracks: &[TrackMetadata], out: &mut impl Write) -> Result<()> {
    for (index, track) in tracks.iter().enumerate() {
        writeln!(
            out,
            "{:>3}. {} - {} [{}]",
            index,
            track.artist,
            track.title,
            track.format_duration()
        )?;
    }
    Ok(())
}
