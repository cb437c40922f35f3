//! Playlist records and storage
//!
//! This module provides:
//! - The [`Playlist`] sum type (virtual, folder and the synthesized all-music view)
//! - The [`PlaylistStore`] trait the state manager writes through
//! - [`LocalPlaylistStore`], which keeps every record as one JSON array
//!   under a fixed key of a [`KeyValueStore`](crate::storage::KeyValueStore)
//! - [`MembershipIndex`], the derived track → playlists view

mod error;
pub mod local;
mod membership;

pub use error::{PlaylistError, PlaylistResult};
pub use local::{LocalPlaylistStore, DEFAULT_STORAGE_KEY};
pub use membership::MembershipIndex;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{PlaylistId, TrackId};

/// Display name of the synthesized all-music playlist
pub const ALL_MUSIC_NAME: &str = "All Music";

/// Reference from a virtual playlist into the track library.
///
/// The library owns the track; the playlist only remembers the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistTrackRef {
    pub track_id: TrackId,
    pub added_at: DateTime<Utc>,
    /// Position in the playlist (0-indexed)
    pub order: usize,
}

/// User-defined collection of track references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualPlaylist {
    pub id: PlaylistId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub track_count: usize,
    #[serde(default)]
    pub tracks: Vec<PlaylistTrackRef>,
}

impl VirtualPlaylist {
    pub fn new(id: PlaylistId, name: &str, description: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: now,
            updated_at: now,
            track_count: 0,
            tracks: Vec::new(),
        }
    }

    pub fn contains(&self, track_id: &TrackId) -> bool {
        self.tracks.iter().any(|t| &t.track_id == track_id)
    }

    /// Append a track. Returns false if it was already present.
    pub fn add_track(&mut self, track_id: &TrackId, now: DateTime<Utc>) -> bool {
        if self.contains(track_id) {
            return false;
        }
        self.tracks.push(PlaylistTrackRef {
            track_id: track_id.clone(),
            added_at: now,
            order: self.tracks.len(),
        });
        self.track_count = self.tracks.len();
        self.updated_at = now;
        true
    }

    /// Remove a track. Returns false if it was not present.
    pub fn remove_track(&mut self, track_id: &TrackId, now: DateTime<Utc>) -> bool {
        let before = self.tracks.len();
        self.tracks.retain(|t| &t.track_id != track_id);
        if self.tracks.len() == before {
            return false;
        }
        self.renumber();
        self.updated_at = now;
        true
    }

    /// Drop every reference for which `keep` returns false.
    ///
    /// Returns the number of references removed.
    pub fn retain_tracks(&mut self, keep: impl Fn(&TrackId) -> bool) -> usize {
        let before = self.tracks.len();
        self.tracks.retain(|t| keep(&t.track_id));
        let removed = before - self.tracks.len();
        if removed > 0 {
            self.renumber();
        }
        removed
    }

    /// Track ids sorted by their `order`
    pub fn ordered_track_ids(&self) -> Vec<TrackId> {
        let mut refs: Vec<&PlaylistTrackRef> = self.tracks.iter().collect();
        refs.sort_by_key(|t| t.order);
        refs.into_iter().map(|t| t.track_id.clone()).collect()
    }

    fn renumber(&mut self) {
        self.tracks.sort_by_key(|t| t.order);
        for (index, track) in self.tracks.iter_mut().enumerate() {
            track.order = index;
        }
        self.track_count = self.tracks.len();
    }
}

/// View over a local directory, rebuilt by rescanning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderPlaylist {
    pub id: PlaylistId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub track_count: usize,
    pub folder_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scanned: Option<DateTime<Utc>>,
}

/// Synthesized view of the whole library. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllPlaylist {
    pub id: PlaylistId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub track_count: usize,
}

impl AllPlaylist {
    pub fn new(track_count: usize, now: DateTime<Utc>) -> Self {
        Self {
            id: PlaylistId::all(),
            name: ALL_MUSIC_NAME.to_string(),
            created_at: now,
            updated_at: now,
            track_count,
        }
    }
}

/// Discriminant of a [`Playlist`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistKind {
    Virtual,
    Folder,
    All,
}

impl std::fmt::Display for PlaylistKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlaylistKind::Virtual => "virtual",
            PlaylistKind::Folder => "folder",
            PlaylistKind::All => "all",
        };
        f.pad(s)
    }
}

/// A playlist record, tagged by `"type"` when serialized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Playlist {
    Virtual(VirtualPlaylist),
    Folder(FolderPlaylist),
    All(AllPlaylist),
}

impl Playlist {
    pub fn id(&self) -> &PlaylistId {
        match self {
            Playlist::Virtual(p) => &p.id,
            Playlist::Folder(p) => &p.id,
            Playlist::All(p) => &p.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Playlist::Virtual(p) => &p.name,
            Playlist::Folder(p) => &p.name,
            Playlist::All(p) => &p.name,
        }
    }

    pub fn kind(&self) -> PlaylistKind {
        match self {
            Playlist::Virtual(_) => PlaylistKind::Virtual,
            Playlist::Folder(_) => PlaylistKind::Folder,
            Playlist::All(_) => PlaylistKind::All,
        }
    }

    pub fn track_count(&self) -> usize {
        match self {
            Playlist::Virtual(p) => p.track_count,
            Playlist::Folder(p) => p.track_count,
            Playlist::All(p) => p.track_count,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Playlist::Virtual(p) => p.created_at,
            Playlist::Folder(p) => p.created_at,
            Playlist::All(p) => p.created_at,
        }
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            Playlist::Virtual(p) => p.updated_at,
            Playlist::Folder(p) => p.updated_at,
            Playlist::All(p) => p.updated_at,
        }
    }

    pub fn as_virtual(&self) -> Option<&VirtualPlaylist> {
        match self {
            Playlist::Virtual(p) => Some(p),
            Playlist::Folder(_) | Playlist::All(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&FolderPlaylist> {
        match self {
            Playlist::Folder(p) => Some(p),
            Playlist::Virtual(_) | Playlist::All(_) => None,
        }
    }

    /// Case-insensitive comparison on trimmed names
    pub fn has_name(&self, name: &str) -> bool {
        self.name().trim().to_lowercase() == name.trim().to_lowercase()
    }
}

/// Partial update of a virtual playlist
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistPatch {
    pub name: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
}

impl PlaylistPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            description: None,
        }
    }

    pub fn describe(description: Option<String>) -> Self {
        Self {
            name: None,
            description: Some(description),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a playlist id from the name and the creation instant.
///
/// A process-wide sequence number keeps ids distinct when the same name is
/// created twice within one clock tick.
pub fn generate_playlist_id(prefix: &str, name: &str, now: DateTime<Utc>) -> PlaylistId {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    now.timestamp_nanos_opt().unwrap_or_default().hash(&mut hasher);
    ID_SEQUENCE.fetch_add(1, Ordering::Relaxed).hash(&mut hasher);
    PlaylistId(format!("{}-{:012x}", prefix, hasher.finish() & 0xffff_ffff_ffff))
}

/// Abstract storage backend for playlists.
///
/// Every call reads the full collection, applies one change and writes the
/// full collection back. Calls that change a record return it as stored.
pub trait PlaylistStore: Send {
    /// All persisted playlists (virtual and folder), in stored order
    fn get_all_playlists(&self) -> PlaylistResult<Vec<Playlist>>;

    /// Persist a new, empty virtual playlist
    fn create_virtual_playlist(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> PlaylistResult<Playlist>;

    /// Apply a partial update to a virtual playlist
    fn update_virtual_playlist(
        &mut self,
        id: &PlaylistId,
        patch: PlaylistPatch,
    ) -> PlaylistResult<Playlist>;

    /// Delete a virtual playlist
    fn delete_virtual_playlist(&mut self, id: &PlaylistId) -> PlaylistResult<()>;

    /// Append a track reference (no-op if already present)
    fn add_track_to_virtual_playlist(
        &mut self,
        track_id: &TrackId,
        playlist_id: &PlaylistId,
    ) -> PlaylistResult<Playlist>;

    /// Remove a track reference and renumber the rest
    fn remove_track_from_virtual_playlist(
        &mut self,
        track_id: &TrackId,
        playlist_id: &PlaylistId,
    ) -> PlaylistResult<Playlist>;

    /// Persist a new folder playlist pointing at `folder_path`, together
    /// with the scan it was built from
    fn create_folder_playlist(
        &mut self,
        name: &str,
        folder_path: &Path,
        track_count: usize,
        scanned_at: DateTime<Utc>,
    ) -> PlaylistResult<Playlist>;

    /// Record the outcome of a folder scan
    fn record_folder_scan(
        &mut self,
        id: &PlaylistId,
        track_count: usize,
        scanned_at: DateTime<Utc>,
    ) -> PlaylistResult<Playlist>;

    /// Delete a folder playlist
    fn delete_folder_playlist(&mut self, id: &PlaylistId) -> PlaylistResult<()>;

    /// Remove every track reference for which `keep` returns false, across
    /// all virtual playlists. Returns the number of references removed.
    fn prune_tracks(&mut self, keep: &dyn Fn(&TrackId) -> bool) -> PlaylistResult<usize>;
}
