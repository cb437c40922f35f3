//! Shared identifiers and track records

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Category assigned to tracks discovered by a folder scan
pub const LOCAL_CATEGORY: &str = "local";

/// Artist used when the file name carries no artist part
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Identifier of a playlist record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistId(pub String);

impl PlaylistId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id of the synthesized all-music playlist
    pub fn all() -> Self {
        Self("all-music".to_string())
    }

    pub fn is_all(&self) -> bool {
        self.0 == "all-music"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

/// Identifier of a track owned by the library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Stable id for a file on disk, derived from its path.
    ///
    /// Scanning the same folder twice yields the same ids.
    pub fn from_path(path: &Path) -> Self {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        Self(format!("trk-{:016x}", hasher.finish()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A track as the library sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackMetadata {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    /// Duration in seconds, 0.0 when unknown
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub category: String,
    /// Location on disk for tracks that came from a scan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Virtual playlists containing this track.
    ///
    /// Only ever written from the playlist side; see `playlist::MembershipIndex`.
    #[serde(default)]
    pub virtual_playlists: Vec<PlaylistId>,
}

impl TrackMetadata {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(id),
            title: title.into(),
            artist: artist.into(),
            duration: 0.0,
            category: String::new(),
            path: None,
            virtual_playlists: Vec::new(),
        }
    }

    /// Format duration as MM:SS
    pub fn format_duration(&self) -> String {
        if self.duration <= 0.0 {
            return "--:--".to_string();
        }
        let mins = (self.duration / 60.0) as u32;
        let secs = (self.duration % 60.0) as u32;
        format!("{}:{:02}", mins, secs)
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, patch: TrackPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(artist) = patch.artist {
            self.artist = artist;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(playlists) = patch.virtual_playlists {
            self.virtual_playlists = playlists;
        }
    }
}

/// Partial update of a track record. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackPatch {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub category: Option<String>,
    pub virtual_playlists: Option<Vec<PlaylistId>>,
}

impl TrackPatch {
    pub fn membership(playlists: Vec<PlaylistId>) -> Self {
        Self {
            virtual_playlists: Some(playlists),
            ..Default::default()
        }
    }
}
