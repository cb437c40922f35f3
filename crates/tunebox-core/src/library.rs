//! Track library and playback scope
//!
//! The library owns track records. Playlists refer to them by id only.

use crate::playlist::{PlaylistError, PlaylistResult};
use crate::types::{TrackId, TrackMetadata, TrackPatch};

/// The playback side the playlist manager talks to
pub trait TrackLibrary: Send {
    /// Every track, in library order
    fn tracks(&self) -> &[TrackMetadata];

    /// Start playing the track at `index` of the current playback scope
    fn play_track(&mut self, index: usize) -> PlaylistResult<()>;

    /// Restrict playback (next/previous, shuffle) to `tracks`
    fn set_playback_scope(&mut self, tracks: Vec<TrackMetadata>);

    /// Apply a partial update to one track
    fn update_track_metadata(&mut self, id: &TrackId, patch: TrackPatch) -> PlaylistResult<()>;

    fn track(&self, id: &TrackId) -> Option<&TrackMetadata> {
        self.tracks().iter().find(|t| &t.id == id)
    }

    fn contains(&self, id: &TrackId) -> bool {
        self.track(id).is_some()
    }
}

/// Library held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryLibrary {
    tracks: Vec<TrackMetadata>,
    scope: Vec<TrackMetadata>,
    now_playing: Option<usize>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tracks(tracks: Vec<TrackMetadata>) -> Self {
        let mut library = Self::new();
        library.add_tracks(tracks);
        library
    }

    /// Add tracks, skipping ids already present. Returns how many were added.
    pub fn add_tracks(&mut self, tracks: impl IntoIterator<Item = TrackMetadata>) -> usize {
        let mut added = 0;
        for track in tracks {
            if self.contains(&track.id) {
                log::debug!("add_tracks: {} already in library", track.id);
                continue;
            }
            self.tracks.push(track);
            added += 1;
        }
        added
    }

    /// Remove a track from the library. Playlist references to it are left
    /// dangling until the manager prunes them.
    pub fn remove_track(&mut self, id: &TrackId) -> Option<TrackMetadata> {
        let index = self.tracks.iter().position(|t| &t.id == id)?;
        Some(self.tracks.remove(index))
    }

    pub fn playback_scope(&self) -> &[TrackMetadata] {
        &self.scope
    }

    /// Track currently playing, if any
    pub fn now_playing(&self) -> Option<&TrackMetadata> {
        self.now_playing.and_then(|i| self.scope.get(i))
    }

    pub fn into_tracks(self) -> Vec<TrackMetadata> {
        self.tracks
    }
}

impl TrackLibrary for InMemoryLibrary {
    fn tracks(&self) -> &[TrackMetadata] {
        &self.tracks
    }

    fn play_track(&mut self, index: usize) -> PlaylistResult<()> {
        if index >= self.scope.len() {
            return Err(PlaylistError::InvalidOperation(format!(
                "Track index {} out of range ({} in scope)",
                index,
                self.scope.len()
            )));
        }
        log::info!("play_track: {:?} by {:?}", self.scope[index].title, self.scope[index].artist);
        self.now_playing = Some(index);
        Ok(())
    }

    fn set_playback_scope(&mut self, tracks: Vec<TrackMetadata>) {
        log::debug!("set_playback_scope: {} tracks", tracks.len());
        self.scope = tracks;
        self.now_playing = None;
    }

    fn update_track_metadata(&mut self, id: &TrackId, patch: TrackPatch) -> PlaylistResult<()> {
        let track = self
            .tracks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| PlaylistError::NotFound(format!("track {}", id)))?;
        track.apply(patch);
        Ok(())
    }
}
