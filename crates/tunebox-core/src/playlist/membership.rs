//! Derived track → playlist membership
//!
//! Playlists own their track references. The per-track list of playlist ids
//! is always rebuilt from them and never written independently.

use std::collections::HashMap;

use super::Playlist;
use crate::types::{PlaylistId, TrackId};

/// Track id → ids of the virtual playlists containing it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MembershipIndex {
    by_track: HashMap<TrackId, Vec<PlaylistId>>,
}

impl MembershipIndex {
    /// Build the index from a playlist list. Playlist ids keep list order.
    pub fn build<'a>(playlists: impl IntoIterator<Item = &'a Playlist>) -> Self {
        let mut by_track: HashMap<TrackId, Vec<PlaylistId>> = HashMap::new();
        for playlist in playlists {
            match playlist {
                Playlist::Virtual(p) => {
                    for track in &p.tracks {
                        by_track
                            .entry(track.track_id.clone())
                            .or_default()
                            .push(p.id.clone());
                    }
                }
                Playlist::Folder(_) | Playlist::All(_) => {}
            }
        }
        Self { by_track }
    }

    /// Playlists containing `track_id` (empty if none)
    pub fn playlists_for(&self, track_id: &TrackId) -> &[PlaylistId] {
        self.by_track
            .get(track_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of tracks that belong to at least one playlist
    pub fn len(&self) -> usize {
        self.by_track.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_track.is_empty()
    }
}
