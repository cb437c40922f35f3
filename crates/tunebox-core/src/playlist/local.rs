//! Playlist storage as one JSON array under a fixed key
//!
//! Every operation re-reads the whole array, changes one record and writes
//! the whole array back. A stored value that fails to parse is treated as an
//! empty collection and is overwritten by the next write.

use std::path::Path;

use chrono::{DateTime, Utc};

use super::{
    generate_playlist_id, FolderPlaylist, Playlist, PlaylistError, PlaylistPatch,
    PlaylistResult, PlaylistStore, VirtualPlaylist,
};
use crate::storage::KeyValueStore;
use crate::types::{PlaylistId, TrackId};

/// Key the playlist array lives under by default
pub const DEFAULT_STORAGE_KEY: &str = "virtual-playlists";

/// [`PlaylistStore`] backed by a [`KeyValueStore`]
pub struct LocalPlaylistStore<K: KeyValueStore> {
    kv: K,
    key: String,
}

impl<K: KeyValueStore> LocalPlaylistStore<K> {
    /// Store playlists under [`DEFAULT_STORAGE_KEY`]
    pub fn new(kv: K) -> Self {
        Self::with_key(kv, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(kv: K, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Access the underlying key-value store
    pub fn kv(&self) -> &K {
        &self.kv
    }

    fn read_all(&self) -> PlaylistResult<Vec<Playlist>> {
        let Some(raw) = self.kv.get(&self.key)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<Playlist>>(&raw) {
            Ok(playlists) => Ok(playlists
                .into_iter()
                .filter(|p| !matches!(p, Playlist::All(_)))
                .collect()),
            Err(e) => {
                log::warn!(
                    "read_all: Stored playlists under {:?} are malformed ({}), treating as empty",
                    self.key,
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    fn write_all(&mut self, playlists: &[Playlist]) -> PlaylistResult<()> {
        let persisted: Vec<&Playlist> = playlists
            .iter()
            .filter(|p| !matches!(p, Playlist::All(_)))
            .collect();
        let json = serde_json::to_string(&persisted)?;
        self.kv.set(&self.key, &json)?;
        log::debug!("write_all: Stored {} playlists", persisted.len());
        Ok(())
    }

    /// Apply `change` to the virtual playlist `id` and write back if it
    /// reports a modification.
    fn modify_virtual<F>(&mut self, id: &PlaylistId, change: F) -> PlaylistResult<Playlist>
    where
        F: FnOnce(&mut VirtualPlaylist, DateTime<Utc>) -> PlaylistResult<bool>,
    {
        let mut playlists = self.read_all()?;
        let entry = playlists
            .iter_mut()
            .find(|p| p.id() == id)
            .ok_or_else(|| PlaylistError::NotFound(format!("playlist {}", id)))?;

        let changed = match entry {
            Playlist::Virtual(playlist) => change(playlist, Utc::now())?,
            Playlist::Folder(_) | Playlist::All(_) => {
                return Err(PlaylistError::NotVirtual(id.to_string()))
            }
        };
        let updated = entry.clone();

        if changed {
            self.write_all(&playlists)?;
        }
        Ok(updated)
    }

    fn modify_folder<F>(&mut self, id: &PlaylistId, change: F) -> PlaylistResult<Playlist>
    where
        F: FnOnce(&mut FolderPlaylist),
    {
        let mut playlists = self.read_all()?;
        let entry = playlists
            .iter_mut()
            .find(|p| p.id() == id)
            .ok_or_else(|| PlaylistError::NotFound(format!("playlist {}", id)))?;

        match entry {
            Playlist::Folder(playlist) => change(playlist),
            Playlist::Virtual(_) | Playlist::All(_) => {
                return Err(PlaylistError::InvalidOperation(format!(
                    "{} is not a folder playlist",
                    id
                )))
            }
        }
        let updated = entry.clone();

        self.write_all(&playlists)?;
        Ok(updated)
    }

    fn delete_where<F>(&mut self, id: &PlaylistId, accept: F) -> PlaylistResult<()>
    where
        F: Fn(&Playlist) -> PlaylistResult<()>,
    {
        let mut playlists = self.read_all()?;
        let index = playlists
            .iter()
            .position(|p| p.id() == id)
            .ok_or_else(|| PlaylistError::NotFound(format!("playlist {}", id)))?;
        accept(&playlists[index])?;

        let removed = playlists.remove(index);
        self.write_all(&playlists)?;
        log::info!("delete_where: Deleted playlist {:?} ({})", removed.name(), id);
        Ok(())
    }
}

impl<K: KeyValueStore> PlaylistStore for LocalPlaylistStore<K> {
    fn get_all_playlists(&self) -> PlaylistResult<Vec<Playlist>> {
        self.read_all()
    }

    fn create_virtual_playlist(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> PlaylistResult<Playlist> {
        let mut playlists = self.read_all()?;
        let now = Utc::now();
        let id = generate_playlist_id("vp", name, now);
        let playlist = Playlist::Virtual(VirtualPlaylist::new(id, name, description, now));

        playlists.push(playlist.clone());
        self.write_all(&playlists)?;

        log::info!("create_virtual_playlist: {:?} ({})", name, playlist.id());
        Ok(playlist)
    }

    fn update_virtual_playlist(
        &mut self,
        id: &PlaylistId,
        patch: PlaylistPatch,
    ) -> PlaylistResult<Playlist> {
        self.modify_virtual(id, |playlist, now| {
            if patch.is_empty() {
                return Ok(false);
            }
            if let Some(name) = patch.name {
                playlist.name = name;
            }
            if let Some(description) = patch.description {
                playlist.description = description;
            }
            playlist.updated_at = now;
            Ok(true)
        })
    }

    fn delete_virtual_playlist(&mut self, id: &PlaylistId) -> PlaylistResult<()> {
        self.delete_where(id, |p| match p {
            Playlist::Virtual(_) => Ok(()),
            Playlist::Folder(_) | Playlist::All(_) => Err(PlaylistError::NotVirtual(id.to_string())),
        })
    }

    fn add_track_to_virtual_playlist(
        &mut self,
        track_id: &TrackId,
        playlist_id: &PlaylistId,
    ) -> PlaylistResult<Playlist> {
        self.modify_virtual(playlist_id, |playlist, now| {
            let added = playlist.add_track(track_id, now);
            if !added {
                log::debug!("add_track_to_virtual_playlist: {} already in {}", track_id, playlist_id);
            }
            Ok(added)
        })
    }

    fn remove_track_from_virtual_playlist(
        &mut self,
        track_id: &TrackId,
        playlist_id: &PlaylistId,
    ) -> PlaylistResult<Playlist> {
        self.modify_virtual(playlist_id, |playlist, now| {
            Ok(playlist.remove_track(track_id, now))
        })
    }

    fn create_folder_playlist(
        &mut self,
        name: &str,
        folder_path: &Path,
        track_count: usize,
        scanned_at: DateTime<Utc>,
    ) -> PlaylistResult<Playlist> {
        let mut playlists = self.read_all()?;
        let now = Utc::now();
        let playlist = Playlist::Folder(FolderPlaylist {
            id: generate_playlist_id("fp", name, now),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
            track_count,
            folder_path: folder_path.to_path_buf(),
            last_scanned: Some(scanned_at),
        });

        playlists.push(playlist.clone());
        self.write_all(&playlists)?;

        log::info!(
            "create_folder_playlist: {:?} ({}) for {:?}",
            name,
            playlist.id(),
            folder_path
        );
        Ok(playlist)
    }

    fn record_folder_scan(
        &mut self,
        id: &PlaylistId,
        track_count: usize,
        scanned_at: DateTime<Utc>,
    ) -> PlaylistResult<Playlist> {
        self.modify_folder(id, |playlist| {
            playlist.track_count = track_count;
            playlist.last_scanned = Some(scanned_at);
            playlist.updated_at = scanned_at;
        })
    }

    fn delete_folder_playlist(&mut self, id: &PlaylistId) -> PlaylistResult<()> {
        self.delete_where(id, |p| match p {
            Playlist::Folder(_) => Ok(()),
            Playlist::Virtual(_) | Playlist::All(_) => Err(PlaylistError::InvalidOperation(
                format!("{} is not a folder playlist", id),
            )),
        })
    }

    fn prune_tracks(&mut self, keep: &dyn Fn(&TrackId) -> bool) -> PlaylistResult<usize> {
        let mut playlists = self.read_all()?;
        let now = Utc::now();
        let mut removed = 0;

        for playlist in playlists.iter_mut() {
            match playlist {
                Playlist::Virtual(p) => {
                    let n = p.retain_tracks(|id| keep(id));
                    if n > 0 {
                        log::info!("prune_tracks: Removed {} stale references from {:?}", n, p.name);
                        p.updated_at = now;
                        removed += n;
                    }
                }
                Playlist::Folder(_) | Playlist::All(_) => {}
            }
        }

        if removed > 0 {
            self.write_all(&playlists)?;
        }
        Ok(removed)
    }
}
