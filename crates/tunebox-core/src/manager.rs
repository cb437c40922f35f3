//! Playlist state manager
//!
//! Holds the in-memory playlist list, mirrors every change to the injected
//! [`PlaylistStore`] and keeps the library's per-track membership view in
//! step with the playlists.
//!
//! Every mutation runs in the same order: storage first, then the in-memory
//! list, then the derived membership is republished to the library. A
//! storage failure leaves memory untouched and is returned to the caller.
//!
//! # Usage
//!
//! ```ignore
//! use tunebox_core::{InMemoryLibrary, LocalPlaylistStore, MemoryStore, PlaylistManager};
//!
//! let store = LocalPlaylistStore::new(MemoryStore::new());
//! let mut manager = PlaylistManager::new(store, InMemoryLibrary::new());
//! manager.load()?;
//!
//! let workout = manager.create_playlist("Workout", None)?;
//! manager.drop_track_on_playlist(&track_id, workout.id())?;
//! ```

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::library::TrackLibrary;
use crate::playlist::{
    AllPlaylist, MembershipIndex, Playlist, PlaylistError, PlaylistPatch, PlaylistResult,
    PlaylistStore,
};
use crate::scanner::{FolderScanner, ScannedFolder};
use crate::types::{PlaylistId, TrackId, TrackMetadata, TrackPatch};

/// Loading state of the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// Playlists have not been read from storage yet
    Loading,
    Loaded,
}

/// Outcome of [`PlaylistManager::cleanup_invalid_playlist_references`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Stored references to tracks that are no longer in the library
    pub dangling_references: usize,
    /// Library tracks whose playlist list had to be corrected
    pub tracks_repaired: usize,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.dangling_references == 0 && self.tracks_repaired == 0
    }
}

/// Canonical playlist state for one library
pub struct PlaylistManager<S: PlaylistStore, L: TrackLibrary> {
    store: S,
    library: L,
    scanner: FolderScanner,
    state: ManagerState,
    /// User playlists (virtual and folder) in stored order
    playlists: Vec<Playlist>,
    /// Tracks of each folder playlist from its latest scan this session
    folder_tracks: HashMap<PlaylistId, Vec<TrackMetadata>>,
    membership: MembershipIndex,
    started_at: DateTime<Utc>,
}

impl<S: PlaylistStore, L: TrackLibrary> PlaylistManager<S, L> {
    pub fn new(store: S, library: L) -> Self {
        Self::with_scanner(store, library, FolderScanner::default())
    }

    pub fn with_scanner(store: S, library: L, scanner: FolderScanner) -> Self {
        Self {
            store,
            library,
            scanner,
            state: ManagerState::Loading,
            playlists: Vec::new(),
            folder_tracks: HashMap::new(),
            membership: MembershipIndex::default(),
            started_at: Utc::now(),
        }
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    /// Mutable access to the library.
    ///
    /// The all-music count follows automatically. Call
    /// [`cleanup_invalid_playlist_references`](Self::cleanup_invalid_playlist_references)
    /// after removing tracks to prune stored references to them.
    pub fn library_mut(&mut self) -> &mut L {
        &mut self.library
    }

    pub fn scanner(&self) -> &FolderScanner {
        &self.scanner
    }

    /// Consume the manager, handing back its collaborators
    pub fn into_parts(self) -> (S, L) {
        (self.store, self.library)
    }

    /// Read playlists from storage and move to [`ManagerState::Loaded`].
    ///
    /// References to tracks missing from the library are hidden from the
    /// in-memory view; storage keeps them until the next cleanup.
    pub fn load(&mut self) -> PlaylistResult<()> {
        self.state = ManagerState::Loading;

        let stored = self.store.get_all_playlists()?;
        let mut hidden = 0;
        self.playlists = stored
            .into_iter()
            .map(|playlist| {
                let (visible, dropped) = self.without_dangling(playlist);
                hidden += dropped;
                visible
            })
            .collect();
        self.folder_tracks.clear();
        self.membership = MembershipIndex::build(&self.playlists);
        self.state = ManagerState::Loaded;

        if hidden > 0 {
            log::warn!("load: Hid {} references to tracks missing from the library", hidden);
        }
        log::info!(
            "load: {} playlists, {} library tracks",
            self.playlists.len(),
            self.library.tracks().len()
        );
        Ok(())
    }

    /// The synthesized all-music playlist, sized to the current library
    pub fn all_playlist(&self) -> Playlist {
        let mut all = AllPlaylist::new(self.library.tracks().len(), self.started_at);
        all.updated_at = self.started_at;
        Playlist::All(all)
    }

    /// All-music first, then user playlists in stored order
    pub fn playlists(&self) -> Vec<Playlist> {
        std::iter::once(self.all_playlist())
            .chain(self.playlists.iter().cloned())
            .collect()
    }

    pub fn playlist(&self, id: &PlaylistId) -> Option<Playlist> {
        if id.is_all() {
            return Some(self.all_playlist());
        }
        self.playlists.iter().find(|p| p.id() == id).cloned()
    }

    /// Look up a playlist by exact id, falling back to a case-insensitive name
    pub fn find(&self, id_or_name: &str) -> Option<Playlist> {
        self.playlist(&PlaylistId::new(id_or_name))
            .or_else(|| self.playlists().into_iter().find(|p| p.has_name(id_or_name)))
    }

    /// Virtual playlists containing `track_id`
    pub fn playlists_for_track(&self, track_id: &TrackId) -> &[PlaylistId] {
        self.membership.playlists_for(track_id)
    }

    /// Create an empty virtual playlist.
    ///
    /// A name already used by any current playlist (ignoring case and
    /// surrounding whitespace) is rejected before storage is touched.
    pub fn create_playlist(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> PlaylistResult<Playlist> {
        self.ensure_loaded()?;
        let name = self.available_name(name, None)?;
        let description = clean_description(description);

        let created = self
            .store
            .create_virtual_playlist(&name, description.as_deref())?;
        self.playlists.push(created.clone());
        Ok(created)
    }

    /// Rename or re-describe a virtual playlist
    pub fn update_playlist(
        &mut self,
        id: &PlaylistId,
        mut patch: PlaylistPatch,
    ) -> PlaylistResult<Playlist> {
        self.ensure_loaded()?;
        self.require_virtual(id)?;

        if let Some(name) = patch.name.take() {
            patch.name = Some(self.available_name(&name, Some(id))?);
        }
        if let Some(description) = patch.description.take() {
            patch.description = Some(clean_description(description.as_deref()));
        }

        let updated = self.store.update_virtual_playlist(id, patch)?;
        Ok(self.replace(updated))
    }

    /// Delete a virtual or folder playlist
    pub fn delete_playlist(&mut self, id: &PlaylistId) -> PlaylistResult<()> {
        self.ensure_loaded()?;
        let playlist = self.user_playlist(id)?;

        let affected = match &playlist {
            Playlist::Virtual(p) => {
                self.store.delete_virtual_playlist(id)?;
                p.ordered_track_ids()
            }
            Playlist::Folder(_) => {
                self.store.delete_folder_playlist(id)?;
                self.folder_tracks.remove(id);
                Vec::new()
            }
            Playlist::All(_) => {
                return Err(PlaylistError::InvalidOperation(
                    "The all-music playlist cannot be deleted".to_string(),
                ))
            }
        };

        self.playlists.retain(|p| p.id() != id);
        self.membership = MembershipIndex::build(&self.playlists);
        self.publish_membership(&affected)?;
        Ok(())
    }

    /// Add a library track to a virtual playlist
    pub fn add_track_to_playlist(
        &mut self,
        track_id: &TrackId,
        playlist_id: &PlaylistId,
    ) -> PlaylistResult<Playlist> {
        self.ensure_loaded()?;
        if !self.library.contains(track_id) {
            return Err(PlaylistError::NotFound(format!("track {}", track_id)));
        }
        self.require_virtual(playlist_id)?;

        let updated = self
            .store
            .add_track_to_virtual_playlist(track_id, playlist_id)?;
        let updated = self.replace(updated);
        self.publish_membership(std::slice::from_ref(track_id))?;
        Ok(updated)
    }

    /// Remove a track from a virtual playlist
    pub fn remove_track_from_playlist(
        &mut self,
        track_id: &TrackId,
        playlist_id: &PlaylistId,
    ) -> PlaylistResult<Playlist> {
        self.ensure_loaded()?;
        self.require_virtual(playlist_id)?;

        let updated = self
            .store
            .remove_track_from_virtual_playlist(track_id, playlist_id)?;
        let updated = self.replace(updated);
        self.publish_membership(std::slice::from_ref(track_id))?;
        Ok(updated)
    }

    /// Drag-and-drop of a track onto a playlist.
    ///
    /// Only virtual playlists accept drops.
    pub fn drop_track_on_playlist(
        &mut self,
        track_id: &TrackId,
        playlist_id: &PlaylistId,
    ) -> PlaylistResult<Playlist> {
        self.ensure_loaded()?;
        let target = self
            .playlist(playlist_id)
            .ok_or_else(|| PlaylistError::NotFound(format!("playlist {}", playlist_id)))?;

        match target {
            Playlist::Virtual(_) => self.add_track_to_playlist(track_id, playlist_id),
            Playlist::Folder(_) | Playlist::All(_) => {
                log::debug!(
                    "drop_track_on_playlist: Rejected {} onto {} playlist",
                    track_id,
                    target.kind()
                );
                Err(PlaylistError::NotVirtual(playlist_id.to_string()))
            }
        }
    }

    /// Scan `dir` and keep it as a folder playlist.
    ///
    /// The name defaults to the directory's own name. Scanning happens before
    /// anything is stored, so an unreadable directory leaves no record.
    pub fn add_folder_playlist(
        &mut self,
        dir: &Path,
        name: Option<&str>,
    ) -> PlaylistResult<Playlist> {
        self.ensure_loaded()?;
        let default_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| dir.display().to_string());
        let name = self.available_name(name.unwrap_or(&default_name), None)?;

        let scanned = self.scanner.scan(dir)?;
        let created =
            self.store
                .create_folder_playlist(&name, dir, scanned.tracks.len(), Utc::now())?;

        self.folder_tracks.insert(created.id().clone(), scanned.tracks);
        self.playlists.push(created.clone());
        Ok(created)
    }

    /// Rebuild a folder playlist from its directory
    pub fn rescan_folder_playlist(&mut self, id: &PlaylistId) -> PlaylistResult<ScannedFolder> {
        self.ensure_loaded()?;
        let folder_path = match self.user_playlist(id)? {
            Playlist::Folder(p) => p.folder_path,
            Playlist::Virtual(_) | Playlist::All(_) => {
                return Err(PlaylistError::InvalidOperation(format!(
                    "{} is not a folder playlist",
                    id
                )))
            }
        };

        let scanned = self.scanner.scan(&folder_path)?;
        let recorded = self
            .store
            .record_folder_scan(id, scanned.tracks.len(), Utc::now())?;
        self.replace(recorded);
        self.folder_tracks.insert(id.clone(), scanned.tracks.clone());
        Ok(scanned)
    }

    /// Resolve a playlist into tracks, in playback order.
    ///
    /// Folder playlists that have not been scanned this session resolve to
    /// an empty list.
    pub fn playlist_tracks(&self, id: &PlaylistId) -> PlaylistResult<Vec<TrackMetadata>> {
        let playlist = self
            .playlist(id)
            .ok_or_else(|| PlaylistError::NotFound(format!("playlist {}", id)))?;

        let tracks = match playlist {
            Playlist::All(_) => self.library.tracks().to_vec(),
            Playlist::Virtual(p) => p
                .ordered_track_ids()
                .iter()
                .filter_map(|track_id| self.library.track(track_id).cloned())
                .collect(),
            Playlist::Folder(p) => self.folder_tracks.get(&p.id).cloned().unwrap_or_default(),
        };
        Ok(tracks)
    }

    /// Scope playback to a playlist and start at `start_index`.
    ///
    /// Folder playlists are scanned first if needed. The current playback
    /// scope is only replaced once the start index is known to be valid.
    pub fn play_playlist(&mut self, id: &PlaylistId, start_index: usize) -> PlaylistResult<()> {
        self.ensure_loaded()?;
        if let Some(Playlist::Folder(p)) = self.playlist(id) {
            if !self.folder_tracks.contains_key(&p.id) {
                self.rescan_folder_playlist(&p.id)?;
            }
        }

        let tracks = self.playlist_tracks(id)?;
        if tracks.is_empty() {
            return Err(PlaylistError::EmptyPlaylist(id.to_string()));
        }
        if start_index >= tracks.len() {
            return Err(PlaylistError::InvalidOperation(format!(
                "Track index {} out of range ({} tracks in {})",
                start_index,
                tracks.len(),
                id
            )));
        }

        log::info!("play_playlist: {} tracks from {}", tracks.len(), id);
        self.library.set_playback_scope(tracks);
        self.library.play_track(start_index)
    }

    /// Repair references between playlists and the library.
    ///
    /// Removes stored references to tracks that left the library, then
    /// rewrites every track's playlist list from the playlists, dropping ids
    /// of playlists that no longer exist.
    pub fn cleanup_invalid_playlist_references(&mut self) -> PlaylistResult<CleanupReport> {
        self.ensure_loaded()?;

        let dangling_references = {
            let library = &self.library;
            self.store.prune_tracks(&|id: &TrackId| library.contains(id))?
        };
        if dangling_references > 0 {
            for stored in self.store.get_all_playlists()? {
                if let Playlist::Virtual(_) = stored {
                    self.replace(stored);
                }
            }
        }

        let all_ids: Vec<TrackId> = self.library.tracks().iter().map(|t| t.id.clone()).collect();
        let tracks_repaired = self.publish_membership(&all_ids)?;

        let report = CleanupReport {
            dangling_references,
            tracks_repaired,
        };
        if report.is_clean() {
            log::info!("cleanup: Playlist references are consistent");
        } else {
            log::info!(
                "cleanup: Removed {} dangling references, repaired {} tracks",
                report.dangling_references,
                report.tracks_repaired
            );
        }
        Ok(report)
    }

    fn ensure_loaded(&self) -> PlaylistResult<()> {
        match self.state {
            ManagerState::Loaded => Ok(()),
            ManagerState::Loading => Err(PlaylistError::NotLoaded),
        }
    }

    /// Trimmed `name` if no other playlist uses it
    fn available_name(&self, name: &str, except: Option<&PlaylistId>) -> PlaylistResult<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(PlaylistError::InvalidName);
        }
        let taken = self
            .playlists()
            .iter()
            .any(|p| Some(p.id()) != except && p.has_name(trimmed));
        if taken {
            log::debug!("available_name: {:?} is taken", trimmed);
            return Err(PlaylistError::AlreadyExists(trimmed.to_string()));
        }
        Ok(trimmed.to_string())
    }

    /// A stored (non-synthesized) playlist by id
    fn user_playlist(&self, id: &PlaylistId) -> PlaylistResult<Playlist> {
        if id.is_all() {
            return Err(PlaylistError::InvalidOperation(
                "The all-music playlist cannot be modified".to_string(),
            ));
        }
        self.playlists
            .iter()
            .find(|p| p.id() == id)
            .cloned()
            .ok_or_else(|| PlaylistError::NotFound(format!("playlist {}", id)))
    }

    fn require_virtual(&self, id: &PlaylistId) -> PlaylistResult<()> {
        if id.is_all() {
            return Err(PlaylistError::NotVirtual(id.to_string()));
        }
        match self.user_playlist(id)? {
            Playlist::Virtual(_) => Ok(()),
            Playlist::Folder(_) | Playlist::All(_) => Err(PlaylistError::NotVirtual(id.to_string())),
        }
    }

    /// Swap a freshly stored record into memory and rebuild membership
    fn replace(&mut self, stored: Playlist) -> Playlist {
        let (visible, _) = self.without_dangling(stored);
        match self.playlists.iter_mut().find(|p| p.id() == visible.id()) {
            Some(slot) => *slot = visible.clone(),
            None => self.playlists.push(visible.clone()),
        }
        self.membership = MembershipIndex::build(&self.playlists);
        visible
    }

    /// Hide references to tracks the library does not know
    fn without_dangling(&self, playlist: Playlist) -> (Playlist, usize) {
        match playlist {
            Playlist::Virtual(mut p) => {
                let dropped = p.retain_tracks(|id| self.library.contains(id));
                (Playlist::Virtual(p), dropped)
            }
            other @ (Playlist::Folder(_) | Playlist::All(_)) => (other, 0),
        }
    }

    /// Write the derived playlist list onto each given library track whose
    /// cached list differs. Returns how many tracks changed.
    fn publish_membership(&mut self, track_ids: &[TrackId]) -> PlaylistResult<usize> {
        let mut changed = 0;
        for track_id in track_ids {
            let derived = self.membership.playlists_for(track_id).to_vec();
            let current = match self.library.track(track_id) {
                Some(track) => &track.virtual_playlists,
                None => continue,
            };
            if *current != derived {
                self.library
                    .update_track_metadata(track_id, TrackPatch::membership(derived))?;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

fn clean_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::InMemoryLibrary;
    use crate::playlist::LocalPlaylistStore;
    use crate::scanner::{DurationProbe, ProbeError, ScanConfig};
    use crate::storage::{KeyValueStore, MemoryStore, StorageError, StorageResult};
    use std::cell::Cell;
    use std::path::PathBuf;

    type TestManager = PlaylistManager<LocalPlaylistStore<MemoryStore>, InMemoryLibrary>;

    /// Key-value store whose writes can be switched to fail
    #[derive(Default)]
    struct FailingStore {
        inner: MemoryStore,
        fail_writes: Cell<bool>,
    }

    impl FailingStore {
        fn check(&self, key: &str) -> StorageResult<()> {
            if self.fail_writes.get() {
                return Err(StorageError::Io {
                    path: PathBuf::from(key),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            Ok(())
        }
    }

    impl KeyValueStore for FailingStore {
        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
            self.check(key)?;
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> StorageResult<()> {
            self.check(key)?;
            self.inner.remove(key)
        }
    }

    struct ZeroProbe;

    impl DurationProbe for ZeroProbe {
        fn duration_seconds(&self, _path: &Path) -> Result<f64, ProbeError> {
            Ok(0.0)
        }
    }

    fn library_of(ids: &[&str]) -> InMemoryLibrary {
        InMemoryLibrary::from_tracks(
            ids.iter()
                .map(|id| TrackMetadata::new(*id, format!("Title {}", id), "Artist"))
                .collect(),
        )
    }

    fn create_test_manager(ids: &[&str]) -> TestManager {
        let scanner = FolderScanner::with_probe(ScanConfig::default(), Box::new(ZeroProbe));
        let mut manager = PlaylistManager::with_scanner(
            LocalPlaylistStore::new(MemoryStore::new()),
            library_of(ids),
            scanner,
        );
        manager.load().unwrap();
        manager
    }

    fn writes(manager: &TestManager) -> usize {
        manager.store().kv().write_count()
    }

    #[test]
    fn test_mutations_require_load() {
        let mut manager = PlaylistManager::new(
            LocalPlaylistStore::new(MemoryStore::new()),
            InMemoryLibrary::new(),
        );
        assert_eq!(manager.state(), ManagerState::Loading);
        assert!(matches!(
            manager.create_playlist("Early", None),
            Err(PlaylistError::NotLoaded)
        ));

        manager.load().unwrap();
        assert_eq!(manager.state(), ManagerState::Loaded);
        assert!(manager.create_playlist("Early", None).is_ok());
    }

    #[test]
    fn test_all_playlist_tracks_library_size() {
        for n in [0usize, 1, 5] {
            let ids: Vec<String> = (0..n).map(|i| format!("t{}", i)).collect();
            let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
            let manager = create_test_manager(&refs);

            let playlists = manager.playlists();
            assert_eq!(playlists[0].kind(), crate::playlist::PlaylistKind::All);
            assert_eq!(playlists[0].track_count(), n);
        }
    }

    #[test]
    fn test_all_playlist_follows_library_changes() {
        let mut manager = create_test_manager(&["t1"]);
        manager
            .library_mut()
            .add_tracks(vec![TrackMetadata::new("t2", "Two", "B")]);
        assert_eq!(manager.all_playlist().track_count(), 2);

        manager.library_mut().remove_track(&TrackId::from("t1"));
        manager.library_mut().remove_track(&TrackId::from("t2"));
        assert_eq!(manager.all_playlist().track_count(), 0);
    }

    #[test]
    fn test_duplicate_name_rejected_without_storage_write() {
        let mut manager = create_test_manager(&[]);
        manager.create_playlist("Workout", None).unwrap();
        let before = writes(&manager);

        let err = manager.create_playlist("  workout ", None).unwrap_err();
        assert!(matches!(err, PlaylistError::AlreadyExists(_)));
        assert_eq!(writes(&manager), before);

        let err = manager.create_playlist("All Music", None).unwrap_err();
        assert!(matches!(err, PlaylistError::AlreadyExists(_)));
        assert_eq!(writes(&manager), before);
        assert_eq!(manager.playlists().len(), 2);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut manager = create_test_manager(&[]);
        assert!(matches!(
            manager.create_playlist("   ", None),
            Err(PlaylistError::InvalidName)
        ));
        assert_eq!(writes(&manager), 0);
    }

    #[test]
    fn test_workout_example() {
        let mut manager = create_test_manager(&["t1"]);
        let id = manager.create_playlist("Workout", None).unwrap().id().clone();
        let t1 = TrackId::from("t1");

        let added = manager.add_track_to_playlist(&t1, &id).unwrap();
        let p = added.as_virtual().unwrap();
        assert_eq!(p.track_count, 1);
        assert_eq!(p.tracks[0].track_id, t1);
        assert_eq!(p.tracks[0].order, 0);
        assert_eq!(manager.playlists_for_track(&t1), &[id.clone()]);
        assert_eq!(
            manager.library().track(&t1).unwrap().virtual_playlists,
            vec![id.clone()]
        );

        let removed = manager.remove_track_from_playlist(&t1, &id).unwrap();
        let p = removed.as_virtual().unwrap();
        assert_eq!(p.track_count, 0);
        assert!(p.tracks.is_empty());
        assert!(manager.playlists_for_track(&t1).is_empty());
        assert!(manager.library().track(&t1).unwrap().virtual_playlists.is_empty());
    }

    #[test]
    fn test_add_unknown_track_rejected() {
        let mut manager = create_test_manager(&[]);
        let id = manager.create_playlist("Mix", None).unwrap().id().clone();
        let before = writes(&manager);

        let err = manager
            .add_track_to_playlist(&TrackId::from("ghost"), &id)
            .unwrap_err();
        assert!(matches!(err, PlaylistError::NotFound(_)));
        assert_eq!(writes(&manager), before);
    }

    #[test]
    fn test_delete_keeps_other_counts() {
        let mut manager = create_test_manager(&["t1", "t2"]);
        let keep = manager.create_playlist("Keep", None).unwrap().id().clone();
        let gone = manager.create_playlist("Gone", None).unwrap().id().clone();
        manager.add_track_to_playlist(&TrackId::from("t1"), &keep).unwrap();
        manager.add_track_to_playlist(&TrackId::from("t2"), &keep).unwrap();
        manager.add_track_to_playlist(&TrackId::from("t1"), &gone).unwrap();

        manager.delete_playlist(&gone).unwrap();

        assert!(manager.playlist(&gone).is_none());
        assert_eq!(manager.playlist(&keep).unwrap().track_count(), 2);
        let stored = manager.store().get_all_playlists().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(
            manager.library().track(&TrackId::from("t1")).unwrap().virtual_playlists,
            vec![keep]
        );
    }

    #[test]
    fn test_all_playlist_cannot_be_deleted_or_renamed() {
        let mut manager = create_test_manager(&["t1"]);
        assert!(matches!(
            manager.delete_playlist(&PlaylistId::all()),
            Err(PlaylistError::InvalidOperation(_))
        ));
        assert!(matches!(
            manager.update_playlist(&PlaylistId::all(), PlaylistPatch::rename("Everything")),
            Err(PlaylistError::NotVirtual(_))
        ));
    }

    #[test]
    fn test_rename_checks_duplicates() {
        let mut manager = create_test_manager(&[]);
        let a = manager.create_playlist("Alpha", None).unwrap().id().clone();
        manager.create_playlist("Beta", None).unwrap();

        assert!(matches!(
            manager.update_playlist(&a, PlaylistPatch::rename("beta")),
            Err(PlaylistError::AlreadyExists(_))
        ));

        // Changing only the case of its own name is fine
        let renamed = manager.update_playlist(&a, PlaylistPatch::rename("ALPHA")).unwrap();
        assert_eq!(renamed.name(), "ALPHA");
        assert_eq!(manager.playlist(&a).unwrap().name(), "ALPHA");
    }

    #[test]
    fn test_description_is_trimmed() {
        let mut manager = create_test_manager(&[]);
        let created = manager.create_playlist("Chill", Some("  late nights ")).unwrap();
        assert_eq!(
            created.as_virtual().unwrap().description.as_deref(),
            Some("late nights")
        );

        let updated = manager
            .update_playlist(created.id(), PlaylistPatch::describe(Some("   ".to_string())))
            .unwrap();
        assert_eq!(updated.as_virtual().unwrap().description, None);
    }

    #[test]
    fn test_drop_only_onto_virtual() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"x").unwrap();

        let mut manager = create_test_manager(&["t1"]);
        let folder = manager.add_folder_playlist(dir.path(), Some("Inbox")).unwrap();
        let mix = manager.create_playlist("Mix", None).unwrap();
        let t1 = TrackId::from("t1");

        assert!(matches!(
            manager.drop_track_on_playlist(&t1, folder.id()),
            Err(PlaylistError::NotVirtual(_))
        ));
        assert!(matches!(
            manager.drop_track_on_playlist(&t1, &PlaylistId::all()),
            Err(PlaylistError::NotVirtual(_))
        ));
        assert!(matches!(
            manager.drop_track_on_playlist(&t1, &PlaylistId::new("missing")),
            Err(PlaylistError::NotFound(_))
        ));

        let dropped = manager.drop_track_on_playlist(&t1, mix.id()).unwrap();
        assert_eq!(dropped.track_count(), 1);
    }

    #[test]
    fn test_folder_playlist_scan_and_rescan() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Band - One.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"x").unwrap();

        let mut manager = create_test_manager(&[]);
        let folder = manager.add_folder_playlist(dir.path(), None).unwrap();
        assert_eq!(folder.track_count(), 1);
        assert!(folder.as_folder().unwrap().last_scanned.is_some());

        let tracks = manager.playlist_tracks(folder.id()).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "One");

        std::fs::write(dir.path().join("Band - Two.flac"), b"x").unwrap();
        let scanned = manager.rescan_folder_playlist(folder.id()).unwrap();
        assert_eq!(scanned.tracks.len(), 2);
        assert_eq!(scanned.total_files, 3);
        assert_eq!(manager.playlist(folder.id()).unwrap().track_count(), 2);

        // Folder name is taken now
        assert!(matches!(
            manager.add_folder_playlist(dir.path(), None),
            Err(PlaylistError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_folder_playlist_for_missing_dir_stores_nothing() {
        let mut manager = create_test_manager(&[]);
        let err = manager
            .add_folder_playlist(Path::new("/nonexistent/tunes"), None)
            .unwrap_err();
        assert!(matches!(err, PlaylistError::Scan(_)));
        assert_eq!(writes(&manager), 0);
    }

    #[test]
    fn test_play_playlist_scopes_playback() {
        let mut manager = create_test_manager(&["t1", "t2", "t3"]);
        let id = manager.create_playlist("Set", None).unwrap().id().clone();
        manager.add_track_to_playlist(&TrackId::from("t3"), &id).unwrap();
        manager.add_track_to_playlist(&TrackId::from("t1"), &id).unwrap();

        manager.play_playlist(&id, 1).unwrap();
        let scope: Vec<&str> = manager
            .library()
            .playback_scope()
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(scope, vec!["t3", "t1"]);
        assert_eq!(manager.library().now_playing().unwrap().id.as_str(), "t1");

        let empty = manager.create_playlist("Empty", None).unwrap().id().clone();
        assert!(matches!(
            manager.play_playlist(&empty, 0),
            Err(PlaylistError::EmptyPlaylist(_))
        ));

        manager.play_playlist(&PlaylistId::all(), 0).unwrap();
        assert_eq!(manager.library().playback_scope().len(), 3);
    }

    #[test]
    fn test_load_hides_dangling_references() {
        let mut store = LocalPlaylistStore::new(MemoryStore::new());
        let id = store.create_virtual_playlist("Old", None).unwrap().id().clone();
        store
            .add_track_to_virtual_playlist(&TrackId::from("t1"), &id)
            .unwrap();
        store
            .add_track_to_virtual_playlist(&TrackId::from("deleted"), &id)
            .unwrap();

        let mut manager = PlaylistManager::new(store, library_of(&["t1"]));
        manager.load().unwrap();

        let playlist = manager.playlist(&id).unwrap();
        assert_eq!(playlist.track_count(), 1);
        assert!(manager.playlists_for_track(&TrackId::from("deleted")).is_empty());
    }

    #[test]
    fn test_cleanup_prunes_and_repairs() {
        let mut manager = create_test_manager(&["t1", "t2"]);
        let id = manager.create_playlist("Mix", None).unwrap().id().clone();
        manager.add_track_to_playlist(&TrackId::from("t1"), &id).unwrap();
        manager.add_track_to_playlist(&TrackId::from("t2"), &id).unwrap();

        // Track leaves the library; a stale id is written onto another track
        manager.library_mut().remove_track(&TrackId::from("t2"));
        manager
            .library_mut()
            .update_track_metadata(
                &TrackId::from("t1"),
                TrackPatch::membership(vec![id.clone(), PlaylistId::new("vp-gone")]),
            )
            .unwrap();

        let report = manager.cleanup_invalid_playlist_references().unwrap();
        assert_eq!(report.dangling_references, 1);
        assert_eq!(report.tracks_repaired, 1);

        let stored = manager.store().get_all_playlists().unwrap();
        assert_eq!(stored[0].track_count(), 1);
        assert_eq!(
            manager.library().track(&TrackId::from("t1")).unwrap().virtual_playlists,
            vec![id]
        );

        assert!(manager.cleanup_invalid_playlist_references().unwrap().is_clean());
    }

    #[test]
    fn test_add_folder_playlist_is_one_write() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"x").unwrap();

        let mut manager = create_test_manager(&[]);
        manager.add_folder_playlist(dir.path(), None).unwrap();
        assert_eq!(writes(&manager), 1);

        let stored = manager.store().get_all_playlists().unwrap();
        let folder = stored[0].as_folder().unwrap();
        assert_eq!(folder.track_count, 1);
        assert!(folder.last_scanned.is_some());
    }

    #[test]
    fn test_play_out_of_range_keeps_current_playback() {
        let mut manager = create_test_manager(&["t1", "t2"]);
        let mix = manager.create_playlist("Mix", None).unwrap().id().clone();
        manager.add_track_to_playlist(&TrackId::from("t1"), &mix).unwrap();

        manager.play_playlist(&PlaylistId::all(), 1).unwrap();
        let err = manager.play_playlist(&mix, 5).unwrap_err();
        assert!(matches!(err, PlaylistError::InvalidOperation(_)));

        assert_eq!(manager.library().playback_scope().len(), 2);
        assert_eq!(manager.library().now_playing().unwrap().id.as_str(), "t2");
    }

    #[test]
    fn test_cleanup_keeps_scanned_folder_tracks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Band - Song.mp3"), b"x").unwrap();

        let mut manager = create_test_manager(&["t1", "t2"]);
        let folder = manager.add_folder_playlist(dir.path(), None).unwrap();
        let mix = manager.create_playlist("Mix", None).unwrap().id().clone();
        manager.add_track_to_playlist(&TrackId::from("t2"), &mix).unwrap();
        manager.library_mut().remove_track(&TrackId::from("t2"));

        let report = manager.cleanup_invalid_playlist_references().unwrap();
        assert_eq!(report.dangling_references, 1);

        assert_eq!(manager.state(), ManagerState::Loaded);
        assert_eq!(manager.playlist_tracks(folder.id()).unwrap().len(), 1);
        assert_eq!(manager.playlist(&mix).unwrap().track_count(), 0);
    }

    #[test]
    fn test_storage_failure_leaves_memory_untouched() {
        let kv = FailingStore::default();
        let mut manager = PlaylistManager::new(LocalPlaylistStore::new(kv), library_of(&["t1"]));
        manager.load().unwrap();
        let t1 = TrackId::from("t1");
        let keep = manager.create_playlist("Keep", None).unwrap().id().clone();
        let other = manager.create_playlist("Other", None).unwrap().id().clone();
        manager.add_track_to_playlist(&t1, &keep).unwrap();

        manager.store().kv().fail_writes.set(true);
        let before = manager.playlists();

        assert!(matches!(
            manager.create_playlist("New", None),
            Err(PlaylistError::Storage(_))
        ));
        assert!(matches!(
            manager.add_track_to_playlist(&t1, &other),
            Err(PlaylistError::Storage(_))
        ));
        assert!(matches!(
            manager.delete_playlist(&keep),
            Err(PlaylistError::Storage(_))
        ));

        assert_eq!(manager.playlists(), before);
        assert_eq!(manager.playlists_for_track(&t1), &[keep.clone()]);
        assert_eq!(
            manager.library().track(&t1).unwrap().virtual_playlists,
            vec![keep]
        );
    }

    #[test]
    fn test_find_by_id_or_name() {
        let mut manager = create_test_manager(&[]);
        let created = manager.create_playlist("Focus", None).unwrap();

        assert_eq!(manager.find(created.id().as_str()).unwrap().id(), created.id());
        assert_eq!(manager.find("focus").unwrap().id(), created.id());
        assert!(manager.find("all music").unwrap().id().is_all());
        assert!(manager.find("nothing").is_none());
    }
}
