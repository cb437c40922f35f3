//! Tunebox Core - Playlist storage and library state for the tunebox player

pub mod config;
pub mod library;
pub mod manager;
pub mod playlist;
pub mod scanner;
pub mod storage;
pub mod types;

pub use library::{InMemoryLibrary, TrackLibrary};
pub use manager::{CleanupReport, ManagerState, PlaylistManager};
pub use playlist::{LocalPlaylistStore, Playlist, PlaylistError, PlaylistStore};
pub use scanner::{FolderScanner, ScannedFolder};
pub use storage::{DirectoryStore, KeyValueStore, MemoryStore};
pub use types::*;
