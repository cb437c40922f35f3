//! Playlist error types

use thiserror::Error;

use crate::scanner::ScanError;
use crate::storage::StorageError;

/// Errors that can occur during playlist operations
#[derive(Error, Debug)]
pub enum PlaylistError {
    /// The manager has not read its playlists from storage yet
    #[error("Playlists are still loading")]
    NotLoaded,

    /// Playlist name is empty after trimming
    #[error("Playlist name cannot be empty")]
    InvalidName,

    /// A playlist with this name already exists
    #[error("Playlist already exists: {0}")]
    AlreadyExists(String),

    /// The requested playlist or track was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Track membership can only change on virtual playlists
    #[error("Playlist {0} is not a virtual playlist")]
    NotVirtual(String),

    /// Nothing to play
    #[error("Playlist {0} has no tracks")]
    EmptyPlaylist(String),

    /// Invalid operation attempted
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Playlist records could not be encoded
    #[error("Failed to serialize playlists: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Result type for playlist operations
pub type PlaylistResult<T> = Result<T, PlaylistError>;
