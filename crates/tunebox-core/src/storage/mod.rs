//! String key-value persistence
//!
//! Playlist records are kept as one serialized value under a fixed key.
//! This module provides the trait the playlist store writes through and two
//! backends:
//! - [`DirectoryStore`]: one file per key inside a data directory
//! - [`MemoryStore`]: a plain map, for tests and embedding

mod directory;
mod error;
mod memory;

pub use directory::DirectoryStore;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;

/// Minimal string key-value store.
///
/// Every value is read and written whole; there are no partial updates.
pub trait KeyValueStore: Send {
    /// Read the value stored under `key`, or `None` if nothing is stored
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove the value under `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> StorageResult<()>;
}

/// Check that a key is usable as a file name on every platform
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
