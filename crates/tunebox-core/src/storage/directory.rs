//! File-backed key-value store
//!
//! Each key maps to `<root>/<key>.json`. Writes go to a temporary file in the
//! same directory which then replaces the target, so a crash mid-write leaves
//! the previous value intact.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::{validate_key, KeyValueStore, StorageError, StorageResult};

/// Key-value store keeping one file per key under a root directory.
///
/// Directory structure:
/// ```text
/// root/
/// ├── virtual-playlists.json
/// └── library.json
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            path: root.clone(),
            source,
        })?;
        log::debug!("DirectoryStore::open: {:?}", root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path backing a key
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

impl KeyValueStore for DirectoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        validate_key(key)?;
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        validate_key(key)?;
        let path = self.path_for(key);

        let mut staged = tempfile::NamedTempFile::new_in(&self.root).map_err(|source| {
            StorageError::Io {
                path: self.root.clone(),
                source,
            }
        })?;
        staged
            .write_all(value.as_bytes())
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|source| StorageError::Io {
                path: staged.path().to_path_buf(),
                source,
            })?;
        staged.persist(&path).map_err(|e| StorageError::Persist {
            path: path.clone(),
            source: e.error,
        })?;

        log::debug!("DirectoryStore::set: wrote {} bytes to {:?}", value.len(), path);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}
