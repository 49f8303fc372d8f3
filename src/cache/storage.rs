//! Backing storage for the response cache.
//!
//! All file I/O the cache performs goes through [`CacheStorage`]. There is no
//! locking: two processes writing the same file race and the last writer wins.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// Raw byte-level access to a cache's persisted form.
pub trait CacheStorage: Send {
    /// Where the data lives, for logging and `cache stats`.
    fn location(&self) -> &Path;

    fn exists(&self) -> bool;

    /// Read the full contents as raw bytes. Decoding is left to the caller
    /// so that bad encoding is reported as corruption, not as an I/O error.
    fn read(&self) -> Result<Vec<u8>>;

    /// Replace the full contents, creating parent directories as needed.
    fn write(&self, contents: &str) -> Result<()>;

    /// Delete the backing data. Returns `false` if there was nothing to delete.
    fn remove(&self) -> Result<bool>;
}

/// A single JSON file on the local filesystem.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CacheStorage for JsonFileStorage {
    fn location(&self) -> &Path {
        &self.path
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }

    fn write(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, contents)?;
        debug!(path = %self.path.display(), bytes = contents.len(), "Cache file written");
        Ok(())
    }

    fn remove(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
