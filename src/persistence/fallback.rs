//! Fallback tier: a synchronous string store.
//!
//! Modeled on a browser-style string key/value store: no structure, one
//! serialized value per key, always available but small and slow. Used when
//! the durable tier misses or fails, and for synchronous warm starts.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;

use crate::error::CacheError;

/// Synchronous string key/value contract of the fallback tier.
pub trait FallbackStore: Send + Sync + fmt::Debug {
    /// Reads the item under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Fallback`] when the store cannot be accessed.
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Replaces the item under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Fallback`] when the write fails.
    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Removes the item under `key`; a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Fallback`] when the removal fails.
    fn remove_item(&self, key: &str) -> Result<(), CacheError>;
}

/// Fallback store that holds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallbackStore;

impl FallbackStore for NoFallbackStore {
    fn get_item(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), CacheError> {
        Ok(())
    }

    fn remove_item(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Fallback store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryFallbackStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryFallbackStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FallbackStore for MemoryFallbackStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

/// Fallback store keeping one file per key in a directory.
///
/// Writes go to a uniquely named temporary sibling first and are renamed
/// into place, so a reader sees either the previous value or the new one,
/// even with several processes writing the same directory.
#[derive(Debug, Clone)]
pub struct FileFallbackStore {
    dir: PathBuf,
}

impl FileFallbackStore {
    /// Uses `dir` as the store root. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CacheError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(CacheError::Fallback(format!("invalid key {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl FallbackStore for FileFallbackStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|err| CacheError::from(err.error))?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), CacheError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn file_store_round_trips_items() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let store = FileFallbackStore::new(dir.path().join("nested"));

        assert!(matches!(store.get_item("vehicles_cache_v1"), Ok(None)));
        assert!(store.set_item("vehicles_cache_v1", "{\"a\":1}").is_ok());
        let Ok(Some(text)) = store.get_item("vehicles_cache_v1") else {
            panic!("item should exist");
        };
        assert_eq!(text, "{\"a\":1}");

        assert!(store.remove_item("vehicles_cache_v1").is_ok());
        assert!(matches!(store.get_item("vehicles_cache_v1"), Ok(None)));
        assert!(store.remove_item("vehicles_cache_v1").is_ok());
    }

    #[test]
    fn file_store_replaces_without_leftover_temp_files() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let store = FileFallbackStore::new(dir.path());
        assert!(store.set_item("vehicle_buckets_v1", "[1]").is_ok());
        assert!(store.set_item("vehicle_buckets_v1", "[1,2]").is_ok());

        let Ok(Some(text)) = store.get_item("vehicle_buckets_v1") else {
            panic!("item should exist");
        };
        assert_eq!(text, "[1,2]");
        let Ok(entries) = fs::read_dir(dir.path()) else {
            panic!("read_dir");
        };
        assert_eq!(entries.count(), 1);
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let store = FileFallbackStore::new("/tmp/unused");
        assert!(store.get_item("../etc/passwd").is_err());
        assert!(store.set_item("", "x").is_err());
    }

    #[test]
    fn memory_store_overwrites() {
        let store = MemoryFallbackStore::new();
        let _ = store.set_item("k", "1");
        let _ = store.set_item("k", "2");
        assert_eq!(store.get_item("k").ok().flatten().as_deref(), Some("2"));
    }
}
