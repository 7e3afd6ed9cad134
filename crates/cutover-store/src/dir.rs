//! Directory-backed store
//!
//! One file per key under a root directory. Writes go through a temp file
//! and a rename so readers never observe a torn value.

use crate::error::StoreError;
use crate::Store;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File-per-key store rooted at a directory
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Open (creating if needed) a store rooted at `root`
    ///
    /// # Errors
    /// [`StoreError::Io`] when the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Directory this store writes into
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        // Keys are dotted identifiers; anything path-like is rejected so a
        // key can never escape the root.
        if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl Store for DirStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_creates_the_root_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested/state");
        let store = DirStore::open(&root).unwrap();
        assert!(store.root().is_dir());
    }

    #[test]
    fn get_returns_none_before_first_put() {
        let dir = TempDir::new().unwrap();
        let store = DirStore::open(dir.path()).unwrap();
        assert_eq!(store.get("cutover.config").unwrap(), None);
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = DirStore::open(dir.path()).unwrap();
        store.put("cutover.config", "{\"a\":1}").unwrap();
        assert_eq!(
            store.get("cutover.config").unwrap().as_deref(),
            Some("{\"a\":1}")
        );
    }

    #[test]
    fn values_survive_reopening() {
        let dir = TempDir::new().unwrap();
        {
            let store = DirStore::open(dir.path()).unwrap();
            store.put("cutover.samples", "[]").unwrap();
        }
        let store = DirStore::open(dir.path()).unwrap();
        assert_eq!(store.get("cutover.samples").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn path_like_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = DirStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.put("../escape", "x"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(
            store.get("a/b"),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn remove_deletes_the_backing_file() {
        let dir = TempDir::new().unwrap();
        let store = DirStore::open(dir.path()).unwrap();
        store.put("cutover.config", "{}").unwrap();
        store.remove("cutover.config").unwrap();
        assert_eq!(store.get("cutover.config").unwrap(), None);
        store.remove("cutover.config").unwrap();
    }
}
