//! # Disk Storage
//!
//! One file per key under a base directory.
//!
//! Writes go to a temporary file in the target directory, are synced, and
//! then renamed over the destination, so readers see either the old or the
//! new contents and a failed write leaves no partial file behind.

use crate::GrainError;
use crate::storage::{DataStorage, WritableDataStorage, normalize_key};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DiskStorage {
    base_path: PathBuf,
}

impl DiskStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Absolute location of `key`, confined to the base directory.
    pub fn resolve(&self, key: &str) -> Result<PathBuf, GrainError> {
        Ok(self.base_path.join(normalize_key(key)?))
    }
}

impl DataStorage for DiskStorage {
    fn get(&self, key: &str) -> Result<Vec<u8>, GrainError> {
        let path = self.resolve(key)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => GrainError::NotFound(key.to_string()),
            _ => GrainError::IoError(format!("read {}: {}", path.display(), e)),
        })
    }
}

impl WritableDataStorage for DiskStorage {
    fn set(&self, key: &str, value: &[u8]) -> Result<(), GrainError> {
        let path = self.resolve(key)?;
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.base_path.clone());
        let io = |what: &str, e: std::io::Error| {
            GrainError::IoError(format!("{} {}: {}", what, path.display(), e))
        };

        fs::create_dir_all(&parent).map_err(|e| io("create parent of", e))?;
        let mut temp = NamedTempFile::new_in(&parent).map_err(|e| io("create temp for", e))?;
        temp.write_all(value).map_err(|e| io("write temp for", e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| io("sync temp for", e))?;
        temp.persist(&path).map_err(|e| io("persist", e.error))?;

        debug!(key, bytes = value.len(), "Stored blob on disk");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DiskStorage) {
        let dir = TempDir::new().expect("tempdir");
        let storage = DiskStorage::new(dir.path());
        (dir, storage)
    }

    #[test]
    fn set_then_get() {
        let (_dir, storage) = setup();
        storage.set("data/ledger.bin", b"abc").expect("set");
        assert_eq!(storage.get("data/ledger.bin").expect("get"), b"abc");

        storage.set("data/ledger.bin", b"xy").expect("overwrite");
        assert_eq!(storage.get("./data/ledger.bin").expect("get"), b"xy");
    }

    #[test]
    fn missing_key_is_not_found() {
        let (_dir, storage) = setup();
        assert!(matches!(
            storage.get("output/accounts.json"),
            Err(GrainError::NotFound(key)) if key == "output/accounts.json"
        ));
    }

    #[test]
    fn escaping_set_touches_nothing() {
        let (dir, storage) = setup();
        let inner = DiskStorage::new(dir.path().join("instance"));

        let result = inner.set("../outside.txt", b"nope");
        assert!(matches!(result, Err(GrainError::PathTraversal(_))));
        assert!(!dir.path().join("outside.txt").exists());
        assert!(!dir.path().join("instance").exists());

        assert!(matches!(
            storage.get("../../etc/passwd"),
            Err(GrainError::PathTraversal(_))
        ));
    }

    #[test]
    fn no_temp_files_left_behind() {
        let (dir, storage) = setup();
        storage.set("config/a.json", b"{}").expect("set");
        let names: Vec<_> = fs::read_dir(dir.path().join("config"))
            .expect("read dir")
            .map(|e| e.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("a.json")]);
    }
}
