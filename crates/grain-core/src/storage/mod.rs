//! # Storage
//!
//! Key/blob storage for instance files. Keys are relative `/`-separated
//! paths such as `data/ledger.bin`.
//!
//! Two backends share one contract:
//! - `DiskStorage`: one file per key under a base directory, atomic writes
//! - `RedbStorage`: one row per key in a redb table
//!
//! Keys are normalised lexically and must stay inside the storage root.
//! A key that escapes it fails with `PathTraversal` before any I/O.

pub mod disk;
pub mod redb_store;

pub use disk::DiskStorage;
pub use redb_store::RedbStorage;

use crate::GrainError;
use std::path::{Component, Path, PathBuf};

/// Read access to stored blobs.
pub trait DataStorage {
    /// Fetch the blob at `key`; `NotFound` if absent.
    fn get(&self, key: &str) -> Result<Vec<u8>, GrainError>;
}

/// Read and write access to stored blobs.
pub trait WritableDataStorage: DataStorage {
    /// Store `value` at `key`, overwriting unconditionally.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), GrainError>;
}

/// Fetch `key`, falling back to `default` when it is absent.
///
/// Every other error propagates.
pub fn load_or_default<S: DataStorage + ?Sized>(
    storage: &S,
    key: &str,
    default: Vec<u8>,
) -> Result<Vec<u8>, GrainError> {
    match storage.get(key) {
        Ok(bytes) => Ok(bytes),
        Err(GrainError::NotFound(_)) => Ok(default),
        Err(e) => Err(e),
    }
}

/// Lexically normalise `key` into a path relative to the storage root.
///
/// `.` components vanish and `..` pops the previous component. Absolute
/// keys, prefixes, and `..` past the root are rejected, as is a key that
/// normalises to the root itself.
pub fn normalize_key(key: &str) -> Result<PathBuf, GrainError> {
    let traversal = || GrainError::PathTraversal(key.to_string());
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(key).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop().ok_or_else(traversal)?;
            }
            Component::RootDir | Component::Prefix(_) => return Err(traversal()),
        }
    }
    if parts.is_empty() {
        return Err(traversal());
    }
    Ok(parts.into_iter().collect())
}
