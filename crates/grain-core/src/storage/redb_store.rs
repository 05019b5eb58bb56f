//! # redb-backed Storage
//!
//! Keeps every blob as one row of a single redb table, giving the state
//! files of an instance ACID commits and crash safety in one database file.
//!
//! Keys go through the same normalisation as `DiskStorage`, so both
//! backends accept and reject exactly the same keys.

use crate::GrainError;
use crate::storage::{DataStorage, WritableDataStorage, normalize_key};
use redb::{Database, ReadableDatabase, TableDefinition};
use std::path::Path;
use tracing::debug;

/// Table for blobs: normalised key -> raw bytes
const BLOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");

pub struct RedbStorage {
    db: Database,
}

impl std::fmt::Debug for RedbStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStorage").finish_non_exhaustive()
    }
}

/// Normalised key in `/`-separated form.
fn table_key(key: &str) -> Result<String, GrainError> {
    let path = normalize_key(key)?;
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

impl RedbStorage {
    /// Open or create a storage database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GrainError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| GrainError::IoError(e.to_string()))?;

        // Create the table up front so reads never see a missing table.
        let write_txn = db
            .begin_write()
            .map_err(|e| GrainError::IoError(e.to_string()))?;
        let _ = write_txn
            .open_table(BLOBS)
            .map_err(|e| GrainError::IoError(e.to_string()))?;
        write_txn
            .commit()
            .map_err(|e| GrainError::IoError(e.to_string()))?;

        Ok(Self { db })
    }
}

impl DataStorage for RedbStorage {
    fn get(&self, key: &str) -> Result<Vec<u8>, GrainError> {
        let table_key = table_key(key)?;
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| GrainError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(BLOBS)
            .map_err(|e| GrainError::IoError(e.to_string()))?;
        let value = table
            .get(table_key.as_str())
            .map_err(|e| GrainError::IoError(e.to_string()))?;
        value
            .map(|guard| guard.value().to_vec())
            .ok_or_else(|| GrainError::NotFound(key.to_string()))
    }
}

impl WritableDataStorage for RedbStorage {
    fn set(&self, key: &str, value: &[u8]) -> Result<(), GrainError> {
        let table_key = table_key(key)?;
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| GrainError::IoError(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(BLOBS)
                .map_err(|e| GrainError::IoError(e.to_string()))?;
            table
                .insert(table_key.as_str(), value)
                .map_err(|e| GrainError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| GrainError::IoError(e.to_string()))?;

        debug!(key = %table_key, bytes = value.len(), "Stored blob in redb");
        Ok(())
    }
}
