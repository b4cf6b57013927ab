//! Stat Store
//!
//! The narrow durable key-value primitive the ledger writes through.
//! Values are opaque serialized documents; the ledger owns the schema.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

/// Why a store operation failed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing medium could not be read.
    #[error("store read failed: {0}")]
    ReadFailed(String),

    /// The backing medium could not be written.
    #[error("store write failed: {0}")]
    WriteFailed(String),

    /// The backing document is not decodable.
    #[error("store data corrupted: {0}")]
    CorruptedData(String),
}

/// Durable string key-value persistence.
///
/// Implementations must make a `set` visible to every later `get`, but
/// are free to be best-effort across process crashes; the ledger treats
/// in-memory state as the source of truth and self-heals the store on
/// the next write.
pub trait StatStore {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-process store. The default for tests and for embedders that
/// handle persistence themselves.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// Single-file store: one JSON document mapping keys to values.
///
/// Every `set` rewrites the whole document, which keeps the format
/// trivially inspectable and makes partial writes impossible to
/// observe through `get` after a clean reload.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by the given file. The file is created on
    /// first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_document(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(StoreError::ReadFailed(e.to_string())),
        };

        serde_json::from_str(&raw).map_err(|e| StoreError::CorruptedData(e.to_string()))
    }
}

impl StatStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_document()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut document = match self.read_document() {
            Ok(document) => document,
            Err(e) => {
                // A corrupted document is replaced wholesale; the next
                // write carries full state anyway.
                warn!("discarding unreadable store document: {}", e);
                BTreeMap::new()
            }
        };

        document.insert(key.to_string(), value.to_string());

        let encoded = serde_json::to_string_pretty(&document)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        fs::write(&self.path, encoded).map_err(|e| StoreError::WriteFailed(e.to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
