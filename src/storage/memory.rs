//! An in-memory storage backend.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::error::Error;

use super::StorageBackend;

/// Stores snapshots in a process-local map.
///
/// Clones share the same underlying map, mirroring how the SQLite backend
/// shares one connection. Data does not survive the process; use
/// [SqliteStorage](super::SqliteStorage) for durable sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blobs: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.blobs.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());

        Ok(())
    }
}
