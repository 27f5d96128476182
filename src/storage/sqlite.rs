//! Implements a SQLite backed storage backend.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use rusqlite::{Connection, OptionalExtension};

use crate::error::Error;

use super::StorageBackend;

/// Persists snapshots in a single key/value table in a SQLite database.
///
/// The replica owns all query semantics, so the schema is deliberately a
/// plain blob table keyed by namespace. Clones share the same connection.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (creating if necessary) the snapshot database at `path`.
    ///
    /// # Errors
    /// Returns [Error::Persistence] if the database cannot be opened or the
    /// snapshot table cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let connection = Connection::open(path)?;

        Self::new(connection)
    }

    /// Wrap an existing connection, creating the snapshot table if it is
    /// missing.
    ///
    /// # Errors
    /// Returns [Error::Persistence] if the snapshot table cannot be created.
    pub fn new(connection: Connection) -> Result<Self, Error> {
        create_snapshot_table(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }
}

/// Create the snapshot table in the database.
fn create_snapshot_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS snapshot (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

impl StorageBackend for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let value = self
            .connection
            .lock()
            .unwrap()
            .prepare("SELECT value FROM snapshot WHERE key = :key")?
            .query_row(&[(":key", &key)], |row| row.get(0))
            .optional()?;

        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.connection.lock().unwrap().execute(
            "INSERT INTO snapshot (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, value),
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod sqlite_storage_tests {
    use rusqlite::Connection;

    use super::{SqliteStorage, StorageBackend};

    fn get_test_storage() -> SqliteStorage {
        let conn = Connection::open_in_memory().unwrap();
        SqliteStorage::new(conn).unwrap()
    }

    #[test]
    fn get_returns_none_for_missing_key() {
        let storage = get_test_storage();

        assert_eq!(storage.get("ledger/transactions/acme"), Ok(None));
    }

    #[test]
    fn set_then_get_roundtrips() {
        let storage = get_test_storage();

        storage
            .set("ledger/transactions/acme", "[{\"id\":\"t1\"}]")
            .unwrap();

        assert_eq!(
            storage.get("ledger/transactions/acme"),
            Ok(Some("[{\"id\":\"t1\"}]".to_owned()))
        );
    }

    #[test]
    fn set_replaces_previous_value() {
        let storage = get_test_storage();
        storage.set("ledger/sync-token/acme", "\"t-1\"").unwrap();

        storage.set("ledger/sync-token/acme", "\"t-2\"").unwrap();

        assert_eq!(
            storage.get("ledger/sync-token/acme"),
            Ok(Some("\"t-2\"".to_owned()))
        );
    }

    #[test]
    fn keys_are_independent() {
        let storage = get_test_storage();

        storage.set("ledger/transactions/acme", "[]").unwrap();
        storage.set("ledger/transactions/globex", "[1]").unwrap();

        assert_eq!(
            storage.get("ledger/transactions/acme"),
            Ok(Some("[]".to_owned()))
        );
        assert_eq!(
            storage.get("ledger/transactions/globex"),
            Ok(Some("[1]".to_owned()))
        );
    }

    #[test]
    fn clones_share_the_same_database() {
        let storage = get_test_storage();
        let clone = storage.clone();

        storage.set("key", "value").unwrap();

        assert_eq!(clone.get("key"), Ok(Some("value".to_owned())));
    }
}
