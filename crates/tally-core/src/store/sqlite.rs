//! SQLite-backed store: one kv table in a single database file.
//!
//! WAL mode plus a busy timeout so a concurrently running reader (e.g. a
//! second `tally stats` invocation racing the lock release) degrades to a
//! short wait instead of an error.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use super::{Store, StoreError};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";

/// Store implementation over a single SQLite file.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(backend)?;
        Self::prepare(conn)
    }

    /// An in-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        Self::prepare(conn)
    }

    fn prepare(conn: Connection) -> Result<Self, StoreError> {
        // journal_mode returns the resulting mode as a row, so it goes
        // through query_row rather than pragma_update.
        conn.query_row("PRAGMA journal_mode = WAL", [], |_row| Ok(()))
            .map_err(backend)?;
        conn.pragma_update(None, "busy_timeout", 5_000)
            .map_err(backend)?;
        conn.execute(SCHEMA, []).map_err(backend)?;
        Ok(Self { conn })
    }
}

impl Store for SqliteStore {
    fn save(&mut self, key: &str, json: &str) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, json],
            )
            .map_err(backend)?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(backend)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(backend)?;
        Ok(())
    }
}

fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_remove_roundtrip() {
        let mut store = SqliteStore::open_in_memory().expect("open");
        assert_eq!(store.load("k").expect("load"), None);

        store.save("k", "{\"v\":1}").expect("save");
        assert_eq!(store.load("k").expect("load"), Some("{\"v\":1}".to_string()));

        store.save("k", "{\"v\":2}").expect("overwrite");
        assert_eq!(store.load("k").expect("load"), Some("{\"v\":2}".to_string()));

        store.remove("k").expect("remove");
        assert_eq!(store.load("k").expect("load"), None);
    }

    #[test]
    fn keys_are_independent() {
        let mut store = SqliteStore::open_in_memory().expect("open");
        store.save("a", "1").expect("save");
        store.save("b", "2").expect("save");
        store.remove("a").expect("remove");
        assert_eq!(store.load("b").expect("load"), Some("2".to_string()));
    }

    #[test]
    fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("tally.db");
        {
            let mut store = SqliteStore::open(&path).expect("open");
            store.save("k", "persisted").expect("save");
        }
        let store = SqliteStore::open(&path).expect("reopen");
        assert_eq!(store.load("k").expect("load"), Some("persisted".to_string()));
    }
}
