//! SqliteLegacy — SQLite-backed legacy store.
//!
//! A single `meta(key, value)` table holds the JSON payload under
//! [`STORAGE_KEY`](super::STORAGE_KEY). Uses rusqlite (bundled); the
//! connection lives behind a `parking_lot::Mutex` since every operation is a
//! single statement.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::LocalError;
use crate::types::CountryCode;

use super::{parse_payload, LegacyStore, STORAGE_KEY};

/// SQLite `LegacyStore` implementation.
pub struct SqliteLegacy {
    conn: Mutex<Connection>,
}

impl SqliteLegacy {
    /// Open a file-backed store, creating the `meta` table if needed.
    pub fn open(path: &str) -> Result<Self, LocalError> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory store (useful for tests).
    pub fn open_in_memory() -> Result<Self, LocalError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, LocalError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meta (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Write a visited set as the legacy payload. Device shims use this to
    /// mirror what the pre-cloud clients wrote; tests use it for seeding.
    pub fn store(&self, codes: &BTreeSet<CountryCode>) -> Result<(), LocalError> {
        let payload = serde_json::Value::Array(
            codes
                .iter()
                .map(|c| serde_json::Value::String(c.as_str().to_string()))
                .collect(),
        );
        self.conn.lock().execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![STORAGE_KEY, payload.to_string()],
        )?;
        Ok(())
    }
}

impl LegacyStore for SqliteLegacy {
    fn load(&self) -> Result<BTreeSet<CountryCode>, LocalError> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![STORAGE_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.as_deref().map(parse_payload).unwrap_or_default())
    }

    fn clear(&self) -> Result<(), LocalError> {
        self.conn
            .lock()
            .execute("DELETE FROM meta WHERE key = ?1", params![STORAGE_KEY])?;
        Ok(())
    }
}
