//! SQLite-backed key/value store for the bot's authorization state.
//!
//! Two keys are used in practice: `"admin"` (the administrator's Telegram id)
//! and `"users"` (the permitted id set). Values are JSON-encoded. Every
//! `read`/`write` call executes exactly one statement, so SQLite's
//! per-statement atomicity gives the required transaction boundary: a reader
//! never observes a partial write.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::OptionalExtension;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Durable key/value store.
///
/// Single-process assumption: callers within one process are serialized
/// behind the connection mutex, and AccessControl issues at most one store
/// call per event.
pub struct AuthStore {
    conn: Mutex<rusqlite::Connection>,
}

impl AuthStore {
    /// Open (or create) the store at the given path.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create storage directory {}", parent.display())
                })?;
            }
        }
        let conn = rusqlite::Connection::open(db_path)
            .with_context(|| format!("Failed to open auth store at {}", db_path.display()))?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")?;
        Self::init_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Self::init_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_tables(conn: &rusqlite::Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Read and decode the value stored under `key`, if any.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read key '{key}' from auth store"))?;
        match raw {
            Some(json) => {
                let value = serde_json::from_str(&json)
                    .with_context(|| format!("Corrupt value under key '{key}' in auth store"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Encode and store `value` under `key`, replacing any previous value.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, json],
        )
        .with_context(|| format!("Failed to write key '{key}' to auth store"))?;
        Ok(())
    }
}
