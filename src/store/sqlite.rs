use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{FeedwellError, Result};
use crate::store::KvStore;

/// Persistent key-value store backed by a single SQLite table.
///
/// Rows carry an absolute expiry in epoch milliseconds. Expired rows are
/// ignored on read and deleted on open and on every write.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    min_ttl_secs: u64,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    pub fn with_min_ttl(mut self, min_ttl_secs: u64) -> Self {
        self.min_ttl_secs = min_ttl_secs;
        self
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            min_ttl_secs: 60,
        };
        store.run_migrations()?;
        store.purge_expired()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FeedwellError::Store(format!("connection lock poisoned: {}", e)))
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| FeedwellError::Store(format!("migration failed: {}", e)))?;

        Ok(())
    }

    /// Delete every expired row, returning how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let conn = self.conn()?;
        purge_expired_at(&conn, Utc::now().timestamp_millis())
    }

    fn get_at(&self, key: &str, now_ms: i64) -> Result<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1 AND expires_at > ?2",
                params![key, now_ms],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put_at(&self, key: &str, value: &str, ttl_secs: u64, now_ms: i64) -> Result<()> {
        let ttl_ms = i64::try_from(ttl_secs.max(self.min_ttl_secs).saturating_mul(1000))
            .unwrap_or(i64::MAX);
        let expires_at = now_ms.saturating_add(ttl_ms);

        let conn = self.conn()?;
        purge_expired_at(&conn, now_ms)?;
        conn.execute(
            "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
            params![key, value, expires_at],
        )?;
        Ok(())
    }
}

fn purge_expired_at(conn: &Connection, now_ms: i64) -> Result<usize> {
    let removed = conn.execute("DELETE FROM kv WHERE expires_at <= ?1", params![now_ms])?;
    Ok(removed)
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_at(key, Utc::now().timestamp_millis())
    }

    async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.put_at(key, value, ttl_secs, Utc::now().timestamp_millis())
    }

    fn min_ttl_secs(&self) -> u64 {
        self.min_ttl_secs
    }
}
