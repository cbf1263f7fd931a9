// SqliteSeenStore: rusqlite backend implementing the SeenStore trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// Each insert is its own statement, so atomicity is per fingerprint.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::SeenShowing;
use super::traits::SeenStore;

pub struct SqliteSeenStore {
    conn: Mutex<Connection>,
}

impl SqliteSeenStore {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Fresh in-memory store with the schema applied.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        super::schema::create_tables(&conn)?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl SeenStore for SqliteSeenStore {
    async fn exists(&self, fingerprint: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::seen_exists(&conn, fingerprint)
    }

    async fn insert(&self, fingerprint: &str, observed_at: DateTime<Utc>) -> Result<()> {
        let stamp = observed_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        let conn = self.conn.lock().await;
        super::queries::insert_seen(&conn, fingerprint, &stamp)
    }

    async fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().await;
        super::queries::seen_count(&conn)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<SeenShowing>> {
        let conn = self.conn.lock().await;
        super::queries::recent_seen(&conn, limit)
    }
}
