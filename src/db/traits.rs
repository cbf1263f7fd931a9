// Seen-set trait: backend-agnostic async interface for the dedup store.
//
// The monitor loop only ever inserts and checks existence; count/recent
// exist for the status report and the status endpoint. Methods are async so
// the synchronous rusqlite backend (behind a Mutex) and any future native
// async backend fit the same interface.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::SeenShowing;

#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Has this fingerprint already been alerted on?
    async fn exists(&self, fingerprint: &str) -> Result<bool>;

    /// Record a fingerprint. Must not fail when the key is already present.
    async fn insert(&self, fingerprint: &str, observed_at: DateTime<Utc>) -> Result<()>;

    /// Number of fingerprints recorded so far.
    async fn count(&self) -> Result<u64>;

    /// Most recently recorded entries, newest first.
    async fn recent(&self, limit: u32) -> Result<Vec<SeenShowing>>;
}
