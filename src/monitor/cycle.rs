// Poll cycle: scrape, diff against the seen set, persist, notify.
//
// Fingerprints are written before any channel is called. A showing whose
// delivery failed stays marked as seen and is not alerted again.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::status::{CycleOutcome, MonitorStatus};
use crate::db::SeenStore;
use crate::notify::Notifier;
use crate::scrape::ShowingSource;
use crate::showing::ShowingRow;

pub struct ShowingsMonitor {
    source: Arc<dyn ShowingSource>,
    store: Arc<dyn SeenStore>,
    notifiers: Vec<Arc<dyn Notifier>>,
    status: Arc<RwLock<MonitorStatus>>,
}

impl ShowingsMonitor {
    pub fn new(
        source: Arc<dyn ShowingSource>,
        store: Arc<dyn SeenStore>,
        notifiers: Vec<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            source,
            store,
            notifiers,
            status: Arc::new(RwLock::new(MonitorStatus::default())),
        }
    }

    /// Shared status handle, for the web server.
    pub fn status(&self) -> Arc<RwLock<MonitorStatus>> {
        self.status.clone()
    }

    /// Run one poll cycle. Never fails: every error ends up in the outcome.
    pub async fn run_cycle(&self) -> CycleOutcome {
        {
            let mut s = self.status.write().await;
            s.running = true;
            s.last_started_at = Some(Utc::now().to_rfc3339());
        }

        let outcome = self.poll().await;

        let mut s = self.status.write().await;
        s.running = false;
        s.cycles_run += 1;
        s.last_finished_at = Some(Utc::now().to_rfc3339());
        s.total_notified += outcome.new_count() as u64;
        s.last_error = match &outcome {
            CycleOutcome::ExtractionFailed { reason } | CycleOutcome::StoreFailed { reason } => {
                Some(reason.clone())
            }
            _ => None,
        };
        s.last_outcome = Some(outcome.clone());
        outcome
    }

    async fn poll(&self) -> CycleOutcome {
        let showings = match self.source.fetch_showings().await {
            Ok(showings) => showings,
            Err(e) => {
                error!(error = %e, structural = e.is_structural(), "Poll failed");
                return CycleOutcome::ExtractionFailed {
                    reason: e.to_string(),
                };
            }
        };

        if showings.is_empty() {
            info!("No showings returned (0 rows). If the page shows rows, the selectors may need updating");
            return CycleOutcome::NoRows;
        }

        let new_showings = match self.unseen(&showings).await {
            Ok(new_showings) => new_showings,
            Err(e) => return store_failed(e),
        };

        if new_showings.is_empty() {
            info!(scraped = showings.len(), "No new showings");
            return CycleOutcome::NoNew {
                scraped: showings.len(),
            };
        }

        if let Err(e) = self.remember(&new_showings).await {
            return store_failed(e);
        }

        let (delivered, failed) = self.dispatch(&new_showings).await;
        CycleOutcome::Notified {
            new: new_showings.len(),
            delivered,
            failed,
        }
    }

    /// Showings whose fingerprint is not in the store, first occurrence of
    /// each fingerprint only.
    async fn unseen(&self, showings: &[ShowingRow]) -> Result<Vec<ShowingRow>> {
        let mut in_batch = HashSet::new();
        let mut new_showings = Vec::new();
        for showing in showings {
            let fingerprint = showing.fingerprint();
            if !in_batch.insert(fingerprint.clone()) {
                continue;
            }
            if !self.store.exists(&fingerprint).await? {
                new_showings.push(showing.clone());
            }
        }
        Ok(new_showings)
    }

    async fn remember(&self, showings: &[ShowingRow]) -> Result<()> {
        let now = Utc::now();
        for showing in showings {
            self.store.insert(&showing.fingerprint(), now).await?;
        }
        Ok(())
    }

    /// Hand the batch to every channel in order. Returns (delivered, failed).
    async fn dispatch(&self, showings: &[ShowingRow]) -> (usize, usize) {
        if self.notifiers.is_empty() {
            warn!(count = showings.len(), "No notifiers configured; new showings will not be alerted");
            return (0, 0);
        }

        let mut delivered = 0;
        let mut failed = 0;
        for notifier in &self.notifiers {
            match notifier.notify_new_showings(showings).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(channel = notifier.name(), error = %e, "Notifier failed");
                    failed += 1;
                }
            }
        }
        (delivered, failed)
    }
}

fn store_failed(e: anyhow::Error) -> CycleOutcome {
    error!(error = %format!("{e:#}"), "Seen-set store failed; skipping notifications");
    CycleOutcome::StoreFailed {
        reason: format!("{e:#}"),
    }
}
