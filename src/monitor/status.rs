// Live monitor status: shared between the poll loop and the status endpoint.

use serde::Serialize;

/// What one poll cycle did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// The scraper failed; nothing was stored or sent.
    ExtractionFailed { reason: String },
    /// The table was found but held no usable rows.
    NoRows,
    /// Every scraped showing had been seen before.
    NoNew { scraped: usize },
    /// New showings were stored and handed to the channels.
    Notified {
        new: usize,
        delivered: usize,
        failed: usize,
    },
    /// The seen-set store failed; no channel was called.
    StoreFailed { reason: String },
}

impl CycleOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::ExtractionFailed { .. } | Self::StoreFailed { .. })
    }

    /// Showings handed to the channels this cycle.
    pub fn new_count(&self) -> usize {
        match self {
            Self::Notified { new, .. } => *new,
            _ => 0,
        }
    }
}

/// Exposed via GET /api/status.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorStatus {
    pub cycles_run: u64,
    /// True while a cycle is in progress.
    pub running: bool,
    /// RFC 3339 timestamp of when the current/last cycle started.
    pub last_started_at: Option<String>,
    pub last_finished_at: Option<String>,
    pub last_outcome: Option<CycleOutcome>,
    /// Error message from the last failed cycle. Cleared on success.
    pub last_error: Option<String>,
    /// Showings handed to the channels since startup.
    pub total_notified: u64,
}
