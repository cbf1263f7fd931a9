// Data models: rows of the seen-showings table.

use serde::{Deserialize, Serialize};

/// A fingerprint that has already been alerted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenShowing {
    pub fingerprint: String,
    /// RFC 3339 timestamp of the cycle that first saw this showing
    pub first_seen_at: String,
}
