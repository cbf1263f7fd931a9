// Error taxonomy for the component seams.
//
// Plumbing (I/O, SQL, config parsing) stays on anyhow. These enums exist so
// the monitor loop can tell a misconfiguration from a structural page change
// from a flaky channel when it writes the cycle log.

use thiserror::Error;

/// Why an extraction produced no rows.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A required setting is missing. Raised before any browser is started.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The embedded application iframe (or its content frame) never appeared.
    #[error("frame not found: {0}")]
    FrameNotFound(String),

    /// Neither the strict nor the fallback table selector matched in time.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// The browser failed: launch, navigation timeout, protocol error.
    #[error("browser error: {0:#}")]
    Browser(#[from] anyhow::Error),
}

impl ScrapeError {
    /// Structural failures are the ones that leave a debug dump behind.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::FrameNotFound(_) | Self::TableNotFound(_))
    }
}

/// A notification channel failed to deliver a batch.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{channel} delivery failed: {message}")]
    Delivery { channel: String, message: String },
}

impl NotifyError {
    pub fn delivery(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            channel: channel.into(),
            message: message.into(),
        }
    }
}
