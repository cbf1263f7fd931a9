use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use super::traits::Notifier;
use crate::error::NotifyError;
use crate::showing::ShowingRow;

/// Prints new showings, one per line. Always registered.
pub struct ConsoleNotifier {
    source_url: String,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleNotifier {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self::with_writer(source_url, Box::new(std::io::stdout()))
    }

    pub fn with_writer(source_url: impl Into<String>, out: Box<dyn Write + Send>) -> Self {
        Self {
            source_url: source_url.into(),
            out: Mutex::new(out),
        }
    }

    fn write_batch(&self, showings: &[ShowingRow]) -> std::io::Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| std::io::Error::other("console writer poisoned"))?;
        for showing in showings {
            writeln!(out, "  {showing}")?;
        }
        out.flush()
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    async fn notify_new_showings(&self, showings: &[ShowingRow]) -> Result<(), NotifyError> {
        info!(count = showings.len(), source = %self.source_url, "New showings detected");
        self.write_batch(showings)
            .map_err(|e| NotifyError::delivery(self.name(), e.to_string()))
    }
}
