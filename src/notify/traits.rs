// Notifier trait: one implementation per delivery channel.
//
// The monitor holds an ordered list of `Arc<dyn Notifier>` and calls each one
// with the same batch. A failing channel never stops the others.

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::showing::ShowingRow;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short channel name used in logs ("console", "pushover").
    fn name(&self) -> &str;

    /// Deliver one batch of newly seen showings. Never called with an empty
    /// batch.
    async fn notify_new_showings(&self, showings: &[ShowingRow]) -> Result<(), NotifyError>;
}
