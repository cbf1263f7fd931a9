// Monitor loop: runs poll cycles on a fixed delay.

pub mod cycle;
pub mod status;

use std::time::Duration;

use tracing::info;

pub use cycle::ShowingsMonitor;
pub use status::{CycleOutcome, MonitorStatus};

/// Run cycles forever. The first cycle starts immediately; each following
/// one starts `delay` after the previous one finished, so cycles never
/// overlap.
pub async fn run_forever(monitor: &ShowingsMonitor, delay: Duration) {
    info!(delay_ms = delay.as_millis() as u64, "Starting showings monitor");
    loop {
        let outcome = monitor.run_cycle().await;
        info!(outcome = ?outcome, "Cycle finished");
        tokio::time::sleep(delay).await;
    }
}
