// System status display: seen-set size, DB file size, recent showings.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::db::SeenStore;

/// How many recent fingerprints `status` lists.
pub const RECENT_LIMIT: u32 = 10;

/// Display system status to the terminal.
pub async fn show(store: &Arc<dyn SeenStore>, config: &Config) -> Result<()> {
    let db_path = config.db_path.as_str();
    let file_size = std::fs::metadata(db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_path, file_size);

    if config.url.trim().is_empty() {
        println!("Target: {}", "SHOWINGS_URL not set".yellow());
    } else {
        println!("Target: {}", config.url);
    }

    match &config.storage_state_path {
        Some(path) if Path::new(path).exists() => {
            println!("Session state: {}", path.display())
        }
        Some(path) => println!("Session state: {} (not captured yet)", path.display()),
        None => println!("Session state: disabled"),
    }

    let push = if config.pushover.enabled {
        "enabled".green()
    } else {
        "disabled".dimmed()
    };
    println!("Pushover: {push}");

    let count = store.count().await?;
    println!("Seen showings: {}", count.to_string().bold());

    let recent = store.recent(RECENT_LIMIT).await?;
    if recent.is_empty() {
        println!("  Run `showings-monitor once` to take a first snapshot");
    } else {
        println!("Most recent:");
        for seen in &recent {
            println!("  {}  {}", seen.first_seen_at.dimmed(), seen.fingerprint);
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_byte_sizes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
