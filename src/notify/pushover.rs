// Pushover delivery: one form-encoded POST per batch.
//
// Push messages stay short: a count in the title and at most five showings
// in the body. Delivery problems are logged and never returned.
//
// API docs: https://pushover.net/api

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use super::traits::Notifier;
use crate::config::PushoverConfig;
use crate::error::NotifyError;
use crate::showing::ShowingRow;

pub const PUSHOVER_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

/// Showings listed in the message body before truncating.
pub const MAX_LISTED: usize = 5;

const URL_TITLE: &str = "Open activity log";

pub struct PushoverNotifier {
    client: Client,
    endpoint: String,
    config: PushoverConfig,
    source_url: String,
}

impl PushoverNotifier {
    pub fn new(config: PushoverConfig, source_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: PUSHOVER_ENDPOINT.to_string(),
            config,
            source_url: source_url.into(),
        }
    }

    /// Send to a different endpoint (a local stub in tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Form fields for one batch, in the order they are sent.
    pub fn form(&self, showings: &[ShowingRow]) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("token", self.config.token.trim().to_string()),
            ("user", self.config.user.trim().to_string()),
            ("title", build_title(showings.len())),
            ("message", build_message(showings)),
        ];

        let url = self.source_url.trim();
        if !url.is_empty() {
            form.push(("url", url.to_string()));
            form.push(("url_title", URL_TITLE.to_string()));
        }
        if let Some(device) = non_blank(self.config.device.as_deref()) {
            form.push(("device", device.to_string()));
        }
        if let Some(sound) = non_blank(self.config.sound.as_deref()) {
            form.push(("sound", sound.to_string()));
        }
        form
    }

    fn has_credentials(&self) -> bool {
        !self.config.token.trim().is_empty() && !self.config.user.trim().is_empty()
    }
}

/// `New <N> showing(s)`
pub fn build_title(count: usize) -> String {
    format!("New {count} showing(s)")
}

/// First `MAX_LISTED` showings as `name | occurs_at | source`, one per line,
/// then `… +K more` when the batch was longer.
pub fn build_message(showings: &[ShowingRow]) -> String {
    let mut message = showings
        .iter()
        .take(MAX_LISTED)
        .map(ShowingRow::summary_line)
        .collect::<Vec<_>>()
        .join("\n");
    if showings.len() > MAX_LISTED {
        message.push_str(&format!("\n… +{} more", showings.len() - MAX_LISTED));
    }
    message
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[async_trait]
impl Notifier for PushoverNotifier {
    fn name(&self) -> &str {
        "pushover"
    }

    async fn notify_new_showings(&self, showings: &[ShowingRow]) -> Result<(), NotifyError> {
        if !self.has_credentials() {
            warn!("Pushover is enabled but PUSHOVER_TOKEN/PUSHOVER_USER is not set; skipping");
            return Ok(());
        }

        let form = self.form(showings);
        match self.client.post(&self.endpoint).form(&form).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    info!(status = status.as_u16(), count = showings.len(), "Pushover notification sent");
                } else {
                    let body = response.text().await.unwrap_or_default();
                    warn!(status = status.as_u16(), body = %body, "Pushover rejected notification");
                }
            }
            Err(e) => warn!(error = %e, "Pushover notification failed"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<ShowingRow> {
        (1..=n)
            .map(|i| ShowingRow::new(format!("Guest {i}"), format!("May {i}"), "", "Zillow"))
            .collect()
    }

    fn config() -> PushoverConfig {
        PushoverConfig {
            enabled: true,
            token: " tok ".into(),
            user: "usr".into(),
            device: Some("  ".into()),
            sound: Some("bike".into()),
        }
    }

    #[test]
    fn title_counts_the_whole_batch() {
        assert_eq!(build_title(7), "New 7 showing(s)");
    }

    #[test]
    fn short_batch_is_not_truncated() {
        let message = build_message(&rows(2));
        assert_eq!(message, "Guest 1 | May 1 | Zillow\nGuest 2 | May 2 | Zillow");
    }

    #[test]
    fn exactly_five_has_no_suffix() {
        let message = build_message(&rows(5));
        assert_eq!(message.lines().count(), 5);
        assert!(!message.contains("more"));
    }

    #[test]
    fn form_skips_blank_optionals() {
        let notifier = PushoverNotifier::new(config(), "");
        let form = notifier.form(&rows(1));
        let keys: Vec<_> = form.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, ["token", "user", "title", "message", "sound"]);
        assert_eq!(form[0].1, "tok");
    }

    #[test]
    fn form_links_back_to_source() {
        let notifier = PushoverNotifier::new(config(), "https://example.com/log");
        let form = notifier.form(&rows(1));
        assert!(form.contains(&("url", "https://example.com/log".to_string())));
        assert!(form.iter().any(|(k, _)| *k == "url_title"));
    }
}
