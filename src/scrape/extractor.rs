// Showings scraper: drives one browser session per call to pull the
// activity table out of the embedded application frame.
//
// Flow: seed session state -> navigate -> network idle -> platform iframe ->
// strict/fallback table -> rows -> save session state. The browser is closed
// on every path once it has been launched.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::diagnostics::{artifacts_note, DebugDumper};
use super::rows::parse_rows;
use super::selector::{TableSelector, FALLBACK, STRICT};
use super::session_state;
use super::traits::{
    BrowserLauncher, BrowserSession, FrameRef, LaunchOptions, ShowingSource, TableSnapshot,
};
use crate::config::Config;
use crate::error::ScrapeError;
use crate::showing::ShowingRow;

/// The wrapper page embeds the application as
/// `<iframe id="platform-iframe" src="https://...">`.
pub const PLATFORM_IFRAME_SELECTOR: &str = "iframe#platform-iframe";

/// File-name prefix for debug dumps.
pub const DEBUG_PREFIX: &str = "showings";

/// Everything the scraper needs from the configuration.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub url: String,
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub storage_state_path: Option<PathBuf>,
    pub debug_dir: PathBuf,
    /// Navigation timeout, also used as the iframe wait.
    pub nav_timeout: Duration,
    pub network_idle_budget: Duration,
    /// Wait budget per table selector tier.
    pub table_wait: Duration,
    /// Delay between table lookups inside one tier.
    pub poll_interval: Duration,
}

impl ScrapeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            url: config.url.clone(),
            headless: config.headless,
            chrome_path: config.chrome_path.clone(),
            storage_state_path: config.storage_state_path.clone(),
            debug_dir: config.debug_dir.clone(),
            nav_timeout: config.nav_timeout,
            network_idle_budget: Duration::from_secs(30),
            table_wait: config.table_wait,
            poll_interval: Duration::from_millis(500),
        }
    }
}

pub struct ShowingsScraper {
    launcher: Arc<dyn BrowserLauncher>,
    settings: ScrapeSettings,
    dumper: DebugDumper,
}

impl ShowingsScraper {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, settings: ScrapeSettings) -> Self {
        let dumper = DebugDumper::new(settings.debug_dir.clone(), DEBUG_PREFIX);
        Self {
            launcher,
            settings,
            dumper,
        }
    }

    /// Scrape the current showings.
    pub async fn fetch_showings(&self) -> Result<Vec<ShowingRow>, ScrapeError> {
        let url = self.settings.url.trim().to_string();
        if url.is_empty() {
            return Err(ScrapeError::Configuration(
                "SHOWINGS_URL must be set to the page embedding the activity log".to_string(),
            ));
        }

        let options = LaunchOptions {
            headless: self.settings.headless,
            chrome_path: self.settings.chrome_path.clone(),
            session_state: session_state::load_for_seeding(
                self.settings.storage_state_path.as_deref(),
            ),
            request_timeout: self.settings.nav_timeout,
        };

        let mut session = self.launcher.launch(&options).await?;

        let result = self.scrape(session.as_mut(), &url).await;
        if result.is_ok() {
            self.save_session_state(session.as_mut()).await;
        }
        session.close().await;

        result
    }

    async fn scrape(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<Vec<ShowingRow>, ScrapeError> {
        info!(url, "Navigating");
        session.navigate(url, self.settings.nav_timeout).await?;

        // The table is filled in asynchronously after the initial load.
        match session
            .wait_for_network_idle(self.settings.network_idle_budget)
            .await
        {
            Ok(true) => debug!("Network idle"),
            Ok(false) => warn!(
                budget_ms = self.settings.network_idle_budget.as_millis() as u64,
                "Network never went idle; inspecting the page anyway"
            ),
            Err(e) => warn!(error = %format!("{e:#}"), "Network idle wait failed"),
        }

        let frame = self.find_platform_frame(session).await?;
        let table = self.find_showings_table(session, &frame).await?;

        info!(rows = table.rows.len(), "Found showing rows");
        let showings = parse_rows(&table.rows);
        debug!(
            kept = showings.len(),
            skipped = table.rows.len() - showings.len(),
            "Parsed showing rows"
        );
        Ok(showings)
    }

    async fn find_platform_frame(
        &self,
        session: &mut dyn BrowserSession,
    ) -> Result<FrameRef, ScrapeError> {
        let frame = session
            .content_frame(PLATFORM_IFRAME_SELECTOR, self.settings.nav_timeout)
            .await?;

        match frame {
            Some(frame) => {
                info!(frame_url = %frame.url, "Using platform iframe");
                Ok(frame)
            }
            None => {
                let dump = self
                    .dumper
                    .dump_page(session, "platform_iframe_not_found")
                    .await;
                Err(ScrapeError::FrameNotFound(format!(
                    "{PLATFORM_IFRAME_SELECTOR} is missing or has no content frame{}",
                    dump.note()
                )))
            }
        }
    }

    async fn find_showings_table(
        &self,
        session: &mut dyn BrowserSession,
        frame: &FrameRef,
    ) -> Result<TableSnapshot, ScrapeError> {
        if let Some(table) = self.wait_for_table(session, frame, &STRICT).await {
            return Ok(table);
        }
        warn!("Strict showings table selector did not match (will try fallback)");

        if let Some(table) = self.wait_for_table(session, frame, &FALLBACK).await {
            // May be an unrelated table if the frame has several with a
            // "Showing" column; the first in document order wins.
            warn!(headers = ?table.headers, "Using fallback showings table");
            return Ok(table);
        }

        let dump = self.dumper.dump_frame(session, frame, "table_not_found").await;
        Err(ScrapeError::TableNotFound(format!(
            "no table with a \"Showing\" header inside the platform iframe{}",
            artifacts_note(dump.as_ref())
        )))
    }

    /// Poll the frame's tables until `selector` matches or its budget runs out.
    async fn wait_for_table(
        &self,
        session: &mut dyn BrowserSession,
        frame: &FrameRef,
        selector: &TableSelector,
    ) -> Option<TableSnapshot> {
        let deadline = Instant::now() + self.settings.table_wait;
        loop {
            match session.frame_tables(frame).await {
                Ok(tables) => {
                    if let Some(table) = selector.find(&tables) {
                        debug!(tier = selector.label, tables = tables.len(), "Table matched");
                        return Some(table.clone());
                    }
                }
                Err(e) => debug!(tier = selector.label, error = %format!("{e:#}"), "Table lookup failed"),
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            tokio::time::sleep(self.settings.poll_interval.min(deadline - now)).await;
        }
    }

    async fn save_session_state(&self, session: &mut dyn BrowserSession) {
        let Some(path) = self.settings.storage_state_path.as_deref() else {
            return;
        };
        let saved = match session.session_state().await {
            Ok(state) => session_state::save(path, &state),
            Err(e) => Err(e),
        };
        match saved {
            Ok(()) => info!(path = %path.display(), "Saved session state"),
            Err(e) => warn!(error = %format!("{e:#}"), "Failed to save session state"),
        }
    }
}

#[async_trait]
impl ShowingSource for ShowingsScraper {
    async fn fetch_showings(&self) -> Result<Vec<ShowingRow>, ScrapeError> {
        ShowingsScraper::fetch_showings(self).await
    }
}
