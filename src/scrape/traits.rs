// Browser capability traits: the only surface the extractor drives.
//
// The extraction algorithm (extractor.rs) is written against these traits so
// it can be exercised with a scripted fake. The Chromium adapter in
// chromium.rs is the single implementation that talks to a real browser.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::session_state::SessionState;
use crate::error::ScrapeError;
use crate::showing::ShowingRow;

/// Anything that can produce the current list of showings.
///
/// The monitor loop depends on this rather than on the scraper directly.
#[async_trait]
pub trait ShowingSource: Send + Sync {
    async fn fetch_showings(&self) -> Result<Vec<ShowingRow>, ScrapeError>;
}

/// Options for starting one browser session.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    /// Cookies and local storage to seed the fresh context with.
    pub session_state: Option<SessionState>,
    /// Upper bound for a single protocol request.
    pub request_timeout: Duration,
}

/// Handle to a nested browsing context (the document inside an iframe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRef {
    pub id: String,
    pub url: String,
}

/// URL and title of the top-level page, for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
}

/// Text snapshot of one `<table>` in a frame: every header cell, then the
/// cell texts of each `tbody tr`, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

/// Starts browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>>;
}

/// One live browser with a single page.
///
/// Callers must finish with `close`, on success and failure alike.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate the page and wait for the load to finish.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Wait for network activity to settle. `Ok(false)` means the budget ran
    /// out while requests were still arriving.
    async fn wait_for_network_idle(&mut self, budget: Duration) -> Result<bool>;

    /// Wait for the iframe matching `iframe_selector` and resolve its content
    /// frame. `Ok(None)` when the element or its frame never shows up.
    async fn content_frame(
        &mut self,
        iframe_selector: &str,
        timeout: Duration,
    ) -> Result<Option<FrameRef>>;

    /// Snapshot every table currently in the frame, in document order.
    async fn frame_tables(&mut self, frame: &FrameRef) -> Result<Vec<TableSnapshot>>;

    async fn page_info(&mut self) -> Result<PageInfo>;

    /// Full markup of the top-level page.
    async fn page_html(&mut self) -> Result<String>;

    /// Full markup of the frame's document.
    async fn frame_html(&mut self, frame: &FrameRef) -> Result<String>;

    /// Full-page PNG screenshot.
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// Current cookies and local storage, for reuse by the next session.
    async fn session_state(&mut self) -> Result<SessionState>;

    /// Shut the browser down and release its process.
    async fn close(self: Box<Self>);
}
