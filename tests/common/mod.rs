// Shared fakes for the integration tests: a scripted browser, in-memory
// showing sources, recording notifiers and a broken store.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing_subscriber::fmt::MakeWriter;

use showings_monitor::db::models::SeenShowing;
use showings_monitor::db::SeenStore;
use showings_monitor::error::{NotifyError, ScrapeError};
use showings_monitor::notify::Notifier;
use showings_monitor::scrape::session_state::SessionState;
use showings_monitor::scrape::traits::{LaunchOptions, PageInfo};
use showings_monitor::scrape::{
    BrowserLauncher, BrowserSession, FrameRef, ShowingSource, TableSnapshot,
};
use showings_monitor::showing::ShowingRow;

pub fn row(name: &str, occurs_at: &str, source: &str) -> ShowingRow {
    ShowingRow::new(name, occurs_at, "", source)
}

pub fn cells(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn table(headers: &[&str], rows: &[&[&str]]) -> TableSnapshot {
    TableSnapshot {
        headers: cells(headers),
        rows: rows.iter().map(|r| cells(r)).collect(),
    }
}

pub fn platform_frame() -> FrameRef {
    FrameRef {
        id: "frame-1".to_string(),
        url: "https://app.example.com/activity".to_string(),
    }
}

// ============================================================
// Scripted browser
// ============================================================

/// What the fake browser will show.
#[derive(Clone, Default)]
pub struct Script {
    pub frame: Option<FrameRef>,
    pub tables: Vec<TableSnapshot>,
    pub fail_launch: bool,
    pub fail_navigate: bool,
    pub network_idle: bool,
    /// Returned by `session_state()`.
    pub state: SessionState,
}

/// Everything the fake browser was asked to do.
#[derive(Debug, Default)]
pub struct Calls {
    pub launches: usize,
    pub closes: usize,
    pub navigated: Vec<String>,
    pub seeded: Option<SessionState>,
    pub state_reads: usize,
}

pub struct FakeLauncher {
    script: Script,
    calls: Arc<Mutex<Calls>>,
}

impl FakeLauncher {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: Arc::new(Mutex::new(Calls::default())),
        }
    }

    pub fn calls(&self) -> Arc<Mutex<Calls>> {
        self.calls.clone()
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>> {
        {
            let mut calls = self.calls.lock().unwrap();
            calls.launches += 1;
            calls.seeded = options.session_state.clone();
        }
        if self.script.fail_launch {
            anyhow::bail!("browser binary missing");
        }
        Ok(Box::new(FakeSession {
            script: self.script.clone(),
            calls: self.calls.clone(),
        }))
    }
}

struct FakeSession {
    script: Script,
    calls: Arc<Mutex<Calls>>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        self.calls.lock().unwrap().navigated.push(url.to_string());
        if self.script.fail_navigate {
            anyhow::bail!("navigation timed out");
        }
        Ok(())
    }

    async fn wait_for_network_idle(&mut self, _budget: Duration) -> Result<bool> {
        Ok(self.script.network_idle)
    }

    async fn content_frame(
        &mut self,
        _iframe_selector: &str,
        _timeout: Duration,
    ) -> Result<Option<FrameRef>> {
        Ok(self.script.frame.clone())
    }

    async fn frame_tables(&mut self, _frame: &FrameRef) -> Result<Vec<TableSnapshot>> {
        Ok(self.script.tables.clone())
    }

    async fn page_info(&mut self) -> Result<PageInfo> {
        Ok(PageInfo {
            url: "https://example.com/wrapper".to_string(),
            title: "Wrapper".to_string(),
        })
    }

    async fn page_html(&mut self) -> Result<String> {
        Ok("<html><body>wrapper</body></html>".to_string())
    }

    async fn frame_html(&mut self, _frame: &FrameRef) -> Result<String> {
        Ok("<html><body><table></table></body></html>".to_string())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn session_state(&mut self) -> Result<SessionState> {
        self.calls.lock().unwrap().state_reads += 1;
        Ok(self.script.state.clone())
    }

    async fn close(self: Box<Self>) {
        self.calls.lock().unwrap().closes += 1;
    }
}

// ============================================================
// Showing sources
// ============================================================

/// Returns queued results in order, then empty batches.
pub struct QueuedSource {
    results: Mutex<VecDeque<Result<Vec<ShowingRow>, ScrapeError>>>,
}

impl QueuedSource {
    pub fn new(results: Vec<Result<Vec<ShowingRow>, ScrapeError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
        }
    }

    /// The same rows on every call.
    pub fn repeating(rows: Vec<ShowingRow>, times: usize) -> Self {
        Self::new((0..times).map(|_| Ok(rows.clone())).collect())
    }
}

#[async_trait]
impl ShowingSource for QueuedSource {
    async fn fetch_showings(&self) -> Result<Vec<ShowingRow>, ScrapeError> {
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Spends `work` on every fetch and records when each fetch started and
/// finished. The first fetch fails when `fail_first` is set.
pub struct TimedSource {
    work: Duration,
    fail_first: bool,
    spans: Mutex<Vec<(Instant, Instant)>>,
}

impl TimedSource {
    pub fn new(work: Duration, fail_first: bool) -> Arc<Self> {
        Arc::new(Self {
            work,
            fail_first,
            spans: Mutex::new(Vec::new()),
        })
    }

    pub fn spans(&self) -> Vec<(Instant, Instant)> {
        self.spans.lock().unwrap().clone()
    }
}

#[async_trait]
impl ShowingSource for TimedSource {
    async fn fetch_showings(&self) -> Result<Vec<ShowingRow>, ScrapeError> {
        let started = Instant::now();
        tokio::time::sleep(self.work).await;
        let first = {
            let mut spans = self.spans.lock().unwrap();
            spans.push((started, Instant::now()));
            spans.len() == 1
        };
        if first && self.fail_first {
            return Err(ScrapeError::TableNotFound("no table".into()));
        }
        Ok(Vec::new())
    }
}

// ============================================================
// Notifiers
// ============================================================

pub struct RecordingNotifier {
    name: String,
    fail: bool,
    batches: Mutex<Vec<Vec<ShowingRow>>>,
}

impl RecordingNotifier {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: false,
            batches: Mutex::new(Vec::new()),
        })
    }

    /// Records the batch, then reports a delivery failure.
    pub fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail: true,
            batches: Mutex::new(Vec::new()),
        })
    }

    pub fn batches(&self) -> Vec<Vec<ShowingRow>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify_new_showings(&self, showings: &[ShowingRow]) -> Result<(), NotifyError> {
        self.batches.lock().unwrap().push(showings.to_vec());
        if self.fail {
            return Err(NotifyError::delivery(&self.name, "service unavailable"));
        }
        Ok(())
    }
}

// ============================================================
// Stores
// ============================================================

/// Every call fails, as a locked or corrupt database would.
pub struct BrokenStore;

#[async_trait]
impl SeenStore for BrokenStore {
    async fn exists(&self, _fingerprint: &str) -> Result<bool> {
        anyhow::bail!("database is locked")
    }

    async fn insert(&self, _fingerprint: &str, _observed_at: DateTime<Utc>) -> Result<()> {
        anyhow::bail!("database is locked")
    }

    async fn count(&self) -> Result<u64> {
        anyhow::bail!("database is locked")
    }

    async fn recent(&self, _limit: u32) -> Result<Vec<SeenShowing>> {
        anyhow::bail!("database is locked")
    }
}

// ============================================================
// Logs
// ============================================================

/// Collects formatted log output for the current thread.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's events into a fresh buffer until the guard drops.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
