// Chromium adapter: BrowserLauncher / BrowserSession over chromiumoxide (CDP).
//
// The application iframe is cross-origin. Site isolation is switched off at
// launch so the frame lives in the page's renderer; we then reach into it
// through DOM.describeNode (iframe element -> content frame id) and an
// isolated world created on that frame, which shares its DOM.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::DescribeNodeParams;
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, TimeSinceEpoch,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CreateIsolatedWorldParams, FrameId,
};
use chromiumoxide::cdp::js_protocol::runtime::{EvaluateParams, ExecutionContextId};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::network::NetworkTracker;
use super::session_state::{local_storage_seed_script, OriginStorage, SessionState, StoredCookie};
use super::traits::{
    BrowserLauncher, BrowserSession, FrameRef, LaunchOptions, PageInfo, TableSnapshot,
};

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

/// Name of the isolated world we evaluate frame scripts in.
const WORLD_NAME: &str = "showings-monitor";

/// The network counts as idle after this long with no request in flight.
const NETWORK_QUIET: Duration = Duration::from_millis(500);
const NETWORK_MAX_INFLIGHT: usize = 0;
const NETWORK_POLL_INTERVAL: Duration = Duration::from_millis(100);
const FRAME_POLL_INTERVAL: Duration = Duration::from_millis(250);

const TABLES_SCRIPT: &str = r#"
    (() => {
        const text = (el) => ((el.innerText ?? el.textContent) || '');
        return Array.from(document.querySelectorAll('table')).map((table) => ({
            headers: Array.from(table.querySelectorAll('th')).map((th) => text(th).trim()),
            rows: Array.from(table.querySelectorAll('tbody tr')).map((tr) =>
                Array.from(tr.querySelectorAll('td')).map(text)
            ),
        }));
    })()
"#;

const LOCAL_STORAGE_SCRIPT: &str = r#"
    (() => {
        const items = [];
        try {
            for (let i = 0; i < localStorage.length; i++) {
                const name = localStorage.key(i);
                items.push({ name, value: localStorage.getItem(name) ?? '' });
            }
        } catch (_) {}
        return { origin: location.origin, localStorage: items };
    })()
"#;

const FRAME_HTML_SCRIPT: &str =
    "document.documentElement ? document.documentElement.outerHTML : ''";

/// Launches a local Chrome/Chromium per session.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher;

impl ChromiumLauncher {
    pub fn new() -> Self {
        Self
    }

    fn find_chrome(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            anyhow::bail!("SHOWINGS_CHROME_PATH points to a missing file: {}", path.display());
        }

        for path in CHROME_PATHS {
            let p = Path::new(path);
            if p.exists() {
                debug!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in CHROME_COMMANDS {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        debug!("Found Chrome in PATH: {}", path);
                        return Ok(PathBuf::from(path));
                    }
                }
            }
        }

        Err(anyhow!(
            "Chrome/Chromium not found. Install it or set SHOWINGS_CHROME_PATH:\n\
             - Ubuntu/Debian: sudo apt install chromium-browser\n\
             - Fedora: sudo dnf install chromium\n\
             - Arch/Manjaro: sudo pacman -S chromium"
        ))
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>> {
        let chrome_path = Self::find_chrome(options.chrome_path.as_deref())?;
        info!(headless = options.headless, "Launching browser");

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(options.request_timeout)
            .window_size(1366, 900);

        // with_head means NOT headless
        if !options.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--disable-site-isolation-trials")
            .arg("--disable-features=IsolateOrigins,site-per-process")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        let config = builder
            .build()
            .map_err(|e| anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let mut session = ChromiumSession {
            browser,
            handler_task,
            page: None,
            frame_contexts: HashMap::new(),
            network: Arc::new(Mutex::new(NetworkTracker::new(
                NETWORK_MAX_INFLIGHT,
                std::time::Instant::now(),
            ))),
            network_tasks: Vec::new(),
        };

        // From here on the session owns the process; close it on failure.
        match session.open_page(options.session_state.as_ref()).await {
            Ok(()) => Ok(Box::new(session)),
            Err(e) => {
                Box::new(session).close().await;
                Err(e)
            }
        }
    }
}

pub struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Option<Page>,
    /// Frame id -> isolated-world execution context.
    frame_contexts: HashMap<String, ExecutionContextId>,
    network: Arc<Mutex<NetworkTracker>>,
    network_tasks: Vec<JoinHandle<()>>,
}

impl ChromiumSession {
    async fn open_page(&mut self, state: Option<&SessionState>) -> Result<()> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("Failed to open page")?;

        self.track_network(&page).await?;

        if let Some(state) = state {
            seed_cookies(&page, &state.cookies).await;
            seed_local_storage(&page, &state.origins).await;
        }

        self.page = Some(page);
        Ok(())
    }

    /// Feed request start/finish/fail events into the tracker for the life
    /// of the session.
    async fn track_network(&mut self, page: &Page) -> Result<()> {
        let mut started = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .context("Failed to listen for network requests")?;
        let mut finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .context("Failed to listen for finished requests")?;
        let mut failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .context("Failed to listen for failed requests")?;

        let tracker = self.network.clone();
        self.network_tasks.push(tokio::spawn(async move {
            while let Some(event) = started.next().await {
                if let Ok(mut t) = tracker.lock() {
                    t.request_started(event.request_id.inner(), std::time::Instant::now());
                }
            }
        }));
        let tracker = self.network.clone();
        self.network_tasks.push(tokio::spawn(async move {
            while let Some(event) = finished.next().await {
                if let Ok(mut t) = tracker.lock() {
                    t.request_finished(event.request_id.inner(), std::time::Instant::now());
                }
            }
        }));
        let tracker = self.network.clone();
        self.network_tasks.push(tokio::spawn(async move {
            while let Some(event) = failed.next().await {
                if let Ok(mut t) = tracker.lock() {
                    t.request_finished(event.request_id.inner(), std::time::Instant::now());
                }
            }
        }));
        Ok(())
    }

    fn network_idle(&self) -> bool {
        self.network
            .lock()
            .map(|t| t.is_idle(std::time::Instant::now(), NETWORK_QUIET))
            .unwrap_or(false)
    }

    fn page(&self) -> Result<&Page> {
        self.page.as_ref().ok_or_else(|| anyhow!("browser page not open"))
    }

    /// Content frame id of the first element matching `selector`, if the
    /// element exists and its frame has been attached.
    async fn content_frame_id(&self, selector: &str) -> Option<FrameId> {
        let page = self.page().ok()?;
        let element = page.find_element(selector).await.ok()?;
        let params = DescribeNodeParams::builder()
            .backend_node_id(element.backend_node_id)
            .build();
        let described = page.execute(params).await.ok()?;
        described.result.node.frame_id.clone()
    }

    async fn frame_context(&mut self, frame: &FrameRef) -> Result<ExecutionContextId> {
        if let Some(id) = self.frame_contexts.get(&frame.id) {
            return Ok(*id);
        }
        let params = CreateIsolatedWorldParams::builder()
            .frame_id(FrameId::new(frame.id.clone()))
            .world_name(WORLD_NAME)
            .build()
            .map_err(|e| anyhow!("Invalid isolated world params: {}", e))?;
        let world = self
            .page()?
            .execute(params)
            .await
            .context("Failed to create isolated world in frame")?;
        let id = world.result.execution_context_id;
        self.frame_contexts.insert(frame.id.clone(), id);
        Ok(id)
    }

    async fn eval_in_context<T: DeserializeOwned>(
        &self,
        context_id: ExecutionContextId,
        expression: &str,
    ) -> Result<T> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .context_id(context_id)
            .return_by_value(true)
            .await_promise(true)
            .build()
            .map_err(|e| anyhow!("Invalid evaluate params: {}", e))?;
        let response = self.page()?.execute(params).await?;
        if let Some(exception) = &response.result.exception_details {
            anyhow::bail!("Script failed in frame: {}", exception.text);
        }
        let value = response
            .result
            .result
            .value
            .clone()
            .ok_or_else(|| anyhow!("Script returned no value"))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Evaluate inside the frame. A stale context (frame navigated since we
    /// created it) is dropped and recreated once.
    async fn eval_in_frame<T: DeserializeOwned>(
        &mut self,
        frame: &FrameRef,
        expression: &str,
    ) -> Result<T> {
        let context_id = self.frame_context(frame).await?;
        match self.eval_in_context(context_id, expression).await {
            Ok(value) => Ok(value),
            Err(e) => {
                debug!(error = %e, "Frame evaluation failed; recreating isolated world");
                self.frame_contexts.remove(&frame.id);
                let context_id = self.frame_context(frame).await?;
                self.eval_in_context(context_id, expression).await
            }
        }
    }
}

async fn seed_cookies(page: &Page, cookies: &[StoredCookie]) {
    let mut params = Vec::with_capacity(cookies.len());
    for cookie in cookies {
        if cookie.name.is_empty() || cookie.domain.is_empty() {
            continue;
        }
        let mut builder = CookieParam::builder()
            .name(cookie.name.clone())
            .value(cookie.value.clone())
            .domain(cookie.domain.clone())
            .path(cookie.path.clone())
            .secure(cookie.secure)
            .http_only(cookie.http_only);
        if let Some(expires) = cookie.persistent_expiry() {
            builder = builder.expires(TimeSinceEpoch::new(expires));
        }
        match builder.build() {
            Ok(param) => params.push(param),
            Err(e) => warn!("Failed to build cookie {}: {}", cookie.name, e),
        }
    }
    if params.is_empty() {
        return;
    }
    let count = params.len();
    match page.set_cookies(params).await {
        Ok(_) => debug!(count, "Seeded cookies"),
        Err(e) => warn!(error = %e, "Failed to seed cookies"),
    }
}

/// Local storage can only be written from inside an origin, so we register
/// a script that runs at the start of every document and fills in the items
/// saved for that document's origin. Failure leaves the session unseeded.
async fn seed_local_storage(page: &Page, origins: &[OriginStorage]) {
    let script = match local_storage_seed_script(origins) {
        Ok(Some(script)) => script,
        Ok(None) => return,
        Err(e) => {
            warn!(error = %e, "Failed to build local storage seed");
            return;
        }
    };
    match page
        .evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(script))
        .await
    {
        Ok(_) => debug!(origins = origins.len(), "Seeded local storage"),
        Err(e) => warn!(error = %e, "Failed to seed local storage"),
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        self.frame_contexts.clear();
        let page = self.page()?;
        tokio::time::timeout(timeout, page.goto(url))
            .await
            .map_err(|_| anyhow!("Navigation timed out after {}s for {}", timeout.as_secs(), url))?
            .map_err(|e| anyhow!("Navigation failed for {}: {}", url, e))?;
        Ok(())
    }

    async fn wait_for_network_idle(&mut self, budget: Duration) -> Result<bool> {
        self.page()?;
        let deadline = Instant::now() + budget;
        loop {
            if self.network_idle() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                if let Ok(t) = self.network.lock() {
                    debug!(inflight = t.inflight(), "Network still busy at deadline");
                }
                return Ok(false);
            }
            tokio::time::sleep(NETWORK_POLL_INTERVAL).await;
        }
    }

    async fn content_frame(
        &mut self,
        iframe_selector: &str,
        timeout: Duration,
    ) -> Result<Option<FrameRef>> {
        let deadline = Instant::now() + timeout;
        let frame_id = loop {
            if let Some(id) = self.content_frame_id(iframe_selector).await {
                break id;
            }
            if Instant::now() >= deadline {
                debug!(selector = iframe_selector, "Iframe content frame never appeared");
                return Ok(None);
            }
            tokio::time::sleep(FRAME_POLL_INTERVAL).await;
        };

        let mut frame = FrameRef {
            id: frame_id.inner().clone(),
            url: String::new(),
        };
        frame.url = self
            .eval_in_frame::<String>(&frame, "location.href")
            .await
            .unwrap_or_default();
        Ok(Some(frame))
    }

    async fn frame_tables(&mut self, frame: &FrameRef) -> Result<Vec<TableSnapshot>> {
        self.eval_in_frame(frame, TABLES_SCRIPT).await
    }

    async fn page_info(&mut self) -> Result<PageInfo> {
        let page = self.page()?;
        Ok(PageInfo {
            url: page.url().await?.unwrap_or_default(),
            title: page.get_title().await?.unwrap_or_default(),
        })
    }

    async fn page_html(&mut self) -> Result<String> {
        Ok(self.page()?.content().await?)
    }

    async fn frame_html(&mut self, frame: &FrameRef) -> Result<String> {
        self.eval_in_frame(frame, FRAME_HTML_SCRIPT).await
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder().full_page(true).build();
        Ok(self.page()?.screenshot(params).await?)
    }

    async fn session_state(&mut self) -> Result<SessionState> {
        let cookies = self
            .browser
            .get_cookies()
            .await
            .context("Failed to read browser cookies")?
            .into_iter()
            .map(|c| StoredCookie {
                expires: (!c.session).then_some(c.expires),
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                http_only: c.http_only,
                secure: c.secure,
            })
            .collect();

        let mut origins = Vec::new();
        let mut seen = HashSet::new();

        let page_storage: OriginStorage = self
            .page()?
            .evaluate(LOCAL_STORAGE_SCRIPT)
            .await?
            .into_value()?;
        push_origin(&mut origins, &mut seen, page_storage);

        let frames: Vec<FrameRef> = self
            .frame_contexts
            .keys()
            .map(|id| FrameRef {
                id: id.clone(),
                url: String::new(),
            })
            .collect();
        for frame in frames {
            match self.eval_in_frame::<OriginStorage>(&frame, LOCAL_STORAGE_SCRIPT).await {
                Ok(storage) => push_origin(&mut origins, &mut seen, storage),
                Err(e) => debug!(error = %e, "Skipping frame local storage"),
            }
        }

        Ok(SessionState { cookies, origins })
    }

    async fn close(mut self: Box<Self>) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Browser did not close cleanly");
        }
        if let Err(e) = self.browser.wait().await {
            debug!(error = %e, "Waiting for browser exit failed");
        }
        for task in self.network_tasks.drain(..) {
            task.abort();
        }
        self.handler_task.abort();
    }
}

/// Keep real origins only, first occurrence wins.
fn push_origin(origins: &mut Vec<OriginStorage>, seen: &mut HashSet<String>, storage: OriginStorage) {
    if storage.origin.is_empty() || storage.origin == "null" {
        return;
    }
    if seen.insert(storage.origin.clone()) {
        origins.push(storage);
    }
}
