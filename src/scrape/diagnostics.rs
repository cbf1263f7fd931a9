// Debug dumps: screenshots and markup captured when the page structure
// doesn't match what the extractor expects.
//
// Everything here is best-effort: a failed dump is logged and swallowed so
// it never hides the extraction error that triggered it.

use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::Local;
use regex_lite::Regex;
use tracing::warn;

use super::traits::{BrowserSession, FrameRef};

/// Files written by one page-level dump.
#[derive(Debug, Clone, Default)]
pub struct PageDump {
    pub screenshot: Option<PathBuf>,
    pub html: Option<PathBuf>,
}

impl PageDump {
    /// `"; debug artifacts: a.png, a.html"`, or empty when nothing was written.
    pub fn note(&self) -> String {
        artifacts_note([&self.screenshot, &self.html].into_iter().flatten())
    }
}

/// Suffix naming the dump files, for appending to an error message.
pub fn artifacts_note<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) -> String {
    let listed: Vec<String> = paths.into_iter().map(|p| p.display().to_string()).collect();
    if listed.is_empty() {
        String::new()
    } else {
        format!("; debug artifacts: {}", listed.join(", "))
    }
}

/// Writes diagnostic artifacts under one directory.
#[derive(Debug, Clone)]
pub struct DebugDumper {
    dir: PathBuf,
    prefix: String,
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_reason(reason: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9._-]").expect("static regex"));
    re.replace_all(reason, "_").into_owned()
}

impl DebugDumper {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    fn stem(&self, kind: Option<&str>, reason: &str) -> String {
        let ts = Local::now().format("%Y%m%d_%H%M%S");
        let reason = sanitize_reason(reason);
        match kind {
            Some(kind) => format!("{}_{}_{}_{}", self.prefix, kind, reason, ts),
            None => format!("{}_{}_{}", self.prefix, reason, ts),
        }
    }

    fn ensure_dir(&self) -> bool {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "Failed to create debug directory");
            return false;
        }
        true
    }

    /// Full-page screenshot plus page HTML.
    pub async fn dump_page(&self, session: &mut dyn BrowserSession, reason: &str) -> PageDump {
        let mut dump = PageDump::default();
        if !self.ensure_dir() {
            return dump;
        }

        let info = session.page_info().await.unwrap_or_default();
        warn!(
            reason,
            url = %info.url,
            title = %info.title,
            "Scrape debug dump"
        );

        let stem = self.stem(None, reason);

        match session.screenshot().await {
            Ok(png) => {
                let path = self.dir.join(format!("{stem}.png"));
                match std::fs::write(&path, png) {
                    Ok(()) => dump.screenshot = Some(path),
                    Err(e) => warn!(error = %e, "Failed to write debug screenshot"),
                }
            }
            Err(e) => warn!(error = %format!("{e:#}"), "Failed to capture debug screenshot"),
        }

        match session.page_html().await {
            Ok(html) => {
                let path = self.dir.join(format!("{stem}.html"));
                match std::fs::write(&path, html) {
                    Ok(()) => dump.html = Some(path),
                    Err(e) => warn!(error = %e, "Failed to write debug HTML"),
                }
            }
            Err(e) => warn!(error = %format!("{e:#}"), "Failed to capture page HTML"),
        }

        warn!(
            screenshot = ?dump.screenshot,
            html = ?dump.html,
            "Saved debug artifacts"
        );
        dump
    }

    /// Frame HTML only. Screenshots are page-level, so frame failures get
    /// markup alone.
    pub async fn dump_frame(
        &self,
        session: &mut dyn BrowserSession,
        frame: &FrameRef,
        reason: &str,
    ) -> Option<PathBuf> {
        if !self.ensure_dir() {
            return None;
        }
        warn!(reason, frame_url = %frame.url, frame_id = %frame.id, "Scrape debug dump (frame)");

        let html = match session.frame_html(frame).await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Failed to capture frame HTML");
                return None;
            }
        };
        let path = self.dir.join(format!("{}.html", self.stem(Some("frame"), reason)));
        match std::fs::write(&path, html) {
            Ok(()) => {
                warn!(frame_html = %path.display(), "Saved debug artifact");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "Failed to write frame debug HTML");
                None
            }
        }
    }
}
