use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Default delay between the end of one cycle and the start of the next.
pub const DEFAULT_POLL_DELAY_MS: u64 = 300_000;
/// Navigation and iframe wait. The target renders client-side and is slow.
pub const DEFAULT_NAV_TIMEOUT_MS: u64 = 90_000;
/// Wait budget for each table selector tier.
pub const DEFAULT_TABLE_WAIT_MS: u64 = 30_000;
pub const DEFAULT_STORAGE_STATE_PATH: &str = "storage-state.json";

/// Pushover channel settings.
#[derive(Debug, Clone, Default)]
pub struct PushoverConfig {
    pub enabled: bool,
    /// Application API token.
    pub token: String,
    /// User or group key (the destination).
    pub user: String,
    pub device: Option<String>,
    /// e.g. "pushover", "bike", "cashregister"
    pub sound: Option<String>,
}

/// Central configuration loaded from environment variables.
///
/// Secrets (the Pushover token) only ever come from the environment. The
/// .env file is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Page hosting the embedded activity log. Required for scraping, but
    /// `init` and `status` work without it.
    pub url: String,
    pub poll_delay: Duration,
    pub headless: bool,
    /// Cookie/local-storage snapshot reused across cycles. `None` disables it.
    pub storage_state_path: Option<PathBuf>,
    pub db_path: String,
    pub debug_dir: PathBuf,
    /// Explicit Chrome/Chromium executable (auto-detected when unset)
    pub chrome_path: Option<PathBuf>,
    pub nav_timeout: Duration,
    pub table_wait: Duration,
    pub pushover: PushoverConfig,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `load` passes the
    /// environment; tests pass a map.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| get(key).map(|v| v.trim().to_string()).unwrap_or_default();
        let optional = |key: &str| Some(text(key)).filter(|v| !v.is_empty());

        // Unset means the default path; set-but-empty means disabled.
        let storage_state_path = match get("SHOWINGS_STORAGE_STATE_PATH") {
            None => Some(PathBuf::from(DEFAULT_STORAGE_STATE_PATH)),
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(PathBuf::from(v.trim())),
        };

        Ok(Self {
            url: text("SHOWINGS_URL"),
            poll_delay: Duration::from_millis(parse_u64(
                &get,
                "SHOWINGS_POLL_DELAY_MS",
                DEFAULT_POLL_DELAY_MS,
            )?),
            headless: parse_bool(&get, "SHOWINGS_HEADLESS", true)?,
            storage_state_path,
            db_path: optional("SHOWINGS_DB_PATH").unwrap_or_else(|| "./showings.db".to_string()),
            debug_dir: PathBuf::from(
                optional("SHOWINGS_DEBUG_DIR").unwrap_or_else(|| "debug".to_string()),
            ),
            chrome_path: optional("SHOWINGS_CHROME_PATH").map(PathBuf::from),
            nav_timeout: Duration::from_millis(parse_u64(
                &get,
                "SHOWINGS_NAV_TIMEOUT_MS",
                DEFAULT_NAV_TIMEOUT_MS,
            )?),
            table_wait: Duration::from_millis(parse_u64(
                &get,
                "SHOWINGS_TABLE_WAIT_MS",
                DEFAULT_TABLE_WAIT_MS,
            )?),
            pushover: PushoverConfig {
                enabled: parse_bool(&get, "PUSHOVER_ENABLED", false)?,
                token: text("PUSHOVER_TOKEN"),
                user: text("PUSHOVER_USER"),
                device: optional("PUSHOVER_DEVICE"),
                sound: optional("PUSHOVER_SOUND"),
            },
        })
    }

    /// Check that the target URL is configured.
    /// Call this before starting the poll loop or a one-off cycle.
    pub fn require_url(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            anyhow::bail!(
                "SHOWINGS_URL not set. Add it to your .env file.\n\
                 It should point at the page that embeds the activity log."
            );
        }
        Ok(())
    }
}

fn parse_u64<F>(get: &F, key: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_string()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => v
            .parse()
            .with_context(|| format!("{key} must be a whole number, got {v:?}")),
    }
}

fn parse_bool<F>(get: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{key} must be true or false, got {other:?}"),
    }
}
