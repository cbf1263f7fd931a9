// Session state: cookies and local storage carried between cycles.
//
// The file layout mirrors the common "storage state" JSON shape
// ({"cookies": [...], "origins": [{"origin", "localStorage"}]}) so a state
// captured by other browser tooling can be dropped in as-is.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
    #[serde(default)]
    pub origins: Vec<OriginStorage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    /// Unix seconds. Absent (or negative) for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginStorage {
    pub origin: String,
    #[serde(default)]
    pub local_storage: Vec<StorageItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageItem {
    pub name: String,
    pub value: String,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

impl SessionState {
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.iter().all(|o| o.local_storage.is_empty())
    }
}

impl StoredCookie {
    /// Expiry to re-apply when seeding. `None` for session cookies.
    pub fn persistent_expiry(&self) -> Option<f64> {
        self.expires.filter(|e| *e > 0.0)
    }
}

/// Init script that fills `localStorage` for whichever saved origin the
/// document belongs to. `None` when there is nothing to seed.
pub fn local_storage_seed_script(origins: &[OriginStorage]) -> Result<Option<String>> {
    let seed: HashMap<&str, Vec<(&str, &str)>> = origins
        .iter()
        .filter(|o| !o.local_storage.is_empty())
        .map(|o| {
            let items = o
                .local_storage
                .iter()
                .map(|i| (i.name.as_str(), i.value.as_str()))
                .collect();
            (o.origin.as_str(), items)
        })
        .collect();
    if seed.is_empty() {
        return Ok(None);
    }
    let seed = serde_json::to_string(&seed).context("Failed to encode local storage seed")?;
    Ok(Some(format!(
        "(() => {{ const items = ({seed})[location.origin]; if (!items) return; \
         try {{ for (const [k, v] of items) localStorage.setItem(k, v); }} catch (_) {{}} }})();"
    )))
}

/// Read a state file. A missing file is `Ok(None)`.
pub fn load(path: &Path) -> Result<Option<SessionState>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read session state {}", path.display()))?;
    let state = serde_json::from_str(&content)
        .with_context(|| format!("Invalid session state JSON in {}", path.display()))?;
    Ok(Some(state))
}

/// Write a state file, creating parent directories as needed.
pub fn save(path: &Path, state: &SessionState) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write session state {}", path.display()))?;
    Ok(())
}

/// Load for seeding a new context. Any failure is logged and treated as
/// "no prior state" so a corrupt file never blocks a cycle.
pub fn load_for_seeding(path: Option<&Path>) -> Option<SessionState> {
    let path = path?;
    match load(path) {
        Ok(Some(state)) if state.is_empty() => None,
        Ok(Some(state)) => {
            info!(
                path = %path.display(),
                cookies = state.cookies.len(),
                "Loading session state"
            );
            Some(state)
        }
        Ok(None) => None,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Ignoring unreadable session state");
            None
        }
    }
}
