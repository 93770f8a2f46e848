use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// TapConfig — file-based config loader (sourcetap.json) with env-var fallback
// ---------------------------------------------------------------------------

/// The CSS-selector contract against the host UI. This is the system's
/// fragile external dependency surface — when NotebookLM ships a markup
/// change, this is the only place that needs to move.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct SelectorConfig {
    /// One rendered source in the list view.
    pub list_container: Option<String>,
    /// Title element inside a list entry.
    pub source_title: Option<String>,
    /// Reveal control in the detail view (preferred).
    pub link_button: Option<String>,
    /// Alternate reveal control / detail-view marker.
    pub title_link: Option<String>,
    /// Decorative icon element; entry sub-elements containing one are never
    /// click candidates.
    pub icon: Option<String>,
    /// Visible labels of the "back to sources" control, tried as exact
    /// trimmed-text matches. The host UI is localized, so this is a list.
    pub list_labels: Option<Vec<String>>,
}

/// Timeouts and delays. All fixed, no backoff; each step gets one attempt.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct TimingConfig {
    pub list_return_timeout_ms: Option<u64>,
    pub detail_open_timeout_ms: Option<u64>,
    /// In-page window given to the reveal action to fire `window.open`.
    pub capture_timeout_ms: Option<u64>,
    /// Outer bound on the whole capture evaluation round-trip.
    pub bridge_rpc_timeout_ms: Option<u64>,
    /// Pause after a successful return-to-list, letting the re-render settle.
    pub settle_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

/// Top-level config loaded from `sourcetap.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct TapConfig {
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    /// Minimum visible text length for a descendant to qualify as a click
    /// candidate when opening an entry.
    pub min_candidate_text_len: Option<usize>,
}

/// Fully-resolved selector contract, defaults applied.
#[derive(Clone, Debug)]
pub struct Selectors {
    pub list_container: String,
    pub source_title: String,
    pub link_button: String,
    pub title_link: String,
    pub icon: String,
    pub list_labels: Vec<String>,
}

impl Selectors {
    /// Combined selector matching either "detail view opened" marker.
    pub fn detail_markers(&self) -> String {
        format!("{}, {}", self.title_link, self.link_button)
    }
}

/// Fully-resolved timing parameters, defaults applied.
#[derive(Clone, Copy, Debug)]
pub struct Timing {
    pub list_return_timeout: Duration,
    pub detail_open_timeout: Duration,
    pub capture_timeout: Duration,
    pub bridge_rpc_timeout: Duration,
    pub settle: Duration,
    pub poll_interval: Duration,
}

impl TapConfig {
    pub fn resolve_selectors(&self) -> Selectors {
        let s = &self.selectors;
        Selectors {
            list_container: s
                .list_container
                .clone()
                .unwrap_or_else(|| ".single-source-container".to_string()),
            source_title: s
                .source_title
                .clone()
                .unwrap_or_else(|| ".source-title".to_string()),
            link_button: s
                .link_button
                .clone()
                .unwrap_or_else(|| ".source-link-button".to_string()),
            title_link: s
                .title_link
                .clone()
                .unwrap_or_else(|| ".source-title-link".to_string()),
            icon: s.icon.clone().unwrap_or_else(|| "mat-icon".to_string()),
            list_labels: s
                .list_labels
                .clone()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| vec!["Sources".to_string(), "ソース".to_string()]),
        }
    }

    pub fn resolve_timing(&self) -> Timing {
        let t = &self.timing;
        let ms = Duration::from_millis;
        Timing {
            list_return_timeout: ms(t.list_return_timeout_ms.unwrap_or(2_000)),
            detail_open_timeout: ms(t.detail_open_timeout_ms.unwrap_or(2_000)),
            capture_timeout: ms(t.capture_timeout_ms.unwrap_or(2_000)),
            bridge_rpc_timeout: ms(t.bridge_rpc_timeout_ms.unwrap_or(5_000)),
            settle: ms(t.settle_ms.unwrap_or(300)),
            poll_interval: ms(t.poll_interval_ms.unwrap_or(50)),
        }
    }

    pub fn resolve_min_candidate_text_len(&self) -> usize {
        self.min_candidate_text_len.unwrap_or(10)
    }
}

/// Load `sourcetap.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `SOURCETAP_CONFIG` env var path
/// 2. `./sourcetap.json` (process cwd)
/// 3. `../sourcetap.json` (one level up)
///
/// Missing file → `TapConfig::default()` (silent, all defaults apply).
/// Parse error → log a warning, return `TapConfig::default()`.
pub fn load_tap_config() -> TapConfig {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("sourcetap.json"),
            std::path::PathBuf::from("../sourcetap.json"),
        ];
        if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<TapConfig>(&contents) {
                Ok(cfg) => {
                    tracing::info!("sourcetap.json loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "sourcetap.json parse error at {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    return TapConfig::default();
                }
            },
            Err(_) => continue, // file not found at this path — try next
        }
    }

    TapConfig::default()
}

// ---------------------------------------------------------------------------

pub const ENV_CONFIG_PATH: &str = "SOURCETAP_CONFIG";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";
pub const ENV_WS_URL: &str = "SOURCETAP_WS_URL";
pub const ENV_DEBUG_PORT: &str = "SOURCETAP_DEBUG_PORT";
pub const ENV_OUT_DIR: &str = "SOURCETAP_OUT_DIR";

/// Optional override for the Chromium-family browser executable.
///
/// Default behavior is auto-discovery (see `browser::find_chrome_executable`).
/// Only returns a value when `CHROME_EXECUTABLE` points at an existing path.
pub fn chrome_executable_override() -> Option<String> {
    let p = std::env::var(ENV_CHROME_EXECUTABLE).ok()?;
    let p = p.trim();
    if p.is_empty() {
        return None;
    }
    if Path::new(p).exists() {
        Some(p.to_string())
    } else {
        None
    }
}

/// CDP websocket endpoint of an already-running browser, if configured.
pub fn ws_url_override() -> Option<String> {
    std::env::var(ENV_WS_URL)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Remote-debugging port of an already-running browser, if configured.
pub fn debug_port_override() -> Option<u16> {
    std::env::var(ENV_DEBUG_PORT)
        .ok()
        .and_then(|v| v.trim().parse().ok())
}
