//! Chromium session management over CDP.
//!
//! Two ways in:
//! * **Attach** — the user already has a logged-in browser running with
//!   `--remote-debugging-port`; we discover the websocket endpoint via the
//!   `/json/version` JSON API and connect.
//! * **Launch** — spawn a visible browser with a persistent profile under
//!   `~/.sourcetap/profile` (so the Google login survives restarts), then
//!   attach to it. Minimal flags; this is a browser the user interacts with,
//!   not a headless scraper.

use anyhow::{anyhow, Context, Result};
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::core::config;

/// Find a usable Chromium-family browser executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var (explicit override)
/// 2. PATH scan — finds package-manager installs on all platforms.
/// 3. OS-specific well-known install paths.
pub fn find_chrome_executable() -> Option<String> {
    if let Some(p) = config::chrome_executable_override() {
        return Some(p);
    }

    if let Ok(path_var) = std::env::var("PATH") {
        let candidates = [
            "google-chrome",
            "chromium",
            "chromium-browser",
            "chrome",
            "brave-browser",
            "brave",
        ];
        for dir in std::env::split_paths(&path_var) {
            for exe in candidates {
                let full = dir.join(exe);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidates = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/brave-browser",
            "/usr/local/bin/chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        let candidates = [
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    None
}

fn default_profile_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".sourcetap").join("profile"))
}

/// A connected CDP session. Launched browsers are closed on `close()`;
/// attached browsers are left running (they belong to the user).
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    launched: bool,
}

impl BrowserSession {
    /// Attach to a known CDP websocket endpoint.
    pub async fn attach_ws(ws_url: impl Into<String>) -> Result<Self> {
        let ws_url = ws_url.into();
        info!("attaching to CDP endpoint: {}", ws_url);
        let (browser, handler) = Browser::connect(ws_url)
            .await
            .map_err(|e| anyhow!("CDP connect failed: {}", e))?;
        Ok(Self {
            browser,
            handler_task: spawn_handler_task(handler),
            launched: false,
        })
    }

    /// Discover the websocket endpoint of a browser listening on
    /// `--remote-debugging-port=<port>` and attach to it.
    pub async fn attach_port(port: u16) -> Result<Self> {
        let ws_url = discover_ws_url(port, 5).await?;
        Self::attach_ws(ws_url).await
    }

    /// Spawn a visible browser with a persistent profile, attach to it, and
    /// open `start_url` in a fresh tab.
    pub async fn launch(start_url: &str, port: u16) -> Result<Self> {
        let exe = find_chrome_executable().ok_or_else(|| {
            anyhow!(
                "No browser found. Install Chrome, Chromium, or Brave, \
                 or set CHROME_EXECUTABLE."
            )
        })?;

        let mut args = vec![
            format!("--remote-debugging-port={}", port),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-infobars".to_string(),
        ];
        if let Some(dir) = default_profile_dir() {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating profile dir {}", dir.display()))?;
            args.push(format!("--user-data-dir={}", dir.display()));
        }

        info!("launching {} (debugging port {})", exe, port);
        std::process::Command::new(&exe)
            .args(&args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| anyhow!("Failed to spawn browser ({}): {}", exe, e))?;

        // Give the browser time to open the debugging port before probing.
        tokio::time::sleep(Duration::from_millis(3000)).await;

        let mut session = Self::attach_port(port).await?;
        session.launched = true;

        let page = session
            .browser
            .new_page(start_url)
            .await
            .map_err(|e| anyhow!("Failed to open {}: {}", start_url, e))?;
        let _ = page.bring_to_front().await;

        Ok(session)
    }

    /// Pick the open tab whose URL contains `fragment`.
    pub async fn find_page(&self, fragment: &str) -> Result<Page> {
        let pages = self
            .browser
            .pages()
            .await
            .map_err(|e| anyhow!("Failed to list pages: {}", e))?;

        let mut seen = Vec::new();
        for page in pages {
            let url = page.url().await.ok().flatten().unwrap_or_default();
            if url.contains(fragment) {
                info!("using tab: {}", url);
                let _ = page.bring_to_front().await;
                return Ok(page);
            }
            seen.push(url);
        }
        Err(anyhow!(
            "No open tab matches \"{}\". Open tabs: {:?}",
            fragment,
            seen
        ))
    }

    /// Close the session. Only browsers we launched ourselves are shut down.
    pub async fn close(mut self) {
        if self.launched {
            if let Err(e) = self.browser.close().await {
                warn!("browser close error (non-fatal): {}", e);
            }
        }
        self.handler_task.abort();
    }
}

fn spawn_handler_task(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                warn!("CDP handler error: {}", e);
            }
        }
    })
}

/// Query `http://127.0.0.1:<port>/json/version` for the browser-level
/// websocket debugger URL, with bounded retries.
async fn discover_ws_url(port: u16, attempts: u32) -> Result<String> {
    let json_url = format!("http://127.0.0.1:{}/json/version", port);
    let mut last_error = None;

    for attempt in 1..=attempts {
        let result: Result<String> = async {
            let response = reqwest::get(&json_url)
                .await
                .map_err(|e| anyhow!("HTTP request failed: {}", e))?;
            let json: serde_json::Value = response
                .json()
                .await
                .map_err(|e| anyhow!("JSON parse failed: {}", e))?;
            json["webSocketDebuggerUrl"]
                .as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| anyhow!("No webSocketDebuggerUrl in response"))
        }
        .await;

        match result {
            Ok(ws_url) => {
                info!("discovered CDP endpoint: {}", ws_url);
                return Ok(ws_url);
            }
            Err(e) => last_error = Some(e),
        }

        if attempt < attempts {
            info!("CDP discovery attempt {} failed, retrying...", attempt);
            tokio::time::sleep(Duration::from_millis(2000)).await;
        }
    }

    Err(anyhow!(
        "Failed to reach the debugging port after {} attempts. Last error: {:?}",
        attempts,
        last_error
    ))
}
