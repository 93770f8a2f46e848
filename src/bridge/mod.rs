//! Interception bridge — captures the URL the page would open in a new tab.
//!
//! NotebookLM reveals a source's external link by calling `window.open`. The
//! bridge evaluates a Promise in the page's own execution context that swaps
//! in a one-shot `window.open` replacement, clicks the reveal control, and
//! resolves with the recorded argument — no tab is ever opened, so popup
//! blockers are irrelevant. The override window is minimal by construction:
//! installed immediately before the click, restored on first fire, on the
//! in-page timeout, and before every resolve path. There is never more than
//! one capture in flight, so the global is never contended.

use crate::core::config::{Selectors, Timing};
use crate::core::error::BridgeError;
use crate::dom::locator::js_str;
use async_trait::async_trait;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use tracing::{debug, warn};

/// Single-use capture request/response. `Ok(None)` means the reveal action
/// never fired `window.open` within the capture window; `Err(Unreachable)`
/// means the evaluation itself could not complete. The orchestrator treats
/// both as "no URL" but logs them distinctly.
#[async_trait]
pub trait CaptureBridge: Send + Sync {
    async fn capture_target_url(&self) -> Result<Option<String>, BridgeError>;
}

pub struct CdpCaptureBridge {
    page: Page,
    selectors: Selectors,
    timing: Timing,
}

impl CdpCaptureBridge {
    pub fn new(page: Page, selectors: Selectors, timing: Timing) -> Self {
        Self {
            page,
            selectors,
            timing,
        }
    }

    fn capture_script(&self) -> String {
        capture_script(&self.selectors, self.timing.capture_timeout)
    }
}

/// The in-page capture routine. Resolves with the captured URL, or null when
/// no reveal control exists or nothing fired within the timeout.
fn capture_script(selectors: &Selectors, capture_timeout: std::time::Duration) -> String {
    format!(
        r#"
(() => new Promise((resolve) => {{
    const originalOpen = window.open;
    let settled = false;
    const finish = (value) => {{
        if (settled) return;
        settled = true;
        window.open = originalOpen;
        resolve(value);
    }};

    window.open = function (url) {{
        window.open = originalOpen;
        finish(typeof url === 'string' ? url : String(url));
        return null;
    }};

    const button = document.querySelector({button});
    const link = document.querySelector({link});
    if (button) {{
        button.click();
    }} else if (link) {{
        link.click();
    }} else {{
        finish(null);
        return;
    }}

    setTimeout(() => finish(null), {timeout_ms});
}}))()
"#,
        button = js_str(&selectors.link_button),
        link = js_str(&selectors.title_link),
        timeout_ms = capture_timeout.as_millis(),
    )
}

#[async_trait]
impl CaptureBridge for CdpCaptureBridge {
    async fn capture_target_url(&self) -> Result<Option<String>, BridgeError> {
        let params = EvaluateParams::builder()
            .expression(self.capture_script())
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(BridgeError::Unreachable)?;

        // Outer bound on the whole round-trip: if the CDP connection stalls
        // or the page is gone, the in-page timeout never reaches us.
        let evaluated = tokio::time::timeout(
            self.timing.bridge_rpc_timeout,
            self.page.evaluate(params),
        )
        .await
        .map_err(|_| {
            BridgeError::Unreachable(format!(
                "no response within {:?}",
                self.timing.bridge_rpc_timeout
            ))
        })?
        .map_err(|e| BridgeError::Unreachable(e.to_string()))?;

        // An undefined/absent result is treated like null rather than a
        // transport failure: the evaluation itself did come back.
        let value = evaluated
            .into_value::<serde_json::Value>()
            .unwrap_or(serde_json::Value::Null);

        match value {
            serde_json::Value::String(s) if !s.is_empty() => {
                match url::Url::parse(&s) {
                    Ok(parsed) => debug!(
                        "capture: intercepted window.open ({})",
                        parsed.host_str().unwrap_or("no host")
                    ),
                    Err(_) => warn!("capture: intercepted non-URL argument: {:.60}", s),
                }
                Ok(Some(s))
            }
            _ => {
                debug!(
                    "capture: nothing fired within {:?}",
                    self.timing.capture_timeout
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TapConfig;

    #[test]
    fn capture_script_restores_before_every_resolve() {
        let cfg = TapConfig::default();
        let js = capture_script(&cfg.resolve_selectors(), cfg.resolve_timing().capture_timeout);
        assert!(js.contains("window.open = originalOpen"));
        assert!(js.contains(r#"".source-link-button""#));
        assert!(js.contains(r#"".source-title-link""#));
        assert!(js.contains("setTimeout(() => finish(null), 2000)"));
        // The one-shot replacement restores before resolving, and both the
        // no-control and timeout paths go through the same finish().
        assert_eq!(js.matches("finish(null)").count(), 2);
    }
}
