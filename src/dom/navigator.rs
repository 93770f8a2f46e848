//! DOM navigation against the live NotebookLM page.
//!
//! All clicks happen through evaluated JS; all waits are Rust-side polling
//! loops with fixed bounds. Nothing here caches DOM state: every operation
//! re-queries the list because Angular re-renders invalidate indices.

use crate::core::config::{Selectors, Timing};
use crate::core::types::OpenReport;
use crate::dom::locator::{js_str, LocatorStrategy};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::Page;
use std::sync::Arc;
use tracing::{debug, warn};

/// Navigation surface the orchestrator drives. Implemented over CDP for real
/// runs and by scripted mocks in tests.
#[async_trait]
pub trait SourceNavigator: Send + Sync {
    /// Ensure the list view is visible. Idempotent: when list markers are
    /// already present this returns `true` without performing any click.
    async fn return_to_list(&self) -> Result<bool>;

    /// Number of source entries under the current enumeration.
    async fn count_entries(&self) -> Result<usize>;

    /// Open entry `index`'s detail view. Out-of-range indices fail fast.
    async fn open_entry(&self, index: usize) -> Result<OpenReport>;
}

pub struct CdpNavigator {
    page: Page,
    selectors: Selectors,
    timing: Timing,
    locator: Arc<dyn LocatorStrategy>,
}

impl CdpNavigator {
    pub fn new(
        page: Page,
        selectors: Selectors,
        timing: Timing,
        locator: Arc<dyn LocatorStrategy>,
    ) -> Self {
        Self {
            page,
            selectors,
            timing,
            locator,
        }
    }

    async fn eval_json(&self, js: String) -> Result<serde_json::Value> {
        self.page
            .evaluate(js)
            .await
            .map_err(|e| anyhow!("page evaluation failed: {}", e))?
            .into_value::<serde_json::Value>()
            .map_err(|e| anyhow!("unexpected evaluation result: {}", e))
    }

    async fn eval_bool(&self, js: String) -> Result<bool> {
        Ok(self.eval_json(js).await?.as_bool().unwrap_or(false))
    }

    async fn count_matches(&self, selector: &str) -> Result<u64> {
        let js = format!(
            "document.querySelectorAll({}).length",
            js_str(selector)
        );
        Ok(self.eval_json(js).await?.as_u64().unwrap_or(0))
    }

    /// Poll until `selector` matches something or `timeout` elapses.
    async fn wait_for(&self, selector: &str, timeout: std::time::Duration) -> Result<bool> {
        let start = std::time::Instant::now();
        loop {
            if self.count_matches(selector).await? > 0 {
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
            tokio::time::sleep(self.timing.poll_interval).await;
        }
    }

    fn click_list_control_js(&self) -> String {
        click_list_control_js(&self.selectors)
    }

    fn entry_title_js(&self, index: usize) -> String {
        entry_title_js(&self.selectors, index)
    }
}

fn click_list_control_js(selectors: &Selectors) -> String {
    let labels = serde_json::to_string(&selectors.list_labels).expect("labels serialize");
    // offsetParent !== null filters out elements that are in the DOM but
    // not actually rendered (display:none subtrees, detached overlays).
    format!(
        r#"
(() => {{
    const labels = {labels};
    for (const el of document.querySelectorAll('span, button, div')) {{
        const text = (el.textContent || '').trim();
        if (labels.includes(text) && el.offsetParent !== null) {{
            el.click();
            return true;
        }}
    }}
    return false;
}})()
"#
    )
}

fn entry_title_js(selectors: &Selectors, index: usize) -> String {
    format!(
        r#"
(() => {{
    const entry = document.querySelectorAll({list})[{index}];
    if (!entry) return '';
    const el = entry.querySelector({title}) || entry.querySelector('div');
    return el && el.textContent ? el.textContent.trim() : '';
}})()
"#,
        list = js_str(&selectors.list_container),
        index = index,
        title = js_str(&selectors.source_title),
    )
}

#[async_trait]
impl SourceNavigator for CdpNavigator {
    async fn return_to_list(&self) -> Result<bool> {
        if self.count_matches(&self.selectors.list_container).await? > 0 {
            return Ok(true);
        }

        if !self.eval_bool(self.click_list_control_js()).await? {
            warn!("return_to_list: no visible control matched the list labels");
            return Ok(false);
        }

        let found = self
            .wait_for(&self.selectors.list_container, self.timing.list_return_timeout)
            .await?;
        // Let the re-rendered list settle before anyone indexes into it.
        tokio::time::sleep(self.timing.settle).await;

        if !found {
            warn!(
                "return_to_list: list markers did not appear within {:?}",
                self.timing.list_return_timeout
            );
        }
        Ok(found)
    }

    async fn count_entries(&self) -> Result<usize> {
        Ok(self.count_matches(&self.selectors.list_container).await? as usize)
    }

    async fn open_entry(&self, index: usize) -> Result<OpenReport> {
        let total = self.count_matches(&self.selectors.list_container).await? as usize;
        if index >= total {
            debug!("open_entry: index {} out of range ({} entries)", index, total);
            return Ok(OpenReport::not_opened());
        }

        let title = match self.eval_json(self.entry_title_js(index)).await? {
            serde_json::Value::String(s) if !s.is_empty() => s,
            _ => format!("Source {}", index + 1),
        };

        let candidates = self
            .eval_json(self.locator.count_candidates_js(index))
            .await?
            .as_u64()
            .unwrap_or(0);

        let detail_markers = self.selectors.detail_markers();
        for nth in 0..candidates {
            let clicked = self
                .eval_bool(self.locator.click_candidate_js(index, nth as usize))
                .await?;
            if !clicked {
                // The entry re-rendered under us and this candidate vanished.
                continue;
            }
            if self
                .wait_for(&detail_markers, self.timing.detail_open_timeout)
                .await?
            {
                return Ok(OpenReport {
                    opened: true,
                    title,
                });
            }
            debug!(
                "open_entry: candidate {}/{} of entry {} clicked but no detail markers",
                nth + 1,
                candidates,
                index
            );
        }

        Ok(OpenReport {
            opened: false,
            title,
        })
    }
}
