//! Per-item extraction loop.
//!
//! The run is strictly sequential: the host UI has exactly one detail-view
//! slot, so entry `i+1` can only be opened after returning to the list from
//! entry `i`. The list is re-enumerated by the navigator on every operation;
//! no index survives a navigation.

use crate::bridge::CaptureBridge;
use crate::core::error::{BridgeError, NO_SOURCES_FOUND, RUN_CANCELLED};
use crate::core::types::{ExtractionOutcome, ExtractionResult, Progress};
use crate::dom::SourceNavigator;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct Orchestrator<N, B> {
    navigator: N,
    bridge: B,
    /// Pause between returning to the list and opening the next entry.
    settle: Duration,
    cancel: CancellationToken,
}

impl<N: SourceNavigator, B: CaptureBridge> Orchestrator<N, B> {
    pub fn new(navigator: N, bridge: B, settle: Duration) -> Self {
        Self {
            navigator,
            bridge,
            settle,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an external token so the caller can cancel mid-run (e.g. Ctrl-C).
    /// Cancellation is checked at each loop-iteration boundary; partial
    /// results are preserved.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Walk every list entry, capture its target URL, and report progress
    /// once per index. Per-item failures (open failure, capture timeout,
    /// unreachable bridge) are absorbed; only navigator errors abort the
    /// remaining loop, and even then collected results are returned.
    pub async fn extract_all<F>(&self, mut on_progress: F) -> ExtractionOutcome
    where
        F: FnMut(Progress),
    {
        let mut results: Vec<ExtractionResult> = Vec::new();

        // A failed initial return is rare (the markers check short-circuits)
        // and not fatal: enumeration below decides whether anything exists.
        match self.navigator.return_to_list().await {
            Ok(true) => {}
            Ok(false) => warn!("initial return_to_list found no list view"),
            Err(e) => {
                return ExtractionOutcome::empty_with_error(format!(
                    "could not reach the source list: {e:#}"
                ))
            }
        }

        let total = match self.navigator.count_entries().await {
            Ok(n) => n,
            Err(e) => {
                return ExtractionOutcome::empty_with_error(format!(
                    "could not enumerate sources: {e:#}"
                ))
            }
        };

        if total == 0 {
            return ExtractionOutcome::empty_with_error(NO_SOURCES_FOUND);
        }

        info!("found {} sources", total);
        let mut run_error: Option<String> = None;

        for i in 0..total {
            if self.cancel.is_cancelled() {
                warn!("cancelled after {}/{} entries", i, total);
                run_error = Some(RUN_CANCELLED.to_string());
                break;
            }

            if let Err(e) = self.navigator.return_to_list().await {
                warn!("[{}/{}] aborting run: {e:#}", i + 1, total);
                run_error = Some(format!("{e:#}"));
                break;
            }
            tokio::time::sleep(self.settle).await;

            let report = match self.navigator.open_entry(i).await {
                Ok(r) => r,
                Err(e) => {
                    warn!("[{}/{}] aborting run: {e:#}", i + 1, total);
                    run_error = Some(format!("{e:#}"));
                    break;
                }
            };

            if report.opened {
                // Exactly one capture attempt per opened item, no retries.
                match self.bridge.capture_target_url().await {
                    Ok(Some(url)) => {
                        info!("[{}/{}] captured {:.60}", i + 1, total, url);
                        results.push(ExtractionResult {
                            title: report.title,
                            url,
                        });
                    }
                    Ok(None) => {
                        info!("[{}/{}] no URL (reveal never fired)", i + 1, total);
                    }
                    Err(BridgeError::Unreachable(reason)) => {
                        warn!("[{}/{}] capture bridge unreachable: {}", i + 1, total, reason);
                    }
                }
            } else {
                info!("[{}/{}] could not open entry, skipping", i + 1, total);
            }

            on_progress(Progress::new(i + 1, total));
        }

        // Leave the UI back on the list view regardless of how we got here.
        if let Err(e) = self.navigator.return_to_list().await {
            warn!("final return_to_list failed: {e:#}");
        }

        info!("extraction complete: {}/{} URLs", results.len(), total);
        ExtractionOutcome {
            urls: results,
            total,
            error: run_error,
        }
    }
}
