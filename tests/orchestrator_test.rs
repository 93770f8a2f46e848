//! Extraction-loop behavior against scripted navigator/bridge doubles.

use async_trait::async_trait;
use sourcetap::core::error::{BridgeError, NO_SOURCES_FOUND, RUN_CANCELLED};
use sourcetap::core::types::{OpenReport, Progress};
use sourcetap::{CaptureBridge, Orchestrator, SourceNavigator};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct MockNavigator {
    total: usize,
    /// Entries whose detail view never opens (markers never appear).
    fail_open: HashSet<usize>,
    /// Entry index at which `open_entry` returns a hard error.
    error_at: Option<usize>,
    return_calls: AtomicUsize,
}

impl MockNavigator {
    fn new(total: usize) -> Self {
        Self {
            total,
            fail_open: HashSet::new(),
            error_at: None,
            return_calls: AtomicUsize::new(0),
        }
    }

    fn failing_open(mut self, index: usize) -> Self {
        self.fail_open.insert(index);
        self
    }

    fn erroring_at(mut self, index: usize) -> Self {
        self.error_at = Some(index);
        self
    }
}

#[async_trait]
impl SourceNavigator for &MockNavigator {
    async fn return_to_list(&self) -> anyhow::Result<bool> {
        self.return_calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn count_entries(&self) -> anyhow::Result<usize> {
        Ok(self.total)
    }

    async fn open_entry(&self, index: usize) -> anyhow::Result<OpenReport> {
        if self.error_at == Some(index) {
            anyhow::bail!("page evaluation failed: target closed");
        }
        if index >= self.total {
            return Ok(OpenReport::not_opened());
        }
        Ok(OpenReport {
            opened: !self.fail_open.contains(&index),
            title: format!("Source {}", index + 1),
        })
    }
}

/// Pops one scripted response per capture request, in order.
struct MockBridge {
    responses: Mutex<VecDeque<Result<Option<String>, BridgeError>>>,
}

impl MockBridge {
    fn scripted(responses: Vec<Result<Option<String>, BridgeError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }

    fn always(url: &str, times: usize) -> Self {
        Self::scripted((0..times).map(|_| Ok(Some(url.to_string()))).collect())
    }
}

#[async_trait]
impl CaptureBridge for &MockBridge {
    async fn capture_target_url(&self) -> Result<Option<String>, BridgeError> {
        self.responses
            .lock()
            .expect("bridge mock poisoned")
            .pop_front()
            .expect("more capture requests than scripted responses")
    }
}

fn orchestrator<'a>(
    nav: &'a MockNavigator,
    bridge: &'a MockBridge,
) -> Orchestrator<&'a MockNavigator, &'a MockBridge> {
    Orchestrator::new(nav, bridge, Duration::ZERO)
}

fn currents(progress: &[Progress]) -> Vec<usize> {
    progress.iter().map(|p| p.current).collect()
}

#[tokio::test]
async fn full_run_preserves_list_order() {
    let nav = MockNavigator::new(3);
    let bridge = MockBridge::scripted(vec![
        Ok(Some("http://x".to_string())),
        Ok(Some("http://y".to_string())),
        Ok(Some("http://z".to_string())),
    ]);

    let mut progress = Vec::new();
    let outcome = orchestrator(&nav, &bridge)
        .extract_all(|p| progress.push(p))
        .await;

    assert!(outcome.error.is_none());
    assert_eq!(outcome.total, 3);
    assert!(outcome.urls.len() <= outcome.total);
    let urls: Vec<&str> = outcome.urls.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec!["http://x", "http://y", "http://z"]);
    assert_eq!(outcome.urls[0].title, "Source 1");

    assert_eq!(currents(&progress), vec![1, 2, 3]);
    for p in &progress {
        assert_eq!(p.total, 3);
        assert_eq!(p.label, format!("{}/3", p.current));
    }
}

#[tokio::test]
async fn failed_open_is_skipped_without_capture_attempt() {
    // Entry 1 (the middle one) never opens; the bridge must only be asked
    // twice, and the outcome holds entries 1 and 3 in order.
    let nav = MockNavigator::new(3).failing_open(1);
    let bridge = MockBridge::scripted(vec![
        Ok(Some("http://x".to_string())),
        Ok(Some("http://y".to_string())),
    ]);

    let mut progress = Vec::new();
    let outcome = orchestrator(&nav, &bridge)
        .extract_all(|p| progress.push(p))
        .await;

    assert!(outcome.error.is_none());
    assert_eq!(outcome.urls.len(), 2);
    assert_eq!(outcome.urls[0].title, "Source 1");
    assert_eq!(outcome.urls[1].title, "Source 3");
    assert_eq!(outcome.urls[1].url, "http://y");

    // Progress is emitted for the skipped entry too.
    assert_eq!(currents(&progress), vec![1, 2, 3]);
    assert!(bridge.responses.lock().unwrap().is_empty());
}

#[tokio::test]
async fn capture_timeout_yields_no_result_but_run_continues() {
    let nav = MockNavigator::new(3);
    let bridge = MockBridge::scripted(vec![
        Ok(Some("http://x".to_string())),
        Ok(None), // reveal never fired window.open
        Ok(Some("http://z".to_string())),
    ]);

    let outcome = orchestrator(&nav, &bridge).extract_all(|_| {}).await;

    assert!(outcome.error.is_none());
    let urls: Vec<&str> = outcome.urls.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec!["http://x", "http://z"]);
}

#[tokio::test]
async fn unreachable_bridge_is_folded_into_no_url() {
    let nav = MockNavigator::new(2);
    let bridge = MockBridge::scripted(vec![
        Err(BridgeError::Unreachable("target gone".to_string())),
        Ok(Some("http://y".to_string())),
    ]);

    let outcome = orchestrator(&nav, &bridge).extract_all(|_| {}).await;

    assert!(outcome.error.is_none());
    assert_eq!(outcome.urls.len(), 1);
    assert_eq!(outcome.urls[0].url, "http://y");
}

#[tokio::test]
async fn empty_list_reports_no_sources_and_emits_no_progress() {
    let nav = MockNavigator::new(0);
    let bridge = MockBridge::scripted(vec![]);

    let mut progress = Vec::new();
    let outcome = orchestrator(&nav, &bridge)
        .extract_all(|p| progress.push(p))
        .await;

    assert!(outcome.urls.is_empty());
    assert_eq!(outcome.error.as_deref(), Some(NO_SOURCES_FOUND));
    assert!(progress.is_empty());
}

#[tokio::test]
async fn navigator_error_aborts_but_keeps_partial_results() {
    let nav = MockNavigator::new(3).erroring_at(1);
    let bridge = MockBridge::always("http://x", 3);

    let mut progress = Vec::new();
    let outcome = orchestrator(&nav, &bridge)
        .extract_all(|p| progress.push(p))
        .await;

    assert_eq!(outcome.urls.len(), 1);
    assert!(outcome
        .error
        .as_deref()
        .is_some_and(|e| e.contains("target closed")));
    assert_eq!(currents(&progress), vec![1]);
}

#[tokio::test]
async fn pre_cancelled_run_collects_nothing() {
    let nav = MockNavigator::new(3);
    let bridge = MockBridge::always("http://x", 3);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut progress = Vec::new();
    let outcome = Orchestrator::new(&nav, &bridge, Duration::ZERO)
        .with_cancellation(cancel)
        .extract_all(|p| progress.push(p))
        .await;

    assert!(outcome.urls.is_empty());
    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.error.as_deref(), Some(RUN_CANCELLED));
    assert!(progress.is_empty());
}

#[tokio::test]
async fn mid_run_cancellation_preserves_collected_results() {
    let nav = MockNavigator::new(3);
    let bridge = MockBridge::always("http://x", 3);
    let cancel = CancellationToken::new();

    // Cancel from inside the first progress emission: the loop must notice
    // at the next iteration boundary and stop without discarding what it
    // already collected.
    let mut progress = Vec::new();
    let outcome = {
        let cancel = cancel.clone();
        Orchestrator::new(&nav, &bridge, Duration::ZERO)
            .with_cancellation(cancel.clone())
            .extract_all(|p| {
                cancel.cancel();
                progress.push(p);
            })
            .await
    };

    assert_eq!(outcome.urls.len(), 1);
    assert_eq!(outcome.urls[0].url, "http://x");
    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.error.as_deref(), Some(RUN_CANCELLED));
    assert_eq!(currents(&progress), vec![1]);
}

#[tokio::test]
async fn list_view_is_restored_around_every_entry() {
    let nav = MockNavigator::new(2);
    let bridge = MockBridge::always("http://x", 2);

    let _ = orchestrator(&nav, &bridge).extract_all(|_| {}).await;

    // Initial return + one per entry + final cleanliness return.
    assert_eq!(nav.return_calls.load(Ordering::SeqCst), 4);
}
