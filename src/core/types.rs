use serde::{Deserialize, Serialize};

/// One successfully captured source link.
///
/// Immutable once created; results are appended in processing order, which
/// equals the order of the source list at run start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Best-effort display title of the source. May be a synthesized
    /// `"Source N"` label when the list entry carried no usable text.
    pub title: String,
    /// The URL the host page would have opened in a new tab.
    pub url: String,
}

/// Terminal output of a full extraction run.
///
/// `urls.len() <= total` always holds; a missing entry means the item could
/// not be opened or yielded no URL within its capture window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub urls: Vec<ExtractionResult>,
    /// Number of list entries observed at run start.
    pub total: usize,
    /// Why the run stopped early or found nothing. `None` on a clean run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionOutcome {
    pub fn empty_with_error(error: impl Into<String>) -> Self {
        Self {
            urls: Vec::new(),
            total: 0,
            error: Some(error.into()),
        }
    }

    /// Count of entries that actually produced a URL.
    pub fn captured(&self) -> usize {
        self.urls.len()
    }
}

/// Result of trying to open one list entry's detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenReport {
    pub opened: bool,
    /// Title extracted from the entry, present even when the open failed
    /// (empty only for out-of-range indices).
    pub title: String,
}

impl OpenReport {
    pub fn not_opened() -> Self {
        Self {
            opened: false,
            title: String::new(),
        }
    }
}

/// Per-item progress notification, emitted exactly once per processed index.
///
/// `current` is strictly increasing from 1 to `total` for any run that
/// reaches the loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    /// Human-readable `"current/total"` label.
    pub label: String,
}

impl Progress {
    pub fn new(current: usize, total: usize) -> Self {
        Self {
            current,
            total,
            label: format!("{}/{}", current, total),
        }
    }
}
