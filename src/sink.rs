//! Output sink — renders the collected URLs into the plain-text export
//! artifact and writes it to disk.
//!
//! The format is line-oriented so it round-trips: header lines start with
//! `# `, titles with `## `, and every remaining non-empty line is a URL.

use crate::core::types::ExtractionResult;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::info;

pub const ARTIFACT_HEADER: &str = "# NotebookLM URL Export";

/// Render the export artifact:
///
/// ```text
/// # NotebookLM URL Export
/// # Generated: <RFC 3339>
/// # Total: <n> URLs
///
/// ## <title>        (omitted when the title is empty)
/// <url>
///
/// ```
pub fn render_artifact(results: &[ExtractionResult], generated_at: DateTime<Utc>) -> String {
    let mut content = String::new();
    content.push_str(ARTIFACT_HEADER);
    content.push('\n');
    content.push_str(&format!("# Generated: {}\n", generated_at.to_rfc3339()));
    content.push_str(&format!("# Total: {} URLs\n\n", results.len()));

    for r in results {
        if !r.title.is_empty() {
            content.push_str(&format!("## {}\n", r.title));
        }
        content.push_str(&r.url);
        content.push_str("\n\n");
    }
    content
}

/// Suggested artifact filename: `notebooklm_urls_<ISO-date>.txt`.
pub fn suggested_filename(generated_at: DateTime<Utc>) -> String {
    format!("notebooklm_urls_{}.txt", generated_at.format("%Y-%m-%d"))
}

/// Recover the URL lines from a rendered artifact, in order. Headers and
/// title lines all start with `#`; everything else non-empty is a URL.
pub fn parse_exported_urls(artifact: &str) -> Vec<String> {
    artifact
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Destination for a finished result list. Returns a human-readable
/// description of where the artifact went.
#[async_trait]
pub trait UrlSink: Send + Sync {
    async fn save(&self, results: &[ExtractionResult]) -> Result<String>;
}

/// Writes the artifact into a directory under the suggested filename.
pub struct TextFileSink {
    dir: PathBuf,
}

impl TextFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn target_path(&self, generated_at: DateTime<Utc>) -> PathBuf {
        self.dir.join(suggested_filename(generated_at))
    }
}

#[async_trait]
impl UrlSink for TextFileSink {
    async fn save(&self, results: &[ExtractionResult]) -> Result<String> {
        let now = Utc::now();
        let path = self.target_path(now);
        let artifact = render_artifact(results, now);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating output dir {}", self.dir.display()))?;
        tokio::fs::write(&path, artifact)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        info!("saved {} URLs to {}", results.len(), path.display());
        Ok(path.display().to_string())
    }
}
