//! Failure artifact capture.
//!
//! When a scenario fails, the screenshot, the full console buffer, and a
//! DOM snapshot are written next to each other so the failure can be
//! diagnosed without re-running the browser. Capture is best-effort:
//! each artifact that cannot be produced is logged and skipped, and the
//! original test error is always the one propagated.

use crate::browser::Page;
use crate::console::LogBuffer;
use chrono::Local;
use std::path::{Path, PathBuf};

/// Where each artifact landed; `None` for pieces that failed to capture.
#[derive(Debug, Default)]
pub struct ArtifactPaths {
    /// PNG screenshot of the page
    pub screenshot: Option<PathBuf>,
    /// Full console buffer, one `[level] text` line per entry
    pub console_log: Option<PathBuf>,
    /// Serialized DOM at time of failure
    pub dom: Option<PathBuf>,
}

impl ArtifactPaths {
    /// True when nothing could be captured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.screenshot.is_none() && self.console_log.is_none() && self.dom.is_none()
    }
}

/// Keep labels filesystem-safe.
fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Capture screenshot, console dump, and DOM snapshot into `dir`.
///
/// Files are named `<label>-<timestamp>.<ext>` so repeated failures of
/// the same scenario never overwrite each other. Never returns an
/// error; callers re-raise the failure that triggered the capture.
pub async fn capture_failure_artifacts(
    page: &Page,
    logs: &LogBuffer,
    dir: &Path,
    label: &str,
) -> ArtifactPaths {
    let mut paths = ArtifactPaths::default();

    if let Err(e) = std::fs::create_dir_all(dir) {
        tracing::warn!(dir = %dir.display(), error = %e, "artifact dir unavailable");
        return paths;
    }

    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let base = format!("{}-{stamp}", sanitize(label));

    match page.screenshot().await {
        Ok(bytes) if !bytes.is_empty() => {
            let path = dir.join(format!("{base}.png"));
            match std::fs::write(&path, &bytes) {
                Ok(()) => paths.screenshot = Some(path),
                Err(e) => tracing::warn!(error = %e, "screenshot write failed"),
            }
        }
        Ok(_) => tracing::warn!("screenshot was empty, skipping"),
        Err(e) => tracing::warn!(error = %e, "screenshot capture failed"),
    }

    let dump = logs.dump_lines().join("\n");
    let path = dir.join(format!("{base}-console.txt"));
    match std::fs::write(&path, dump) {
        Ok(()) => paths.console_log = Some(path),
        Err(e) => tracing::warn!(error = %e, "console dump write failed"),
    }

    match page.content().await {
        Ok(html) => {
            let path = dir.join(format!("{base}-dom.html"));
            match std::fs::write(&path, html) {
                Ok(()) => paths.dom = Some(path),
                Err(e) => tracing::warn!(error = %e, "dom snapshot write failed"),
            }
        }
        Err(e) => tracing::warn!(error = %e, "dom capture failed"),
    }

    tracing::info!(label, dir = %dir.display(), "failure artifacts captured");
    paths
}
