use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Shape of names produced by `generate_storage_key`: `<millis>-<nonce>[.<ext>]`.
static STORAGE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+-\d+(\.[a-z0-9]{1,8})?$").unwrap());

/// Result of one deletion attempt. Never an error: cleanup must not mask
/// the pipeline's own outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    Removed,
    /// Already gone (deleted by someone else, or never written).
    Missing,
    /// Deletion failed; logged.
    Failed,
}

/// Delete an uploaded artifact, logging instead of failing.
pub async fn remove_artifact(path: &Path) -> CleanupOutcome {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Artifact removed");
            CleanupOutcome::Removed
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Artifact already gone");
            CleanupOutcome::Missing
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove artifact");
            CleanupOutcome::Failed
        }
    }
}

// ═══════════════════════════════════════════════════════════
// CleanupGuard: RAII deletion backstop
// ═══════════════════════════════════════════════════════════

/// Owns the artifact path for the rest of a request.
///
/// Call `finish()` on every normal exit. If the request future is dropped
/// first (client went away, timeout), `Drop` deletes the file synchronously.
pub struct CleanupGuard {
    path: Option<PathBuf>,
}

impl CleanupGuard {
    pub fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Delete the artifact now and disarm the guard.
    pub async fn finish(mut self) -> CleanupOutcome {
        match self.path.take() {
            Some(path) => remove_artifact(&path).await,
            None => CleanupOutcome::Missing,
        }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "Artifact removed on drop"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to remove artifact on drop"
                    )
                }
            }
        }
    }
}

/// Remove files left in the upload directory by a previous crash.
///
/// Only regular files directly inside `dir` whose names look like storage
/// keys are touched; anything else in a shared directory is left alone.
/// Returns the count removed. A missing directory is not an error.
pub fn sweep_orphaned_uploads(dir: &Path) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return 0,
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if !is_storage_key(&entry.file_name()) {
            tracing::debug!(path = %path.display(), "Skipping file not created by upload store");
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove orphaned upload"
            ),
        }
    }

    if removed > 0 {
        tracing::info!(files_cleaned = removed, "Cleaned orphaned uploads from previous run");
    }
    removed
}

fn is_storage_key(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| STORAGE_KEY.is_match(n))
}
