use std::sync::Arc;
use std::time::Duration;

use super::pdf::extract_pdf_text;
use super::types::{OcrProvider, ProgressSink};
use super::ExtractionError;
use crate::pipeline::upload::UploadArtifact;

/// Turns an accepted artifact into raw text.
///
/// Images go through the injected `OcrProvider`; PDFs (only admitted by
/// PDF-capable profiles) are read through their text layer.
pub struct TextExtractor {
    ocr: Arc<dyn OcrProvider>,
    language: String,
    timeout: Duration,
}

impl TextExtractor {
    pub fn new(ocr: Arc<dyn OcrProvider>, language: &str, timeout: Duration) -> Self {
        Self {
            ocr,
            language: language.to_string(),
            timeout,
        }
    }

    pub async fn extract(
        &self,
        artifact: &UploadArtifact,
        progress: Option<&ProgressSink>,
    ) -> Result<String, ExtractionError> {
        ensure_readable(artifact).await?;

        if artifact.is_pdf() {
            let bytes = read_artifact(artifact).await?;
            return run_blocking(self.timeout, move || extract_pdf_text(&bytes)).await;
        }

        let start = std::time::Instant::now();
        let text = tokio::time::timeout(
            self.timeout,
            self.ocr.recognize(&artifact.path, &self.language, progress),
        )
        .await
        .map_err(|_| ExtractionError::Timeout(self.timeout.as_secs()))??;

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            text_len = text.len(),
            language = %self.language,
            "OCR extraction complete"
        );
        Ok(text)
    }
}

/// Run a CPU-bound parse off the runtime, bounded by `timeout`.
///
/// On timeout the blocking thread is left to finish on its own; its result
/// is discarded.
async fn run_blocking<T, F>(timeout: Duration, work: F) -> Result<T, ExtractionError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ExtractionError> + Send + 'static,
{
    let handle = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(timeout, handle).await {
        Ok(joined) => {
            joined.map_err(|e| ExtractionError::PdfParsing(format!("extraction task failed: {e}")))?
        }
        Err(_) => {
            tracing::warn!(timeout_secs = timeout.as_secs(), "PDF text extraction timed out");
            Err(ExtractionError::Timeout(timeout.as_secs()))
        }
    }
}

/// Fail fast with `FileNotFound` instead of letting the recognizer produce
/// a less specific error.
pub async fn ensure_readable(artifact: &UploadArtifact) -> Result<(), ExtractionError> {
    match tokio::fs::metadata(&artifact.path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => {
            tracing::warn!(path = %artifact.path.display(), "Artifact path is not a file");
            Err(ExtractionError::FileNotFound)
        }
        Err(e) => {
            tracing::warn!(path = %artifact.path.display(), error = %e, "Artifact not readable");
            Err(ExtractionError::FileNotFound)
        }
    }
}

/// Read the whole artifact, mapping any I/O failure to `FileNotFound`.
pub async fn read_artifact(artifact: &UploadArtifact) -> Result<Vec<u8>, ExtractionError> {
    tokio::fs::read(&artifact.path).await.map_err(|e| {
        tracing::warn!(path = %artifact.path.display(), error = %e, "Artifact read failed");
        ExtractionError::FileNotFound
    })
}
