use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use super::ExtractionError;

/// Progress event from an OCR run, 0–100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OcrProgress {
    pub percent: u8,
}

impl OcrProgress {
    pub fn new(percent: u8) -> Self {
        Self {
            percent: percent.min(100),
        }
    }
}

/// Caller-supplied progress channel. Observability only: a closed
/// receiver never fails recognition.
pub type ProgressSink = UnboundedSender<OcrProgress>;

/// Send a progress event, ignoring a dropped receiver.
pub fn report_progress(sink: Option<&ProgressSink>, percent: u8) {
    if let Some(tx) = sink {
        let _ = tx.send(OcrProgress::new(percent));
    }
}

/// OCR text that passed the minimum-length check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedText(String);

impl ExtractedText {
    /// Accept `raw` only if its trimmed form has at least `min_chars` characters.
    pub fn new(raw: String, min_chars: usize) -> Result<Self, ExtractionError> {
        let found = raw.trim().chars().count();
        if found < min_chars {
            return Err(ExtractionError::InsufficientText {
                found,
                required: min_chars,
            });
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// OCR engine abstraction (allows mocking for tests)
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Recognize text in the image at `image_path` using `language`
    /// (Tesseract code, e.g. `eng`).
    async fn recognize(
        &self,
        image_path: &Path,
        language: &str,
        progress: Option<&ProgressSink>,
    ) -> Result<String, ExtractionError>;
}
