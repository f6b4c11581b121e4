use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::types::{report_progress, OcrProvider, ProgressSink};
use super::ExtractionError;

/// Tesseract engine mode: LSTM only.
const TESSERACT_OEM: &str = "1";
/// Tesseract page segmentation: fully automatic, no OSD.
const TESSERACT_PSM: &str = "3";

/// OCR via the `tesseract` command-line binary.
///
/// The binary must be on `PATH` (or configured explicitly) with the
/// traineddata for the requested language installed.
pub struct TesseractCli {
    binary: String,
}

impl TesseractCli {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl OcrProvider for TesseractCli {
    async fn recognize(
        &self,
        image_path: &Path,
        language: &str,
        progress: Option<&ProgressSink>,
    ) -> Result<String, ExtractionError> {
        report_progress(progress, 0);

        let output = tokio::process::Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", language, "--oem", TESSERACT_OEM, "--psm", TESSERACT_PSM])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed-out recognition drops this future; don't leave the process behind.
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExtractionError::Ocr(format!("failed to start {}: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or("recognizer exited with an error")
                .to_string();
            return Err(ExtractionError::Ocr(message));
        }

        report_progress(progress, 100);

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!(text_len = text.len(), language, "Tesseract recognition complete");
        Ok(text)
    }
}

/// Mock OCR engine for unit testing without Tesseract.
pub struct MockOcrProvider {
    result: Result<String, String>,
    calls: AtomicUsize,
    last_language: Mutex<Option<String>>,
}

impl MockOcrProvider {
    pub fn new(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            last_language: Mutex::new(None),
        }
    }

    /// A recognizer that always fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            last_language: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_language(&self) -> Option<String> {
        self.last_language.lock().ok().and_then(|l| l.clone())
    }
}

#[async_trait]
impl OcrProvider for MockOcrProvider {
    async fn recognize(
        &self,
        _image_path: &Path,
        language: &str,
        progress: Option<&ProgressSink>,
    ) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_language.lock() {
            *last = Some(language.to_string());
        }
        report_progress(progress, 0);
        report_progress(progress, 50);
        report_progress(progress, 100);
        self.result.clone().map_err(ExtractionError::Ocr)
    }
}
