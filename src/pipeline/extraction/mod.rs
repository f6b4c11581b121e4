pub mod types;
pub mod ocr;
pub mod pdf;
pub mod orchestrator;

pub use types::*;
pub use ocr::*;
pub use pdf::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The artifact disappeared or became unreadable between stages.
    #[error("Uploaded file is no longer available")]
    FileNotFound,

    #[error("Error in OCR: {0}")]
    Ocr(String),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error(
        "Could not extract enough text ({found} of {required} characters). \
         Please ensure the image is clear and contains readable text."
    )]
    InsufficientText { found: usize, required: usize },

    #[error("Text extraction timed out after {0}s")]
    Timeout(u64),
}
