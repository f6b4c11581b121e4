//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::analysis::AnalysisError;
use crate::pipeline::extraction::ExtractionError;
use crate::pipeline::translation::TranslationError;
use crate::pipeline::upload::UploadError;
use crate::pipeline::ProcessingError;

/// Failure body. Mirrors the success shape so clients can branch on `success`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    #[serde(rename = "formattedOutput")]
    pub formatted_output: String,
    pub error: String,
    pub code: &'static str,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No file uploaded")]
    NoFile,
    #[error("{0}")]
    UnsupportedType(String),
    #[error("{0}")]
    FileTooLarge(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("File access error: {0}")]
    FileAccess(String),
    #[error("OCR failed: {0}")]
    OcrFailed(String),
    #[error("{0}")]
    InsufficientText(String),
    #[error("Invalid AI response: {0}")]
    InvalidAiResponse(String),
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),
    #[error("Translation failed: {0}")]
    TranslationFailed(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Status, stable machine code, and client-safe message.
    ///
    /// Provider and I/O details go to the log only.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::NoFile => (
                StatusCode::BAD_REQUEST,
                "NO_FILE",
                "No file uploaded".to_string(),
            ),
            ApiError::UnsupportedType(detail) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_TYPE",
                detail.clone(),
            ),
            ApiError::FileTooLarge(detail) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "FILE_TOO_LARGE",
                detail.clone(),
            ),
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                detail.clone(),
            ),
            ApiError::FileAccess(detail) => {
                tracing::error!(detail = %detail, "Uploaded file unavailable");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "FILE_ACCESS",
                    "Uploaded file is no longer available. Please upload it again.".to_string(),
                )
            }
            ApiError::OcrFailed(detail) => {
                tracing::error!(detail = %detail, "OCR failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "OCR_FAILED",
                    ocr_message(detail),
                )
            }
            ApiError::InsufficientText(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INSUFFICIENT_TEXT",
                detail.clone(),
            ),
            ApiError::InvalidAiResponse(detail) => {
                tracing::error!(detail = %detail, "Analysis response broke contract");
                (
                    StatusCode::BAD_GATEWAY,
                    "INVALID_AI_RESPONSE",
                    "The analysis service returned an invalid response".to_string(),
                )
            }
            ApiError::AnalysisFailed(detail) => {
                tracing::error!(detail = %detail, "Analysis provider error");
                (
                    StatusCode::BAD_GATEWAY,
                    "ANALYSIS_FAILED",
                    "The analysis service is unavailable. Please try again later.".to_string(),
                )
            }
            ApiError::TranslationFailed(detail) => {
                tracing::error!(detail = %detail, "Translation provider error");
                (
                    StatusCode::BAD_GATEWAY,
                    "TRANSLATION_FAILED",
                    "The report could not be translated".to_string(),
                )
            }
            ApiError::Timeout(detail) => {
                tracing::error!(detail = %detail, "Stage timed out");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "TIMEOUT",
                    format!("{detail}. Please try again."),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        }
    }
}

/// Longest recognizer message passed through to clients.
const MAX_OCR_DETAIL_CHARS: usize = 200;

/// Wrap the recognizer's message, dropping filesystem paths.
fn ocr_message(detail: &str) -> String {
    let cleaned: String = detail
        .split_whitespace()
        .map(|word| {
            if word.contains('/') || word.contains('\\') {
                "<path>"
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_OCR_DETAIL_CHARS)
        .collect();

    if cleaned.is_empty() {
        "Error in OCR: text could not be read from the image".to_string()
    } else {
        format!("Error in OCR: {cleaned}")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let body = ErrorBody {
            success: false,
            formatted_output: String::new(),
            error: message,
            code,
        };
        (status, Json(body)).into_response()
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::NoFile => ApiError::NoFile,
            e @ UploadError::UnsupportedType(..) => ApiError::UnsupportedType(e.to_string()),
            e @ UploadError::FileTooLarge { .. } => ApiError::FileTooLarge(e.to_string()),
            UploadError::Storage(e) => ApiError::Internal(format!("storage: {e}")),
        }
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        match err {
            e @ ExtractionError::FileNotFound => ApiError::FileAccess(e.to_string()),
            ExtractionError::Ocr(detail) => ApiError::OcrFailed(detail),
            ExtractionError::PdfParsing(detail) => ApiError::OcrFailed(format!("pdf: {detail}")),
            e @ ExtractionError::InsufficientText { .. } => {
                ApiError::InsufficientText(e.to_string())
            }
            e @ ExtractionError::Timeout(_) => ApiError::Timeout(e.to_string()),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidResponseStructure(detail) => ApiError::InvalidAiResponse(detail),
            e @ AnalysisError::Timeout(_) => ApiError::Timeout(e.to_string()),
            e => ApiError::AnalysisFailed(e.to_string()),
        }
    }
}

impl From<TranslationError> for ApiError {
    fn from(err: TranslationError) -> Self {
        match err {
            e @ TranslationError::Timeout(_) => ApiError::Timeout(e.to_string()),
            e => ApiError::TranslationFailed(e.to_string()),
        }
    }
}

impl From<ProcessingError> for ApiError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Upload(e) => e.into(),
            ProcessingError::Extraction(e) => e.into(),
            ProcessingError::Analysis(e) => e.into(),
            ProcessingError::Translation(e) => e.into(),
        }
    }
}
