pub mod types;
pub mod prompt;
pub mod chat_completions;
pub mod ollama;
pub mod normalize;
pub mod analyzer;

pub use types::*;
pub use prompt::*;
pub use chat_completions::*;
pub use ollama::*;
pub use normalize::*;
pub use analyzer::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The service answered, but without a usable message payload.
    /// Not retryable: the response shape itself broke the contract.
    #[error("Invalid response structure from analysis service: {0}")]
    InvalidResponseStructure(String),

    #[error("Analysis service is not reachable at {0}")]
    Connection(String),

    #[error("Analysis service returned error (status {status}): {body}")]
    Provider { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Analysis timed out after {0}s")]
    Timeout(u64),
}

impl AnalysisError {
    /// Map a reqwest failure the same way for every backend.
    pub(crate) fn from_reqwest(e: reqwest::Error, base_url: &str, timeout_secs: u64) -> Self {
        if e.is_timeout() {
            AnalysisError::Timeout(timeout_secs)
        } else if e.is_connect() {
            AnalysisError::Connection(base_url.to_string())
        } else {
            AnalysisError::HttpClient(e.to_string())
        }
    }
}
