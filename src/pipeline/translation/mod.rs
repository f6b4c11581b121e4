pub mod language;
pub mod sections;
pub mod translator;
pub mod google;

pub use language::*;
pub use sections::*;
pub use translator::*;
pub use google::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("Translation service is not configured")]
    NotConfigured,

    #[error("Translation service is not reachable at {0}")]
    Connection(String),

    #[error("Translation service returned error (status {status}): {body}")]
    Provider { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed translation response: {0}")]
    InvalidResponse(String),

    #[error("Translation timed out after {0}s")]
    Timeout(u64),
}
