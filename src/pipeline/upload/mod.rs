pub mod gate;
pub mod store;

pub use gate::*;
pub use store::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No file uploaded")]
    NoFile,

    #[error("Invalid file type '{0}'. Allowed types: {1}")]
    UnsupportedType(String, String),

    #[error("File too large: {size_mb:.1}MB exceeds {max_mb:.1}MB limit")]
    FileTooLarge { size_mb: f64, max_mb: f64 },

    #[error("Could not store uploaded file: {0}")]
    Storage(#[from] std::io::Error),
}

impl UploadError {
    /// Validation failures are the caller's fault; storage failures are ours.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}
