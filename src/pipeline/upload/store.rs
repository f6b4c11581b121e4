use std::path::{Path, PathBuf};

use super::gate::{Admission, UploadedFile};
use super::UploadError;

/// A validated upload materialized on disk for the duration of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadArtifact {
    pub path: PathBuf,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl UploadArtifact {
    pub fn is_pdf(&self) -> bool {
        self.mime_type == super::MIME_PDF
    }
}

/// Upload directory. Created lazily on first store.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write an admitted upload under its storage key.
    pub async fn store(
        &self,
        upload: &UploadedFile,
        admission: &Admission,
    ) -> Result<UploadArtifact, UploadError> {
        // create_dir_all is a no-op when the directory already exists
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(&admission.storage_key);
        tokio::fs::write(&path, &upload.bytes).await?;

        tracing::debug!(
            storage_key = %admission.storage_key,
            size = upload.bytes.len(),
            mime = %admission.mime_type,
            "Upload stored"
        );

        Ok(UploadArtifact {
            path,
            original_name: admission.original_name.clone(),
            mime_type: admission.mime_type.clone(),
            size_bytes: upload.size_bytes(),
        })
    }
}
