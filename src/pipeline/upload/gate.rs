use std::path::Path;

use serde::{Deserialize, Serialize};

use super::UploadError;

pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_GIF: &str = "image/gif";
pub const MIME_PDF: &str = "application/pdf";

/// Image types every profile accepts.
pub const IMAGE_TYPES: &[&str] = &[MIME_JPEG, MIME_PNG, MIME_GIF];

/// A file part received from the transport layer, not yet validated.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Accept/reject rules for one pipeline profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadPolicy {
    pub allowed_types: Vec<String>,
    pub max_size_bytes: u64,
}

/// Positive decision from `UploadPolicy::admit`.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    /// Unique file name the artifact will be stored under.
    pub storage_key: String,
    /// Normalized MIME type (lowercase, parameters stripped).
    pub mime_type: String,
    /// Original file name with path components removed.
    pub original_name: String,
}

impl UploadPolicy {
    pub fn new(allowed_types: &[&str], max_size_bytes: u64) -> Self {
        Self {
            allowed_types: allowed_types.iter().map(|t| t.to_string()).collect(),
            max_size_bytes,
        }
    }

    pub fn allows(&self, mime_type: &str) -> bool {
        let normalized = normalize_mime(mime_type);
        self.allowed_types.iter().any(|t| *t == normalized)
    }

    /// Validate an upload. Pure: never touches the filesystem.
    ///
    /// Checks run in order: presence, type, size.
    pub fn admit(&self, upload: Option<&UploadedFile>) -> Result<Admission, UploadError> {
        let upload = upload.ok_or(UploadError::NoFile)?;

        let mime_type = normalize_mime(&upload.content_type);
        if !self.allows(&mime_type) {
            return Err(UploadError::UnsupportedType(
                mime_type,
                self.allowed_types.join(", "),
            ));
        }

        if upload.size_bytes() > self.max_size_bytes {
            return Err(UploadError::FileTooLarge {
                size_mb: upload.size_bytes() as f64 / (1024.0 * 1024.0),
                max_mb: self.max_size_bytes as f64 / (1024.0 * 1024.0),
            });
        }

        let original_name = sanitize_filename(&upload.file_name);
        let storage_key = generate_storage_key(&original_name, &mime_type);

        Ok(Admission {
            storage_key,
            mime_type,
            original_name,
        })
    }
}

/// Lowercase and drop parameters (`image/PNG; charset=x` → `image/png`).
pub fn normalize_mime(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// `<unix millis>-<random integer><.ext>`, unique enough for concurrent
/// requests sharing one upload directory.
pub fn generate_storage_key(original_name: &str, mime_type: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let nonce: u32 = rand::random::<u32>() % 1_000_000_000;
    match file_extension(original_name, mime_type) {
        Some(ext) => format!("{millis}-{nonce}.{ext}"),
        None => format!("{millis}-{nonce}"),
    }
}

/// Extension from the original name, or from the MIME type when the name
/// has none. Only short alphanumeric extensions are kept.
fn file_extension(original_name: &str, mime_type: &str) -> Option<String> {
    let from_name = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    let from_mime = || {
        mime_guess::get_mime_extensions_str(mime_type)
            .and_then(|exts| exts.first())
            .map(|e| e.to_string())
    };

    from_name
        .or_else(from_mime)
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Strip path components and NULs, cap at 255 characters.
pub fn sanitize_filename(original: &str) -> String {
    let unified = original.replace('\\', "/");
    let name = Path::new(&unified)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "document".to_string()
    } else {
        clean
    }
}
