use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::AnalysisError;

/// Which kind of input the analyzer receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// OCR text of a written report.
    #[default]
    Text,
    /// The radiograph itself, sent to an image-capable model.
    Xray,
}

impl AnalysisMode {
    /// Parse the inbound `mode` flag. Anything but `xray` is text mode.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(|f| f.trim().to_ascii_lowercase()) {
            Some(f) if f == "xray" || f == "x-ray" => AnalysisMode::Xray,
            _ => AnalysisMode::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Text => "text",
            AnalysisMode::Xray => "xray",
        }
    }
}

/// Image payload, already base64-encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    pub base64: String,
}

impl InlineImage {
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// `data:` URL form used by chat-completions image parts.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// User turn of an analysis request.
#[derive(Debug, Clone, PartialEq)]
pub enum UserContent {
    Text(String),
    Image {
        instruction: String,
        image: InlineImage,
    },
}

impl UserContent {
    pub fn kind(&self) -> &'static str {
        match self {
            UserContent::Text(_) => "text",
            UserContent::Image { .. } => "image",
        }
    }
}

/// Sampling settings sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.3,
        }
    }
}

/// External structured-analysis service (allows mocking for tests).
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Run one completion and return the primary message text.
    ///
    /// A response without a non-empty message must surface as
    /// `AnalysisError::InvalidResponseStructure`.
    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &UserContent,
        sampling: &SamplingParams,
    ) -> Result<String, AnalysisError>;
}
