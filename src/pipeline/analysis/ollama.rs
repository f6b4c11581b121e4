use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::{AnalysisProvider, SamplingParams, UserContent};
use super::AnalysisError;

/// Ollama HTTP client for local inference via `/api/chat`.
///
/// Chat-template vision models (LLaVA, Gemma) need the messages format
/// when images are attached, so both text and X-ray requests use it.
pub struct OllamaClient {
    base_url: String,
    text_model: String,
    vision_model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(
        base_url: &str,
        text_model: &str,
        vision_model: &str,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            text_model: text_model.to_string(),
            vision_model: vision_model.to_string(),
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Local instance at localhost:11434.
    pub fn default_local(
        text_model: &str,
        vision_model: &str,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        Self::new("http://localhost:11434", text_model, vision_model, timeout)
    }
}

/// Request body for Ollama `/api/chat`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaChatMessage>,
    pub stream: bool,
    pub options: OllamaOptions,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct OllamaChatMessage {
    pub role: String,
    pub content: String,
    /// Base64-encoded images (only for user messages).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct OllamaOptions {
    pub temperature: f32,
    pub num_predict: i32,
}

/// Response body from Ollama `/api/chat` (non-streaming).
#[derive(Debug, Deserialize)]
pub(crate) struct OllamaChatResponse {
    pub message: Option<OllamaResponseMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OllamaResponseMessage {
    #[serde(default)]
    pub content: String,
}

pub(crate) fn build_chat_request(
    model: &str,
    system_prompt: &str,
    user_content: &UserContent,
    sampling: &SamplingParams,
) -> OllamaChatRequest {
    let user = match user_content {
        UserContent::Text(text) => OllamaChatMessage {
            role: "user".into(),
            content: text.clone(),
            images: None,
        },
        UserContent::Image { instruction, image } => OllamaChatMessage {
            role: "user".into(),
            content: instruction.clone(),
            images: Some(vec![image.base64.clone()]),
        },
    };

    OllamaChatRequest {
        model: model.to_string(),
        messages: vec![
            OllamaChatMessage {
                role: "system".into(),
                content: system_prompt.to_string(),
                images: None,
            },
            user,
        ],
        stream: false,
        options: OllamaOptions {
            temperature: sampling.temperature,
            num_predict: i32::try_from(sampling.max_tokens).unwrap_or(i32::MAX),
        },
    }
}

#[async_trait]
impl AnalysisProvider for OllamaClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &UserContent,
        sampling: &SamplingParams,
    ) -> Result<String, AnalysisError> {
        let url = format!("{}/api/chat", self.base_url);
        let model = match user_content {
            UserContent::Text(_) => &self.text_model,
            UserContent::Image { .. } => &self.vision_model,
        };
        let body = build_chat_request(model, system_prompt, user_content, sampling);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::from_reqwest(e, &self.base_url, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidResponseStructure(e.to_string()))?;

        let content = parsed
            .message
            .map(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AnalysisError::InvalidResponseStructure("empty message".into()))?;

        tracing::debug!(model = %model, response_len = content.len(), "Ollama chat completed");
        Ok(content)
    }
}
