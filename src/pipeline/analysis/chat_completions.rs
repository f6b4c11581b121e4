use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::{AnalysisProvider, SamplingParams, UserContent};
use super::AnalysisError;

/// Client for an OpenAI-compatible `/chat/completions` endpoint
/// (Groq, OpenAI, vLLM, ...).
pub struct ChatCompletionsClient {
    base_url: String,
    api_key: Option<String>,
    text_model: String,
    vision_model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl ChatCompletionsClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
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
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            text_model: text_model.to_string(),
            vision_model: vision_model.to_string(),
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    fn model_for(&self, content: &UserContent) -> &str {
        match content {
            UserContent::Text(_) => &self.text_model,
            UserContent::Image { .. } => &self.vision_model,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Wire types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub(crate) struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoiceMessage {
    pub content: Option<String>,
}

pub(crate) fn build_request<'a>(
    model: &'a str,
    system_prompt: &'a str,
    user_content: &'a UserContent,
    sampling: &SamplingParams,
) -> ChatCompletionRequest<'a> {
    let user = match user_content {
        UserContent::Text(text) => MessageContent::Text(text),
        UserContent::Image { instruction, image } => MessageContent::Parts(vec![
            ContentPart::Text {
                text: instruction.clone(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                },
            },
        ]),
    };

    ChatCompletionRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(system_prompt),
            },
            ChatMessage {
                role: "user",
                content: user,
            },
        ],
        max_tokens: sampling.max_tokens,
        temperature: sampling.temperature,
    }
}

/// `choices[0].message.content`, non-empty after trimming.
pub(crate) fn primary_message(response: ChatCompletionResponse) -> Result<String, AnalysisError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AnalysisError::InvalidResponseStructure("no choices".into()))?;

    let content = choice
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| AnalysisError::InvalidResponseStructure("no message content".into()))?;

    if content.trim().is_empty() {
        return Err(AnalysisError::InvalidResponseStructure(
            "empty message content".into(),
        ));
    }
    Ok(content)
}

#[async_trait]
impl AnalysisProvider for ChatCompletionsClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &UserContent,
        sampling: &SamplingParams,
    ) -> Result<String, AnalysisError> {
        let url = format!("{}/chat/completions", self.base_url);
        let model = self.model_for(user_content);
        let body = build_request(model, system_prompt, user_content, sampling);

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
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

        // A 200 whose body is not the documented shape is a contract violation,
        // not a transport fault.
        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidResponseStructure(e.to_string()))?;

        let content = primary_message(parsed)?;
        tracing::debug!(model, response_len = content.len(), "Chat completion received");
        Ok(content)
    }
}

// ═══════════════════════════════════════════════════════════
// Mock
// ═══════════════════════════════════════════════════════════

/// Mock analysis provider for testing, returns a configurable response.
pub struct MockAnalysisProvider {
    response: Result<String, String>,
    calls: AtomicUsize,
    last_request: Mutex<Option<(String, UserContent)>>,
}

impl MockAnalysisProvider {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// A provider whose every call fails as a provider error.
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// System prompt and user content of the most recent call.
    pub fn last_request(&self) -> Option<(String, UserContent)> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }
}

#[async_trait]
impl AnalysisProvider for MockAnalysisProvider {
    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &UserContent,
        _sampling: &SamplingParams,
    ) -> Result<String, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some((system_prompt.to_string(), user_content.clone()));
        }
        match &self.response {
            Ok(text) if text.trim().is_empty() => Err(AnalysisError::InvalidResponseStructure(
                "empty message content".into(),
            )),
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(AnalysisError::Provider {
                status: 500,
                body: message.clone(),
            }),
        }
    }
}
