use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::translator::TranslationProvider;
use super::TranslationError;

/// Google Cloud Translation v2 (`/language/translate/v2`) with an API key.
pub struct GoogleTranslateClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl GoogleTranslateClient {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self, TranslationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslationError::HttpClient(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs: timeout.as_secs(),
        })
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

fn first_translation(response: TranslateResponse) -> Result<String, TranslationError> {
    response
        .data
        .translations
        .into_iter()
        .next()
        .map(|t| t.translated_text)
        .ok_or_else(|| TranslationError::InvalidResponse("no translations".into()))
}

#[async_trait]
impl TranslationProvider for GoogleTranslateClient {
    async fn translate(&self, text: &str, target_code: &str) -> Result<String, TranslationError> {
        let body = TranslateRequest {
            q: text,
            target: target_code,
            // Plain text keeps newlines intact and avoids HTML entity escaping.
            format: "text",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranslationError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    TranslationError::Connection(self.endpoint.clone())
                } else {
                    TranslationError::HttpClient(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::InvalidResponse(e.without_url().to_string()))?;

        first_translation(parsed)
    }
}
