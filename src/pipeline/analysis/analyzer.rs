use std::sync::Arc;
use std::time::Duration;

use super::normalize::normalize_analysis;
use super::prompt::{PromptTemplate, XRAY_USER_INSTRUCTION};
use super::types::{AnalysisMode, AnalysisProvider, InlineImage, SamplingParams, UserContent};
use super::AnalysisError;
use crate::pipeline::translation::count_numbered_sections;

/// Number of numbered sections the prompt contract asks for.
pub const EXPECTED_SECTION_COUNT: usize = 5;

/// Sends report text or a radiograph to the analysis provider under the
/// profile's prompt contract.
pub struct ReportAnalyzer {
    provider: Arc<dyn AnalysisProvider>,
    sampling: SamplingParams,
    timeout: Duration,
}

/// What the analyzer is given for one request.
#[derive(Debug, Clone)]
pub enum AnalysisInput<'a> {
    Text(&'a str),
    Image(InlineImage),
}

impl ReportAnalyzer {
    pub fn new(
        provider: Arc<dyn AnalysisProvider>,
        sampling: SamplingParams,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            sampling,
            timeout,
        }
    }

    pub async fn analyze(
        &self,
        input: AnalysisInput<'_>,
        prompt: &PromptTemplate,
        mode: AnalysisMode,
    ) -> Result<String, AnalysisError> {
        let user_content = match input {
            AnalysisInput::Text(text) => UserContent::Text(PromptTemplate::report_user_text(text)),
            AnalysisInput::Image(image) => UserContent::Image {
                instruction: XRAY_USER_INSTRUCTION.to_string(),
                image,
            },
        };

        let start = std::time::Instant::now();
        let raw = tokio::time::timeout(
            self.timeout,
            self.provider.complete(&prompt.system, &user_content, &self.sampling),
        )
        .await
        .map_err(|_| AnalysisError::Timeout(self.timeout.as_secs()))??;

        if raw.trim().is_empty() {
            return Err(AnalysisError::InvalidResponseStructure(
                "empty message content".into(),
            ));
        }

        let analysis = match mode {
            AnalysisMode::Xray => normalize_analysis(&raw),
            AnalysisMode::Text => raw.trim().to_string(),
        };

        let sections = count_numbered_sections(&analysis);
        if sections != EXPECTED_SECTION_COUNT {
            // Tolerated: the translator and formatter degrade gracefully.
            tracing::warn!(
                sections,
                expected = EXPECTED_SECTION_COUNT,
                mode = mode.as_str(),
                "Analysis deviates from the section contract"
            );
        }

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            input_kind = user_content.kind(),
            response_len = analysis.len(),
            sections,
            "Analysis complete"
        );
        Ok(analysis)
    }
}
