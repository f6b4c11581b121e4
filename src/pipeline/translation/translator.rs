use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::try_join_all;

use super::language::get_language_code;
use super::sections::{parse_section, split_sections};
use super::TranslationError;

/// Machine translation service (allows mocking for tests).
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate(&self, text: &str, target_code: &str) -> Result<String, TranslationError>;
}

/// Translates a structured analysis section by section, leaving every
/// `N. Title:` header byte-identical.
pub struct SectionTranslator {
    provider: Arc<dyn TranslationProvider>,
    source_code: String,
    timeout: Duration,
}

impl SectionTranslator {
    pub fn new(
        provider: Arc<dyn TranslationProvider>,
        source_code: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            source_code: source_code.to_string(),
            timeout,
        }
    }

    /// Whether `target_language` would trigger any provider calls.
    pub fn needs_translation(&self, target_language: &str) -> bool {
        get_language_code(target_language) != self.source_code
    }

    /// Translate `analysis` into `target_language` (a language name).
    ///
    /// Returns the input untouched when the target resolves to the source
    /// language. Segments are translated concurrently and reassembled in
    /// their original order, separated by a blank line.
    pub async fn translate_analysis(
        &self,
        analysis: &str,
        target_language: &str,
    ) -> Result<String, TranslationError> {
        let target = get_language_code(target_language);
        if target == self.source_code {
            return Ok(analysis.to_string());
        }

        let segments: Vec<&str> = split_sections(analysis)
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect();

        let start = std::time::Instant::now();
        let translated =
            try_join_all(segments.iter().map(|segment| self.translate_segment(segment, target)))
                .await?;

        tracing::info!(
            target_code = target,
            segments = segments.len(),
            elapsed_ms = %start.elapsed().as_millis(),
            "Analysis translated"
        );
        Ok(translated.join("\n\n"))
    }

    async fn translate_segment(
        &self,
        segment: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        let section = parse_section(segment);
        match section.header {
            Some(header) if section.body.is_empty() => Ok(header.to_string()),
            Some(header) => {
                let body = self.call(section.body, target).await?;
                Ok(format!("{header}\n{body}"))
            }
            None => {
                tracing::debug!("Segment without numbered header, translating whole");
                self.call(section.body, target).await
            }
        }
    }

    async fn call(&self, text: &str, target: &str) -> Result<String, TranslationError> {
        tokio::time::timeout(self.timeout, self.provider.translate(text, target))
            .await
            .map_err(|_| TranslationError::Timeout(self.timeout.as_secs()))?
    }
}

// ═══════════════════════════════════════════════════════════
// Non-network providers
// ═══════════════════════════════════════════════════════════

/// Used when no translation credentials are configured. Default-language
/// requests never reach it; anything else fails cleanly.
pub struct UnconfiguredTranslator;

#[async_trait]
impl TranslationProvider for UnconfiguredTranslator {
    async fn translate(&self, _text: &str, _target_code: &str) -> Result<String, TranslationError> {
        Err(TranslationError::NotConfigured)
    }
}

/// Returns text unchanged; counts calls.
#[derive(Default)]
pub struct IdentityTranslator {
    calls: AtomicUsize,
}

impl IdentityTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationProvider for IdentityTranslator {
    async fn translate(&self, text: &str, _target_code: &str) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text.to_string())
    }
}

/// Mock translator for testing: tags text with the target code, or fails
/// when the text contains a configured trigger.
pub struct MockTranslationProvider {
    fail_on: Option<String>,
    calls: AtomicUsize,
}

impl MockTranslationProvider {
    pub fn new() -> Self {
        Self {
            fail_on: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail any call whose text contains `trigger`.
    pub fn failing_on(trigger: &str) -> Self {
        Self {
            fail_on: Some(trigger.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTranslationProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranslationProvider for MockTranslationProvider {
    async fn translate(&self, text: &str, target_code: &str) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(trigger) = &self.fail_on {
            if text.contains(trigger.as_str()) {
                return Err(TranslationError::Provider {
                    status: 500,
                    body: "mock failure".into(),
                });
            }
        }
        Ok(format!("[{target_code}] {text}"))
    }
}
