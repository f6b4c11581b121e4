pub mod api;
pub mod config;
pub mod pipeline;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use api::{ApiContext, Profiles};
use config::{AnalysisBackend, ServiceConfig};
use pipeline::analysis::{
    AnalysisError, AnalysisProvider, ChatCompletionsClient, OllamaClient, ReportAnalyzer,
    SamplingParams,
};
use pipeline::extraction::{TesseractCli, TextExtractor};
use pipeline::translation::{
    GoogleTranslateClient, SectionTranslator, TranslationError, TranslationProvider,
    UnconfiguredTranslator,
};
use pipeline::upload::ArtifactStore;
use pipeline::ReportProcessor;

/// Failures that prevent the service from starting or keep it from running.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Analysis provider setup failed: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Translation provider setup failed: {0}")]
    Translation(#[from] TranslationError),
    #[error("{0}")]
    Server(String),
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}

fn analysis_provider(config: &ServiceConfig) -> Result<Arc<dyn AnalysisProvider>, AnalysisError> {
    let timeout = config.analysis_timeout();
    let provider: Arc<dyn AnalysisProvider> = match config.analysis_backend {
        AnalysisBackend::ChatCompletions => {
            if config.analysis_api_key.is_none() {
                tracing::warn!(
                    "No analysis API key configured, provider calls will likely be rejected"
                );
            }
            Arc::new(ChatCompletionsClient::new(
                &config.analysis_base_url,
                config.analysis_api_key.clone(),
                &config.analysis_text_model,
                &config.analysis_vision_model,
                timeout,
            )?)
        }
        AnalysisBackend::Ollama => Arc::new(OllamaClient::new(
            &config.analysis_base_url,
            &config.analysis_text_model,
            &config.analysis_vision_model,
            timeout,
        )?),
    };
    Ok(provider)
}

fn translation_provider(
    config: &ServiceConfig,
) -> Result<Arc<dyn TranslationProvider>, TranslationError> {
    let provider: Arc<dyn TranslationProvider> = match &config.translation_api_key {
        Some(key) => Arc::new(GoogleTranslateClient::new(
            &config.translation_base_url,
            key,
            config.translation_timeout(),
        )?),
        None => {
            tracing::warn!(
                "No translation API key configured, only the default language is served"
            );
            Arc::new(UnconfiguredTranslator)
        }
    };
    Ok(provider)
}

/// Wire the production providers from configuration.
pub fn build_processor(config: &ServiceConfig) -> Result<ReportProcessor, StartupError> {
    let extractor = TextExtractor::new(
        Arc::new(TesseractCli::new(&config.tesseract_bin)),
        &config.ocr_language,
        config.ocr_timeout(),
    );
    let analyzer = ReportAnalyzer::new(
        analysis_provider(config)?,
        SamplingParams {
            max_tokens: config.analysis_max_tokens,
            temperature: config.analysis_temperature,
        },
        config.analysis_timeout(),
    );
    let translator = SectionTranslator::new(
        translation_provider(config)?,
        &config.default_language,
        config.translation_timeout(),
    );

    Ok(ReportProcessor::new(
        ArtifactStore::new(config.upload_dir.clone()),
        extractor,
        analyzer,
        translator,
    )
    .with_min_text_chars(config.min_text_chars))
}

/// Build the full HTTP application for `config`.
pub fn build_app(config: &ServiceConfig) -> Result<axum::Router, StartupError> {
    let processor = build_processor(config)?;
    let ctx = ApiContext::new(
        Arc::new(processor),
        Profiles::with_max_upload(config.max_upload_bytes),
    );
    Ok(api::api_router(ctx, &config.cors_origins))
}

/// Service entry point: load config, sweep stale uploads, serve until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    init_tracing();

    let config = ServiceConfig::from_env();
    tracing::info!(
        version = config::APP_VERSION,
        addr = %config.bind_addr,
        backend = ?config.analysis_backend,
        "{} starting",
        config::APP_NAME
    );

    pipeline::cleanup::sweep_orphaned_uploads(&config.upload_dir);

    let app = build_app(&config)?;
    api::serve_until_ctrl_c(config.bind_addr, app)
        .await
        .map_err(StartupError::Server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServiceConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn builds_with_default_config() {
        let config = config_from(&[]);
        assert!(build_processor(&config).is_ok());
    }

    #[test]
    fn builds_ollama_backend_with_translation_key() {
        let config = config_from(&[
            ("DIAGNO_ANALYSIS_BACKEND", "ollama"),
            ("DIAGNO_ANALYSIS_BASE_URL", "http://localhost:11434"),
            ("DIAGNO_TRANSLATION_API_KEY", "k"),
        ]);
        assert!(build_app(&config).is_ok());
    }

    #[test]
    fn init_tracing_twice_is_harmless() {
        init_tracing();
        init_tracing();
    }
}
