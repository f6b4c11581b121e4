use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "Diagno";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default upload size ceiling (5 MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Minimum trimmed OCR output, in characters, before analysis is attempted.
pub const DEFAULT_MIN_TEXT_CHARS: usize = 10;

/// Language code that needs no translation pass.
pub const DEFAULT_LANGUAGE_CODE: &str = "en";

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "diagno_lib=info,diagno=info,tower_http=info"
}

/// Directory where uploaded artifacts live for the duration of a request.
/// `<cache dir>/Diagno/uploads`, falling back to the system temp dir.
pub fn default_upload_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
        .join("uploads")
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Which structured-analysis API the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisBackend {
    /// OpenAI-compatible `/chat/completions` endpoint (hosted providers).
    ChatCompletions,
    /// Local Ollama instance via `/api/chat`.
    Ollama,
}

impl AnalysisBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai" | "chat_completions" | "chat-completions" => Some(Self::ChatCompletions),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }
}

/// Full service configuration.
///
/// Every field has a working default; `from_env()` overrides from
/// `DIAGNO_*` environment variables. Secrets are never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub min_text_chars: usize,
    pub cors_origins: Vec<String>,

    pub tesseract_bin: String,
    pub ocr_language: String,
    pub ocr_timeout_secs: u64,

    pub analysis_backend: AnalysisBackend,
    pub analysis_base_url: String,
    #[serde(skip)]
    pub analysis_api_key: Option<String>,
    pub analysis_text_model: String,
    pub analysis_vision_model: String,
    pub analysis_max_tokens: u32,
    pub analysis_temperature: f32,
    pub analysis_timeout_secs: u64,

    pub translation_base_url: String,
    #[serde(skip)]
    pub translation_api_key: Option<String>,
    pub translation_timeout_secs: u64,
    pub default_language: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            upload_dir: default_upload_dir(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            min_text_chars: DEFAULT_MIN_TEXT_CHARS,
            cors_origins: vec![
                "http://localhost:3000".into(),
                "http://localhost:3001".into(),
            ],
            tesseract_bin: "tesseract".into(),
            ocr_language: "eng".into(),
            ocr_timeout_secs: 120,
            analysis_backend: AnalysisBackend::ChatCompletions,
            analysis_base_url: "https://api.groq.com/openai/v1".into(),
            analysis_api_key: None,
            analysis_text_model: "llama-3.3-70b-versatile".into(),
            analysis_vision_model: "llama-3.2-90b-vision-preview".into(),
            analysis_max_tokens: 1024,
            analysis_temperature: 0.3,
            analysis_timeout_secs: 120,
            translation_base_url: "https://translation.googleapis.com/language/translate/v2".into(),
            translation_api_key: None,
            translation_timeout_secs: 30,
            default_language: DEFAULT_LANGUAGE_CODE.into(),
        }
    }
}

impl ServiceConfig {
    /// Build configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (testable without
    /// touching the process environment).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(addr) = get("DIAGNO_BIND_ADDR") {
            match addr.parse() {
                Ok(parsed) => config.bind_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid DIAGNO_BIND_ADDR, using default"),
            }
        }
        if let Some(dir) = get("DIAGNO_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        config.max_upload_bytes = parse_or(
            get("DIAGNO_MAX_UPLOAD_BYTES"),
            "DIAGNO_MAX_UPLOAD_BYTES",
            config.max_upload_bytes,
        );
        config.min_text_chars =
            parse_or(get("DIAGNO_MIN_TEXT_CHARS"), "DIAGNO_MIN_TEXT_CHARS", config.min_text_chars);
        if let Some(origins) = get("DIAGNO_CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        if let Some(bin) = get("DIAGNO_TESSERACT_BIN") {
            config.tesseract_bin = bin;
        }
        if let Some(lang) = get("DIAGNO_OCR_LANGUAGE") {
            config.ocr_language = lang;
        }
        config.ocr_timeout_secs = parse_or(
            get("DIAGNO_OCR_TIMEOUT_SECS"),
            "DIAGNO_OCR_TIMEOUT_SECS",
            config.ocr_timeout_secs,
        );

        if let Some(backend) = get("DIAGNO_ANALYSIS_BACKEND") {
            match AnalysisBackend::parse(&backend) {
                Some(parsed) => config.analysis_backend = parsed,
                None => tracing::warn!(
                    value = %backend,
                    "Unknown DIAGNO_ANALYSIS_BACKEND, using default"
                ),
            }
        }
        if config.analysis_backend == AnalysisBackend::Ollama {
            config.analysis_base_url = "http://localhost:11434".into();
        }
        if let Some(url) = get("DIAGNO_ANALYSIS_BASE_URL") {
            config.analysis_base_url = url;
        }
        config.analysis_api_key = get("DIAGNO_ANALYSIS_API_KEY").or_else(|| get("GROQ_API_KEY"));
        if let Some(model) = get("DIAGNO_ANALYSIS_TEXT_MODEL") {
            config.analysis_text_model = model;
        }
        if let Some(model) = get("DIAGNO_ANALYSIS_VISION_MODEL") {
            config.analysis_vision_model = model;
        }
        config.analysis_max_tokens = parse_or(
            get("DIAGNO_ANALYSIS_MAX_TOKENS"),
            "DIAGNO_ANALYSIS_MAX_TOKENS",
            config.analysis_max_tokens,
        );
        config.analysis_temperature = parse_or(
            get("DIAGNO_ANALYSIS_TEMPERATURE"),
            "DIAGNO_ANALYSIS_TEMPERATURE",
            config.analysis_temperature,
        );
        config.analysis_timeout_secs = parse_or(
            get("DIAGNO_ANALYSIS_TIMEOUT_SECS"),
            "DIAGNO_ANALYSIS_TIMEOUT_SECS",
            config.analysis_timeout_secs,
        );

        if let Some(url) = get("DIAGNO_TRANSLATION_BASE_URL") {
            config.translation_base_url = url;
        }
        config.translation_api_key =
            get("DIAGNO_TRANSLATION_API_KEY").or_else(|| get("GOOGLE_TRANSLATE_API_KEY"));
        config.translation_timeout_secs = parse_or(
            get("DIAGNO_TRANSLATION_TIMEOUT_SECS"),
            "DIAGNO_TRANSLATION_TIMEOUT_SECS",
            config.translation_timeout_secs,
        );

        config
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn translation_timeout(&self) -> Duration {
        Duration::from_secs(self.translation_timeout_secs)
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, fallback: T) -> T {
    match raw {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %value, "Invalid numeric setting, using default");
            fallback
        }),
        None => fallback,
    }
}
