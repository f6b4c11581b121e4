//! Shared types for the HTTP layer.

use std::sync::Arc;

use serde::Serialize;

use crate::pipeline::analysis::Specialist;
use crate::pipeline::formatting::ReportFields;
use crate::pipeline::{PipelineProfile, ProcessingOutcome, ReportProcessor};

// ═══════════════════════════════════════════════════════════
// API context: shared state for all routes
// ═══════════════════════════════════════════════════════════

/// The three built-in upload profiles.
#[derive(Debug, Clone)]
pub struct Profiles {
    pub report: PipelineProfile,
    pub xray: PipelineProfile,
    pub fields: PipelineProfile,
}

impl Profiles {
    pub fn with_max_upload(max_upload_bytes: u64) -> Self {
        Self {
            report: PipelineProfile::report(max_upload_bytes),
            xray: PipelineProfile::xray(max_upload_bytes),
            fields: PipelineProfile::fields(max_upload_bytes),
        }
    }

    /// Largest ceiling of any profile, used to size the transport body limit.
    pub fn max_upload_bytes(&self) -> u64 {
        [&self.report, &self.xray, &self.fields]
            .iter()
            .map(|p| p.upload.max_size_bytes)
            .max()
            .unwrap_or(0)
    }
}

/// Cloned into every handler. Request-scoped data never lives here.
#[derive(Clone)]
pub struct ApiContext {
    pub processor: Arc<ReportProcessor>,
    pub profiles: Arc<Profiles>,
}

impl ApiContext {
    pub fn new(processor: Arc<ReportProcessor>, profiles: Profiles) -> Self {
        Self {
            processor,
            profiles: Arc::new(profiles),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Response payload
// ═══════════════════════════════════════════════════════════

/// Success body for every analysis route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub success: bool,
    pub formatted_output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_analysis: Option<ReportFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_specialist: Option<Specialist>,
    pub language: &'static str,
}

impl From<ProcessingOutcome> for ReportResponse {
    fn from(outcome: ProcessingOutcome) -> Self {
        Self {
            success: true,
            formatted_output: outcome.formatted_output,
            extracted_text: outcome.extracted_text,
            raw_analysis: outcome.raw_analysis,
            recommended_specialist: outcome.recommended_specialist,
            language: outcome.language_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineStage;

    #[test]
    fn response_is_camel_case_and_skips_absent_fields() {
        let outcome = ProcessingOutcome {
            formatted_output: "1. Overview:\nClear".into(),
            extracted_text: None,
            raw_analysis: None,
            recommended_specialist: None,
            language_code: "en",
            stages: vec![PipelineStage::Received],
        };
        let json = serde_json::to_value(ReportResponse::from(outcome)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "formattedOutput": "1. Overview:\nClear",
                "language": "en",
            })
        );
    }

    #[test]
    fn profiles_share_the_ceiling() {
        let profiles = Profiles::with_max_upload(1024);
        assert_eq!(profiles.max_upload_bytes(), 1024);
        assert!(profiles.fields.upload.allows("application/pdf"));
        assert!(!profiles.report.upload.allows("application/pdf"));
    }
}
