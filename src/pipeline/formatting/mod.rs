pub mod fields;

pub use fields::*;

use serde::{Deserialize, Serialize};

/// How the final report is produced from the pipeline's raw materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatStrategy {
    /// The (possibly translated) structured analysis, verbatim.
    PassThrough,
    /// A labeled document synthesized from pattern-matched OCR fields.
    /// Needs no analysis call.
    FieldSynthesis,
}

impl FormatStrategy {
    pub fn requires_analysis(&self) -> bool {
        matches!(self, FormatStrategy::PassThrough)
    }
}

/// User-facing report plus the structured record behind it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedReport {
    pub text: String,
    pub fields: Option<ReportFields>,
}

/// Build a pass-through report from a finished analysis.
pub fn pass_through(analysis: &str) -> FormattedReport {
    FormattedReport {
        text: analysis.to_string(),
        fields: None,
    }
}

/// Build a field-synthesis report from raw OCR text.
pub fn synthesize_fields(extracted_text: &str) -> FormattedReport {
    let fields = ReportFields::extract(extracted_text);
    FormattedReport {
        text: fields.render(),
        fields: Some(fields),
    }
}
