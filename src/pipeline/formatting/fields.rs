use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Heading of a field-synthesis report.
pub const FIELDS_REPORT_TITLE: &str = "Medical Report Analysis";

// ──────────────────────────────────────────────
// Pattern battery (all case-insensitive)
// ──────────────────────────────────────────────

static TEST_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("Blood Pressure", Regex::new(r"(?i)\bblood pressure:?\s*(\d{2,3}/\d{2,3})").unwrap()),
        ("Glucose", Regex::new(r"(?i)\b(?:glucose|blood sugar):?\s*(\d+\.?\d*)").unwrap()),
        ("Cholesterol", Regex::new(r"(?i)\b(?:cholesterol|lipid):?\s*(\d+\.?\d*)").unwrap()),
        ("Hemoglobin", Regex::new(r"(?i)\b(?:hemoglobin|hb):?\s*(\d+\.?\d*)").unwrap()),
        ("WBC", Regex::new(r"(?i)\b(?:wbc|white blood cells?):?\s*(\d+\.?\d*)").unwrap()),
        ("RBC", Regex::new(r"(?i)\b(?:rbc|red blood cells?):?\s*(\d+\.?\d*)").unwrap()),
        ("Platelets", Regex::new(r"(?i)\bplatelets?:?\s*(\d+\.?\d*)").unwrap()),
    ]
});

static TEMPERATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:temperature|temp):?\s*(\d+\.?\d*)").unwrap());
static PULSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:pulse|heart rate):?\s*(\d+)").unwrap());
static RESPIRATORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:respiratory rate|breathing rate):?\s*(\d+)").unwrap());
static OXYGEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:oxygen saturation|spo2):?\s*(\d+)").unwrap());

const ABNORMAL_INDICATORS: [&str; 9] = [
    "high",
    "low",
    "abnormal",
    "elevated",
    "deficient",
    "positive",
    "negative",
    "irregular",
    "concerning",
];

static ABNORMAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ABNORMAL_INDICATORS
        .iter()
        .map(|word| Regex::new(&format!(r"(?i)\b{word}\b[^.]*")).unwrap())
        .collect()
});

static DIAGNOSIS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)diagnosis:?[^.]*\.").unwrap(),
        Regex::new(r"(?i)impression:?[^.]*\.").unwrap(),
        Regex::new(r"(?i)assessment:?[^.]*\.").unwrap(),
    ]
});

static MEDICATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:prescribed|taking|medication):?\s*[^.]*\.").unwrap());

static RECOMMENDATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)recommend(?:ed|ation)?:?[^.]*\.").unwrap(),
        Regex::new(r"(?i)advised?:?[^.]*\.").unwrap(),
        Regex::new(r"(?i)follow(?:-|\s)?up:?[^.]*\.").unwrap(),
    ]
});

// ──────────────────────────────────────────────
// Record
// ──────────────────────────────────────────────

/// One labeled lab value found in the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResult {
    pub name: String,
    pub value: String,
    /// The full matched span, e.g. `Blood Pressure: 120/80`.
    pub raw: String,
}

/// First occurrence of each vital sign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Vitals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respiratory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oxygen: Option<String>,
}

impl Vitals {
    /// Present vitals as display label and value, in fixed order.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("Temperature", &self.temperature),
            ("Pulse", &self.pulse),
            ("Respiratory", &self.respiratory),
            ("Oxygen", &self.oxygen),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_deref().map(|v| (label, v)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Fields pulled out of raw report text by the pattern battery. Returned
/// to callers as `rawAnalysis`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFields {
    pub tests: Vec<TestResult>,
    pub abnormal_values: Vec<String>,
    pub diagnosis: Vec<String>,
    pub recommendations: Vec<String>,
    pub medications: Vec<String>,
    pub vitals: Vitals,
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn all_matches<'a>(patterns: impl IntoIterator<Item = &'a Regex>, text: &str) -> Vec<String> {
    patterns
        .into_iter()
        .flat_map(|re| re.find_iter(text).map(|m| m.as_str().to_string()))
        .collect()
}

impl ReportFields {
    /// Run the full pattern battery over `text`.
    pub fn extract(text: &str) -> Self {
        let tests = TEST_PATTERNS
            .iter()
            .flat_map(|(name, re)| {
                re.captures_iter(text).filter_map(move |caps| {
                    let value = caps.get(1)?.as_str().to_string();
                    let raw = caps.get(0)?.as_str().to_string();
                    Some(TestResult {
                        name: (*name).to_string(),
                        value,
                        raw,
                    })
                })
            })
            .collect();

        let vitals = Vitals {
            temperature: first_capture(&TEMPERATURE, text),
            pulse: first_capture(&PULSE, text),
            respiratory: first_capture(&RESPIRATORY, text),
            oxygen: first_capture(&OXYGEN, text),
        };

        let medications = MEDICATION_PATTERN
            .find_iter(text)
            .map(|m| m.as_str().trim().to_string())
            .collect();

        let fields = Self {
            tests,
            abnormal_values: all_matches(ABNORMAL_PATTERNS.iter(), text),
            diagnosis: all_matches(DIAGNOSIS_PATTERNS.iter(), text),
            recommendations: all_matches(RECOMMENDATION_PATTERNS.iter(), text),
            medications,
            vitals,
        };

        tracing::debug!(
            tests = fields.tests.len(),
            abnormal = fields.abnormal_values.len(),
            diagnosis = fields.diagnosis.len(),
            medications = fields.medications.len(),
            recommendations = fields.recommendations.len(),
            "Report fields extracted"
        );
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
            && self.abnormal_values.is_empty()
            && self.diagnosis.is_empty()
            && self.recommendations.is_empty()
            && self.medications.is_empty()
            && self.vitals.is_empty()
    }

    /// Labeled multi-section document. Sections without entries are left
    /// out entirely, heading included.
    pub fn render(&self) -> String {
        let mut blocks: Vec<String> = Vec::new();

        let vitals: Vec<String> = self
            .vitals
            .entries()
            .into_iter()
            .map(|(label, value)| format!("{label}: {value}"))
            .collect();
        push_block(&mut blocks, "Vital Signs", &vitals);

        let tests: Vec<String> = self
            .tests
            .iter()
            .map(|t| format!("{}: {}", t.name, t.value))
            .collect();
        push_block(&mut blocks, "Test Results", &tests);

        push_block(&mut blocks, "Abnormal Findings", &self.abnormal_values);
        push_block(&mut blocks, "Diagnosis", &self.diagnosis);
        push_block(&mut blocks, "Medications", &self.medications);
        push_block(&mut blocks, "Recommendations", &self.recommendations);

        let mut out = format!("{FIELDS_REPORT_TITLE}\n\n");
        out.push_str(&blocks.join("\n\n"));
        out.trim_end().to_string()
    }
}

fn push_block(blocks: &mut Vec<String>, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let mut block = format!("{heading}:");
    for item in items {
        block.push_str("\n- ");
        block.push_str(item.trim());
    }
    blocks.push(block);
}
