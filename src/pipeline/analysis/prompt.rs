use std::fmt;

use serde::Serialize;

use super::AnalysisMode;

/// Specialist labels the model may recommend. Closed list: the prompt
/// forbids anything else and `parse_recommended_specialist` only
/// recognizes these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Specialist {
    #[serde(rename = "General Physician")]
    GeneralPhysician,
    Cardiologist,
    Dermatologist,
    Endocrinologist,
    Gastroenterologist,
    Neurologist,
    Nephrologist,
    Oncologist,
    Orthopedist,
    Pulmonologist,
    Gynecologist,
    Pediatrician,
    Psychiatrist,
    #[serde(rename = "ENT Specialist")]
    EntSpecialist,
    Ophthalmologist,
    Urologist,
}

impl Specialist {
    pub const ALL: [Specialist; 16] = [
        Specialist::GeneralPhysician,
        Specialist::Cardiologist,
        Specialist::Dermatologist,
        Specialist::Endocrinologist,
        Specialist::Gastroenterologist,
        Specialist::Neurologist,
        Specialist::Nephrologist,
        Specialist::Oncologist,
        Specialist::Orthopedist,
        Specialist::Pulmonologist,
        Specialist::Gynecologist,
        Specialist::Pediatrician,
        Specialist::Psychiatrist,
        Specialist::EntSpecialist,
        Specialist::Ophthalmologist,
        Specialist::Urologist,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Specialist::GeneralPhysician => "General Physician",
            Specialist::Cardiologist => "Cardiologist",
            Specialist::Dermatologist => "Dermatologist",
            Specialist::Endocrinologist => "Endocrinologist",
            Specialist::Gastroenterologist => "Gastroenterologist",
            Specialist::Neurologist => "Neurologist",
            Specialist::Nephrologist => "Nephrologist",
            Specialist::Oncologist => "Oncologist",
            Specialist::Orthopedist => "Orthopedist",
            Specialist::Pulmonologist => "Pulmonologist",
            Specialist::Gynecologist => "Gynecologist",
            Specialist::Pediatrician => "Pediatrician",
            Specialist::Psychiatrist => "Psychiatrist",
            Specialist::EntSpecialist => "ENT Specialist",
            Specialist::Ophthalmologist => "Ophthalmologist",
            Specialist::Urologist => "Urologist",
        }
    }
}

impl fmt::Display for Specialist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Section titles of a text-mode analysis, in order.
pub const REPORT_SECTIONS: [&str; 5] = [
    "Symptoms",
    "Diagnosis",
    "Severity Level",
    "Treatment Recommendations",
    "Recommended Specialist",
];

/// Section titles of an X-ray analysis, in order.
pub const XRAY_SECTIONS: [&str; 5] = [
    "Overview",
    "Fracture Status",
    "Severity Level",
    "Required Actions",
    "Care Instructions",
];

/// Short user-turn instruction sent beside the radiograph.
pub const XRAY_USER_INSTRUCTION: &str =
    "Analyze this X-ray image and respond using exactly the five numbered sections described.";

/// Prompt contract for one pipeline profile.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    pub system: String,
    pub sections: &'static [&'static str; 5],
}

impl PromptTemplate {
    pub fn for_mode(mode: AnalysisMode) -> Self {
        match mode {
            AnalysisMode::Text => Self {
                system: report_system_prompt(),
                sections: &REPORT_SECTIONS,
            },
            AnalysisMode::Xray => Self {
                system: xray_system_prompt(),
                sections: &XRAY_SECTIONS,
            },
        }
    }

    /// User turn for text mode: the OCR text fenced off from instructions.
    pub fn report_user_text(extracted_text: &str) -> String {
        format!(
            "Analyze the following medical report text.\n\n<report>\n{extracted_text}\n</report>"
        )
    }
}

fn numbered_titles(sections: &[&str]) -> String {
    sections
        .iter()
        .enumerate()
        .map(|(i, title)| format!("{}. {}:", i + 1, title))
        .collect::<Vec<_>>()
        .join("\n")
}

fn report_system_prompt() -> String {
    let specialists = Specialist::ALL
        .iter()
        .map(|s| s.label())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are a medical report analysis assistant. Summarize the report for a patient in plain language.

Respond with EXACTLY five numbered sections, in this order, each heading on its own line followed by its content:
{headings}

RULES:
1. Use only information present in the report. If a section has no supporting information, write "Not mentioned in the report."
2. Do not add any text before section 1 or after section 5.
3. Severity Level must be one of: Mild, Moderate, Severe, Critical.
4. Recommended Specialist must be exactly one of: {specialists}."#,
        headings = numbered_titles(&REPORT_SECTIONS),
    )
}

fn xray_system_prompt() -> String {
    format!(
        r#"You are a radiology assistant reviewing an X-ray image for a patient.

Respond with EXACTLY five numbered sections, in this order, each heading on its own line followed by its content:
{headings}

RULES:
1. Describe only what is visible in the image. Say so when the image is unclear.
2. Fracture Status must state whether a fracture is present, absent, or cannot be determined.
3. Severity Level must be one of: None, Mild, Moderate, Severe.
4. Do not add any text before section 1 or after section 5."#,
        headings = numbered_titles(&XRAY_SECTIONS),
    )
}

/// Pull the specialist out of section 5 of a text-mode analysis.
///
/// Returns `None` when section 5 is missing or names nothing on the list.
pub fn parse_recommended_specialist(analysis: &str) -> Option<Specialist> {
    let heading = "5. Recommended Specialist:";
    let start = analysis.find(heading)? + heading.len();
    let body = analysis[start..].to_ascii_lowercase();

    // Longest label first so "ENT Specialist" is not shadowed by shorter matches.
    let mut candidates = Specialist::ALL.to_vec();
    candidates.sort_by_key(|s| std::cmp::Reverse(s.label().len()));

    candidates
        .into_iter()
        .filter_map(|s| body.find(&s.label().to_ascii_lowercase()).map(|pos| (pos, s)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, s)| s)
}
