use crate::config::DEFAULT_LANGUAGE_CODE;

/// Supported target languages: lowercase name to translation-service code.
pub const LANGUAGE_CODES: [(&str, &str); 10] = [
    ("english", "en"),
    ("hindi", "hi"),
    ("telugu", "te"),
    ("tamil", "ta"),
    ("kannada", "kn"),
    ("malayalam", "ml"),
    ("marathi", "mr"),
    ("bengali", "bn"),
    ("gujarati", "gu"),
    ("punjabi", "pa"),
];

/// Code for a known language name (case-insensitive), `None` otherwise.
pub fn lookup_language_code(name: &str) -> Option<&'static str> {
    let needle = name.trim().to_lowercase();
    LANGUAGE_CODES
        .iter()
        .find(|(lang, _)| *lang == needle)
        .map(|(_, code)| *code)
}

/// Map a language name to its code.
///
/// Unrecognized names fall back to the default code instead of failing:
/// the report is still returned, just untranslated.
pub fn get_language_code(name: &str) -> &'static str {
    match lookup_language_code(name) {
        Some(code) => code,
        None => {
            if !name.trim().is_empty() {
                tracing::debug!(language = %name, "Unknown language, using default");
            }
            DEFAULT_LANGUAGE_CODE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_languages_map_to_codes() {
        assert_eq!(get_language_code("telugu"), "te");
        assert_eq!(get_language_code("hindi"), "hi");
        assert_eq!(get_language_code("punjabi"), "pa");
        assert_eq!(get_language_code("english"), "en");
    }

    #[test]
    fn lookup_is_case_insensitive_and_trimmed() {
        assert_eq!(get_language_code("  Hindi "), "hi");
        assert_eq!(get_language_code("BENGALI"), "bn");
    }

    #[test]
    fn unknown_language_falls_back_to_default() {
        assert_eq!(get_language_code("klingon"), DEFAULT_LANGUAGE_CODE);
        assert_eq!(get_language_code(""), DEFAULT_LANGUAGE_CODE);
        assert_eq!(lookup_language_code("klingon"), None);
    }

    #[test]
    fn table_has_ten_unique_codes() {
        let mut codes: Vec<_> = LANGUAGE_CODES.iter().map(|(_, c)| *c).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 10);
    }
}
