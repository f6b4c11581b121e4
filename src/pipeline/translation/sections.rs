use std::sync::LazyLock;

use regex::Regex;

/// Start of a numbered section: a line beginning `N. Title:`.
static SECTION_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\d\.\s[^:\n]+:").unwrap());

/// Header and body of one segment.
static SECTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d\.\s[^:\n]+:)\s*([\s\S]*)$").unwrap());

/// One piece of a structured analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section<'a> {
    /// `N. Title:` exactly as it appeared, if the segment had one.
    pub header: Option<&'a str>,
    /// Trimmed body, or the whole trimmed segment when there is no header.
    pub body: &'a str,
}

/// Split `text` before every numbered heading, keeping each heading at the
/// start of its segment. Text before the first heading becomes its own
/// segment. Concatenating the result reproduces `text`.
pub fn split_sections(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut last = 0;
    for m in SECTION_START.find_iter(text) {
        if m.start() > last {
            segments.push(&text[last..m.start()]);
        }
        last = m.start();
    }
    if last < text.len() {
        segments.push(&text[last..]);
    }
    segments
}

/// Separate a leading `N. Title:` from the rest of a segment. Never fails:
/// a segment without a header comes back whole as the body.
pub fn parse_section(segment: &str) -> Section<'_> {
    let trimmed = segment.trim();
    match SECTION_HEADER.captures(trimmed) {
        Some(caps) => Section {
            header: caps.get(1).map(|m| m.as_str()),
            body: caps.get(2).map_or("", |m| m.as_str().trim()),
        },
        None => Section {
            header: None,
            body: trimmed,
        },
    }
}

/// Number of numbered section headings in `text`.
pub fn count_numbered_sections(text: &str) -> usize {
    SECTION_START.find_iter(text).count()
}
