use std::sync::LazyLock;

use regex::Regex;

/// A numbered section heading: `N. Title:`. Titles carry no digits, so a
/// match never swallows the next heading.
static SECTION_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d\.\s+[A-Za-z][A-Za-z /&()-]*:").unwrap());

static EXCESS_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Cosmetic cleanup of vision-model output.
///
/// Every numbered heading starts its own line, leading whitespace is
/// stripped from each line, and runs of blank lines collapse to one.
/// `normalize_analysis(normalize_analysis(x)) == normalize_analysis(x)`.
pub fn normalize_analysis(text: &str) -> String {
    let broken = break_inline_headings(text);

    let stripped = broken
        .split('\n')
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join("\n");

    EXCESS_BLANK_LINES
        .replace_all(&stripped, "\n\n")
        .trim()
        .to_string()
}

/// Insert a line break before headings that follow other text on the same
/// line. A heading preceded by a digit (`12. Foo:`) is left alone.
fn break_inline_headings(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;

    for m in SECTION_HEADING.find_iter(text) {
        let line_start = text[..m.start()].rfind('\n').map_or(0, |i| i + 1);
        let prefix = text[line_start..m.start()].trim_end_matches([' ', '\t']);

        let follows_text = prefix
            .chars()
            .last()
            .is_some_and(|c| !c.is_ascii_digit() && !c.is_whitespace());
        if !follows_text {
            continue;
        }

        out.push_str(text[last..m.start()].trim_end_matches([' ', '\t']));
        out.push('\n');
        last = m.start();
    }

    out.push_str(&text[last..]);
    out
}
