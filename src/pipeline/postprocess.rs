//! Post-processing: deterministic cleanup of page text and oracle answers.
//!
//! Page text coming out of pdfium carries CRLF line endings, trailing blanks
//! from justified layouts and invisible Unicode. Oracle answers come wrapped
//! in code fences despite being told not to, and the line-formatted answers
//! of the classification steps arrive with markdown emphasis or in a
//! different case. Every rule here is a pure `&str → String` function so each
//! is tested on its own.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Normalise one page of extracted text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Trim trailing whitespace per line
/// 4. Collapse runs of blank lines down to one
/// 5. Trim leading and trailing blank lines
pub fn clean_page_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim_matches('\n').to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Oracle answers: strip outer code fences ─────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\n(.*?)\n?```\s*$").unwrap());

/// Remove a single pair of outer code fences (```` ```json ````, ```` ``` ````).
pub fn strip_code_fences(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    }
}

// ── Oracle answers: labelled lines ──────────────────────────────────────────

static RE_LABELLED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\s*_#>-]*([A-Za-z][A-Za-z ]*?)[\s*_]*:[\s*_]*(.*?)[\s*_]*$").unwrap()
});

/// Parse `Label: value` lines into a map keyed by lower-cased label.
///
/// Markdown emphasis and list markers around labels and values are ignored.
/// The first occurrence of a label wins.
pub fn parse_labelled_lines(input: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for line in strip_code_fences(input).lines() {
        if let Some(caps) = RE_LABELLED_LINE.captures(line) {
            let key = caps[1].trim().to_ascii_lowercase();
            let value = caps[2].trim().to_string();
            fields.entry(key).or_insert(value);
        }
    }
    fields
}

static RE_LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^0-9-]*?(-?)([0-9]+(?:[.,][0-9]+)?)\s*(%?)").unwrap());

/// First number in `value`, accepting a decimal comma.
///
/// Negative numbers yield `None`. A `%` suffix divides by 100.
pub fn leading_number(value: &str) -> Option<f64> {
    let caps = RE_LEADING_NUMBER.captures(value)?;
    if !caps[1].is_empty() {
        return None;
    }
    let number: f64 = caps[2].replace(',', ".").parse().ok()?;
    if caps[3].is_empty() {
        Some(number)
    } else {
        Some(number / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  Pos. 1   \nMenge  "),
            "  Pos. 1\nMenge"
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "USt\u{00AD}IdNr\u{200B}: DE\u{FEFF}198570491";
        assert_eq!(remove_invisible_chars(input), "UStIdNr: DE198570491");
    }

    #[test]
    fn test_clean_page_text() {
        let input = "\r\nAngebot   \r\n\r\n\r\n\r\nPos. 1\u{200B}\r\n\r\n";
        assert_eq!(clean_page_text(input), "Angebot\n\nPos. 1");
    }

    #[test]
    fn test_strip_json_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{}\n```\n"), "{}");
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_fences_inside_content_are_kept() {
        let input = "{\"note\": \"```\"}";
        assert_eq!(strip_code_fences(input), input);
    }

    #[test]
    fn test_parse_labelled_lines() {
        let answer = "**Category:** Information Technology\nConfidence: 0.92\nReasoning: Laptops and software.";
        let fields = parse_labelled_lines(answer);
        assert_eq!(fields["category"], "Information Technology");
        assert_eq!(fields["confidence"], "0.92");
        assert_eq!(fields["reasoning"], "Laptops and software.");
    }

    #[test]
    fn test_parse_labelled_lines_first_wins() {
        let fields = parse_labelled_lines("ID: 29\nid: 31");
        assert_eq!(fields["id"], "29");
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("0.85"), Some(0.85));
        assert_eq!(leading_number("0,7"), Some(0.7));
        assert_eq!(leading_number("#29 (Hardware)"), Some(29.0));
        assert_eq!(leading_number("high"), None);
    }

    #[test]
    fn test_leading_number_sign_and_percent() {
        assert_eq!(leading_number("-29"), None);
        assert_eq!(leading_number("85%"), Some(0.85));
        assert_eq!(leading_number("about 70 %"), Some(0.7));
    }
}
