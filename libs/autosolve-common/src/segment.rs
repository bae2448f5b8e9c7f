//! Question segmentation for document text and pasted blocks.

use regex::Regex;
use std::sync::OnceLock;

// Only markers after a newline decide whether the text is a numbered list
fn line_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t]*\d+\.\s*").expect("line marker regex"))
}

fn leading_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\A[ \t]*\d+\.(?:\s+|\z)").expect("leading marker regex"))
}

fn lead_in_phrase() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:write a program|solve this problem|implement a function)\b")
            .expect("lead-in regex")
    })
}

/// One question per non-empty line of extracted document text
pub fn questions_from_document(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a pasted block into questions.
///
/// Numbered-list markers after line breaks win; otherwise the text is cut
/// right before each imperative lead-in ("Write a program", "Solve this
/// problem", "Implement a function"). A lone marker at the very start is
/// dropped either way.
pub fn split_questions(text: &str) -> Vec<String> {
    let text = strip_leading_marker(text.trim());

    let numbered: Vec<&str> = line_marker().split(text).collect();
    if numbered.len() > 1 {
        return non_empty(numbered);
    }

    let mut cuts: Vec<usize> = lead_in_phrase().find_iter(text).map(|m| m.start()).collect();
    if cuts.first() != Some(&0) {
        cuts.insert(0, 0);
    }

    let pieces = cuts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = cuts.get(i + 1).copied().unwrap_or(text.len());
            &text[start..end]
        })
        .collect();

    non_empty(pieces)
}

fn strip_leading_marker(text: &str) -> &str {
    match leading_marker().find(text) {
        Some(marker) => &text[marker.end()..],
        None => text,
    }
}

fn non_empty(parts: Vec<&str>) -> Vec<String> {
    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
