//! Text normalization

use regex::Regex;
use std::sync::LazyLock;
use unicode_segmentation::UnicodeSegmentation;

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Lowercase, collapse every whitespace run to one space, and trim.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    WHITESPACE_REGEX
        .replace_all(&lowered, " ")
        .trim()
        .to_string()
}

/// Cut text to at most `max_graphemes`, preferring a word boundary, with an ellipsis.
pub fn preview(text: &str, max_graphemes: usize) -> String {
    let collapsed = WHITESPACE_REGEX.replace_all(text.trim(), " ");
    if collapsed.graphemes(true).count() <= max_graphemes {
        return collapsed.into_owned();
    }

    let truncated: String = collapsed.graphemes(true).take(max_graphemes).collect();
    let cut = match truncated.rfind(' ') {
        Some(idx) if idx > 0 => &truncated[..idx],
        _ => truncated.as_str(),
    };
    format!("{}...", cut)
}

pub fn word_count(text: &str) -> usize {
    text.unicode_words().count()
}
