//! Text normalization and statistics.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static HORIZONTAL_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\S\n]+").expect("valid horizontal space regex"));
static SPACE_AROUND_NEWLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" *\n *").expect("valid newline regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank regex"));
static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n]+").expect("valid break regex"));
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").expect("valid sentence regex"));
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid paragraph regex"));

const READING_WORDS_PER_MINUTE: usize = 200;

/// Collapse horizontal whitespace, strip spaces around newlines, keep at most
/// one blank line between paragraphs and trim.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");
    let text = SPACE_AROUND_NEWLINE.replace_all(&text, "\n");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Single-line, lowercase form used for fingerprints and title comparison.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-separated words.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Replace typographic characters with plain ASCII and trim every line.
#[must_use]
pub fn optimize_for_llm(text: &str) -> String {
    let text = LINE_BREAKS.replace_all(text, "\n");
    let text: String = text
        .chars()
        .map(|c| match c {
            '\t' | '\u{00A0}' => ' ',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .collect();
    let text = text.replace('\u{2026}', "...");

    text.lines()
        .map(|line| collapse_whitespace(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Rough reading difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

/// Summary statistics for a block of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStats {
    /// Whitespace-separated words
    pub word_count: usize,
    /// Non-empty runs between `.`, `!` or `?`
    pub sentence_count: usize,
    /// Blocks separated by blank lines
    pub paragraph_count: usize,
    /// At 200 words a minute, rounded up
    pub reading_time_minutes: usize,
    /// From sentence length and the share of long words
    pub complexity: Complexity,
}

/// Counts and reading estimates for the finished document.
#[must_use]
pub fn analyze_content(text: &str) -> ContentStats {
    let words: Vec<&str> = text.split_whitespace().collect();
    let sentences = SENTENCE_END
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .count();
    let paragraphs = PARAGRAPH_BREAK
        .split(text)
        .filter(|p| !p.trim().is_empty())
        .count();

    ContentStats {
        word_count: words.len(),
        sentence_count: sentences,
        paragraph_count: paragraphs,
        reading_time_minutes: words.len().div_ceil(READING_WORDS_PER_MINUTE),
        complexity: estimate_complexity(&words, sentences),
    }
}

#[allow(clippy::cast_precision_loss)]
fn estimate_complexity(words: &[&str], sentences: usize) -> Complexity {
    if sentences == 0 || words.is_empty() {
        return Complexity::Low;
    }

    let words_per_sentence = words.len() as f64 / sentences as f64;
    let long_words = words.iter().filter(|w| w.chars().count() > 6).count();
    let long_ratio = long_words as f64 / words.len() as f64;

    if words_per_sentence > 20.0 || long_ratio > 0.3 {
        Complexity::High
    } else if words_per_sentence > 15.0 || long_ratio > 0.2 {
        Complexity::Medium
    } else {
        Complexity::Low
    }
}
