//! Text cleaning for extracted page content
//!
//! Rendered documentation pages leak a surprising amount of CSS into their
//! text nodes (inlined `@font-face` blocks, utility declarations). This module
//! strips those artifacts, decodes HTML entities and regroups the remaining
//! sentences into short paragraphs.

use once_cell::sync::Lazy;
use regex::Regex;

/// Sentences longer than this many bytes are treated as noise
const MAX_SENTENCE_LEN: usize = 500;

/// Sentences per output paragraph
const SENTENCES_PER_PARAGRAPH: usize = 3;

/// Framework leftovers removed verbatim after whitespace collapsing
const ARTIFACTS: &[&str] = &[
    "[x-cloak]",
    "wire:loading",
    "wire:offline",
    "/* vietnamese */",
    "/* latin-ext */",
    "/* latin */",
    "/* cyrillic */",
    "/* greek */",
    "/* devanagari */",
    "woff2",
    "woff",
];

static FONT_FACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@font-face\s*\{[^}]*\}").expect("font-face regex is valid"));
static CSS_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@[a-zA-Z-]+[^{]*\{[^}]*\}").expect("css rule regex is valid"));
static CSS_PROPERTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z-]+\s*:\s*[^;]+;").expect("css property regex is valid"));
static CSS_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"url\([^)]+\)").expect("url() regex is valid"));
static CSS_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"format\([^)]+\)").expect("format() regex is valid"));
static CSS_COMMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/").expect("css comment regex is valid")
});
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Outcome of cleaning and validating a page's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentValidation {
    /// Whether the cleaned text meets the minimum length
    pub is_valid: bool,
    /// Length of the cleaned text in characters
    pub content_length: usize,
    pub cleaned: String,
}

/// Cleans raw extracted text into plain paragraphs
///
/// # Example
///
/// ```
/// use crawldocs::clean::clean_text;
///
/// let cleaned = clean_text("Intro @font-face { font-family: X; } Body text");
/// assert_eq!(cleaned, "Intro Body text.");
/// ```
pub fn clean_text(raw: &str) -> String {
    let mut text = raw.to_string();
    for pattern in [
        &*FONT_FACE,
        &*CSS_RULE,
        &*CSS_PROPERTY,
        &*CSS_URL,
        &*CSS_FORMAT,
        &*CSS_COMMENT,
    ] {
        text = pattern.replace_all(&text, "").into_owned();
    }

    let mut text = WHITESPACE.replace_all(&text, " ").trim().to_string();

    for artifact in ARTIFACTS {
        text = text.replace(artifact, "");
    }

    let text = html_escape::decode_html_entities(&text);

    into_paragraphs(&text)
}

/// Splits on sentence boundaries, drops noisy sentences and regroups the rest
fn into_paragraphs(text: &str) -> String {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::with_capacity(SENTENCES_PER_PARAGRAPH);

    for sentence in text.split(". ").map(str::trim) {
        if sentence.is_empty() || looks_like_css(sentence) {
            continue;
        }

        current.push(sentence);
        if current.len() >= SENTENCES_PER_PARAGRAPH {
            paragraphs.push(format!("{}.", current.join(". ")));
            current.clear();
        }
    }

    if !current.is_empty() {
        paragraphs.push(format!("{}.", current.join(". ")));
    }

    paragraphs.join("\n\n")
}

fn looks_like_css(sentence: &str) -> bool {
    sentence.contains('{')
        || sentence.contains('}')
        || sentence.contains("src:")
        || sentence.contains("font-family")
        || sentence.chars().count() > MAX_SENTENCE_LEN
}

/// Cleans `raw` and checks it against the minimum content length
///
/// # Arguments
///
/// * `raw` - Text extracted from the page
/// * `min_length` - Minimum cleaned length, in characters, for a page to be kept
pub fn validate_content(raw: &str, min_length: usize) -> ContentValidation {
    let cleaned = clean_text(raw);
    let content_length = cleaned.chars().count();

    ContentValidation {
        is_valid: content_length >= min_length,
        content_length,
        cleaned,
    }
}
