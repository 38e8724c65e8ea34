//! Reflowing the writer's raw response into story paragraphs.

use crate::contexts::story_page::escape_html;
use regex::Regex;
use std::sync::OnceLock;

/// Element id of the paragraph that "continue reading" links jump to.
pub const CONTINUE_READING_ANCHOR: &str = "continue-reading";

/// Emitted when the writer's response holds no usable prose at all.
pub const PLACEHOLDER_PARAGRAPH: &str = "No content available.";

/// Longest first line still treated as a standalone title.
const MAX_TITLE_CHARS: usize = 120;

/// Story body paragraphs. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraphs(Vec<String>);

impl Paragraphs {
    /// Splits `story` into paragraphs, dropping the selection announcement,
    /// a leading title and any markdown or meta lines.
    pub fn from_story(story: &str) -> Self {
        let trimmed = story.trim();
        let body = strip_announcement(trimmed);
        let body = strip_leading_title(body, body.len() < trimmed.len());
        let paragraphs = reflow(body);
        if !paragraphs.is_empty() {
            return Self(paragraphs);
        }

        tracing::warn!("story reflow produced no paragraphs, splitting the raw text instead");
        let blocks: Vec<String> = blank_line_re()
            .split(story)
            .map(|block| block.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|block| !block.is_empty())
            .collect();
        if !blocks.is_empty() {
            return Self(blocks);
        }

        tracing::warn!("story has no text, using placeholder paragraph");
        Self(vec![PLACEHOLDER_PARAGRAPH.to_string()])
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or(PLACEHOLDER_PARAGRAPH)
    }

    /// Summary views show only the first paragraph, so the anchor sits on the
    /// second one when there is one.
    pub fn anchor_index(&self) -> usize {
        if self.0.len() > 1 { 1 } else { 0 }
    }

    /// One `<p>` per paragraph, the anchor paragraph carrying [`CONTINUE_READING_ANCHOR`].
    pub fn to_html(&self) -> String {
        let anchor = self.anchor_index();
        self.0
            .iter()
            .enumerate()
            .map(|(i, paragraph)| {
                if i == anchor {
                    format!("<p id=\"{}\">{}</p>\n", CONTINUE_READING_ANCHOR, escape_html(paragraph))
                } else {
                    format!("<p>{}</p>\n", escape_html(paragraph))
                }
            })
            .collect()
    }
}

/// True for lines like "I choose idea 2", "I've selected...", "Idea #3".
pub fn is_selection_announcement(line: &str) -> bool {
    announcement_re().is_match(line.trim())
}

fn split_first_line(text: &str) -> (&str, &str) {
    text.split_once('\n').unwrap_or((text, ""))
}

fn strip_announcement(text: &str) -> &str {
    let (first, rest) = split_first_line(text);
    if is_selection_announcement(first) {
        rest.trim_start()
    } else {
        text
    }
}

/// A bare standalone line only counts as a title right after an announcement;
/// otherwise it is an opening paragraph.
fn strip_leading_title(text: &str, after_announcement: bool) -> &str {
    let (first, rest) = split_first_line(text);
    let line = first.trim();
    let stands_alone = rest.trim().is_empty() || rest.trim_start_matches([' ', '\t', '\r']).starts_with('\n');

    if is_heading_marker(line) || is_all_caps(line) || (after_announcement && stands_alone && is_title_like(line)) {
        tracing::debug!(title = line, "dropping leading title line");
        rest.trim_start()
    } else {
        text
    }
}

fn reflow(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
            continue;
        }
        if line.starts_with('#') || is_rule(line) || meta_line_re().is_match(line) {
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

fn is_heading_marker(line: &str) -> bool {
    line.starts_with('#') || (line.len() > 4 && line.starts_with("**") && line.ends_with("**"))
}

fn is_all_caps(line: &str) -> bool {
    line.chars().count() >= 10
        && line.chars().any(char::is_alphabetic)
        && !line.chars().any(char::is_lowercase)
}

fn is_title_like(line: &str) -> bool {
    !line.is_empty()
        && line.chars().count() <= MAX_TITLE_CHARS
        && !line.ends_with(['.', '!', '?', ':', ';', ',', '"', '\u{201D}', '\u{2026}', ')'])
}

/// `---`, `===`, `***`, `___` and spaced variants.
fn is_rule(line: &str) -> bool {
    if line.starts_with("---") || line.starts_with("===") {
        return true;
    }
    let marks: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    marks.len() >= 3 && (marks.iter().all(|&c| c == '*') || marks.iter().all(|&c| c == '_'))
}

fn announcement_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:I(?:'ve|\s+have|\s+am)?\s+(?:choose|chose|chosen|select|selected|picked|choosing|going\s+with|decided\s+on|will\s+go\s+with)\b|Selected\b|Chosen\b|Idea\s+(?:#\s*|number\s+)?\d+)",
        )
        .expect("valid regex")
    })
}

fn meta_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(?:Based on|I will use|I have chosen)\b").expect("valid regex"))
}

fn blank_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("valid regex"))
}
