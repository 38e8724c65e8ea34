//! Parsing of the editor's numbered idea list.
//!
//! The editor is asked for a numbered list but answers in free prose, so the
//! parser only relies on lines starting with `N.`. Everything between two such
//! lines belongs to the earlier idea. Preamble before the first numbered line
//! is ignored.

use crate::data::Idea;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// The editor response contained no numbered line at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoIdeasFound;

impl fmt::Display for NoIdeasFound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Could not parse any ideas from the editor's response")
    }
}

impl std::error::Error for NoIdeasFound {}

/// Ideas in the order they appeared, addressable by number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdeaList {
    ideas: Vec<Idea>,
}

impl IdeaList {
    /// Parses raw editor text into ideas.
    ///
    /// A repeated number replaces the earlier entry's content but keeps its position.
    pub fn parse(raw: &str) -> Result<Self, NoIdeasFound> {
        let mut entries: Vec<(u32, String)> = Vec::new();

        for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
            if let Some(caps) = numbered_line_re().captures(line) {
                // The pattern bounds the digit count, so the parse cannot overflow
                let Ok(number) = caps[1].parse::<u32>() else {
                    continue;
                };
                entries.push((number, line.to_string()));
            } else if let Some((_, text)) = entries.last_mut() {
                text.push(' ');
                text.push_str(line);
            }
        }

        if entries.is_empty() {
            return Err(NoIdeasFound);
        }

        let mut ideas: Vec<Idea> = Vec::with_capacity(entries.len());
        for (number, raw_text) in entries {
            let idea = build_idea(number, raw_text);
            match ideas.iter_mut().find(|existing| existing.number == number) {
                Some(existing) => *existing = idea,
                None => ideas.push(idea),
            }
        }

        Ok(Self { ideas })
    }

    pub fn get(&self, number: u32) -> Option<&Idea> {
        self.ideas.iter().find(|idea| idea.number == number)
    }

    pub fn numbers(&self) -> Vec<u32> {
        self.ideas.iter().map(|idea| idea.number).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Idea> {
        self.ideas.iter()
    }

    pub fn len(&self) -> usize {
        self.ideas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ideas.is_empty()
    }
}

fn build_idea(number: u32, raw_text: String) -> Idea {
    let text = numbered_line_re()
        .replace(&raw_text, "")
        .trim()
        .to_string();
    let (title, description) = split_title(&text);
    Idea {
        number,
        title,
        description,
        raw_text,
    }
}

/// Quoted title first, then a colon split. Falls back to no title.
fn split_title(text: &str) -> (Option<String>, String) {
    if let Some(caps) = quoted_title_re().captures(text) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let title = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|t| t.as_str().trim().to_string())
            .unwrap_or_default();
        if !title.is_empty() {
            let remainder = format!("{}{}", &text[..whole.start], &text[whole.end..]);
            let description = remainder
                .trim()
                .trim_start_matches(|c: char| SEPARATORS.contains(&c) || c.is_whitespace())
                .trim()
                .to_string();
            return (Some(title), description);
        }
    }

    if let Some((left, right)) = text.split_once(':') {
        let title = left.trim().trim_matches(|c| c == '*' || c == '_').trim();
        if !title.is_empty() {
            return (Some(title.to_string()), right.trim().to_string());
        }
    }

    (None, text.to_string())
}

/// Characters left dangling once a quoted title is cut out, e.g. `**"Title"**: ...`.
const SEPARATORS: &[char] = &['*', '_', ':', '-', '\u{2013}', '\u{2014}', ','];

fn numbered_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,9})\.\s*").expect("valid regex"))
}

fn quoted_title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]+)"|\u{201C}([^\u{201D}]+)\u{201D}"#).expect("valid regex"))
}
