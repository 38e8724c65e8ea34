//! Recovering which idea the writer picked, and what to call the story.
//!
//! Both lookups are ordered chains of independent strategies. The first
//! strategy that returns something wins; when none does, the extractor
//! degrades to idea 1 and a synthetic headline rather than failing.

use crate::contexts::IdeaList;
use crate::data::{HeadlineSource, Selection};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// What to do when the writer names an idea number the editor never produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownChoice {
    /// Treat it as idea 1.
    #[default]
    FallbackToOne,
    /// Keep the number; the headline is then synthesized.
    Keep,
}

/// A pattern whose first capture group is the chosen idea number.
#[derive(Debug, Clone)]
pub struct ChoicePattern {
    name: String,
    re: Regex,
}

impl ChoicePattern {
    /// "I choose idea number 2", "I've picked idea #2", ...
    pub fn announcement() -> Self {
        Self {
            name: "announcement".to_string(),
            re: announcement_re().clone(),
        }
    }

    /// "Idea 2:" or "Idea number 2:" anywhere in the text.
    pub fn idea_label() -> Self {
        Self {
            name: "idea-label".to_string(),
            re: idea_label_re().clone(),
        }
    }

    /// A caller-supplied pattern, e.g. for a writer prompt with its own phrasing.
    pub fn custom(name: &str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.to_string(),
            re: Regex::new(pattern)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn find(&self, story: &str) -> Option<u32> {
        self.re
            .captures(story)?
            .get(1)?
            .as_str()
            .parse()
            .ok()
    }
}

/// One way of finding a headline, tried in the order the extractor lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadlineStrategy {
    /// Title of the chosen idea, with its description.
    ChosenIdea,
    /// A `# Heading` or `**bold**` line near the top of the story.
    MarkdownHeading,
    /// A long, unpunctuated, mostly capitalized line near the top of the story.
    ShoutedLine,
}

/// Lines of the story scanned by the story-based strategies.
const HEADLINE_SCAN_LINES: usize = 10;

impl HeadlineStrategy {
    pub fn apply(&self, story: &str, number: u32, ideas: &IdeaList) -> Option<Selection> {
        let chosen = ideas.get(number);
        let from_story = |headline: String| Selection {
            idea_number: number,
            headline,
            description: chosen.map(|idea| idea.description.clone()).unwrap_or_default(),
            source: HeadlineSource::Story,
        };

        match self {
            HeadlineStrategy::ChosenIdea => {
                let idea = chosen?;
                let title = idea.title.as_deref()?.trim();
                if title.is_empty() {
                    return None;
                }
                Some(Selection {
                    idea_number: number,
                    headline: title.to_string(),
                    description: idea.description.clone(),
                    source: HeadlineSource::Idea,
                })
            }
            HeadlineStrategy::MarkdownHeading => story
                .lines()
                .take(HEADLINE_SCAN_LINES)
                .find_map(markdown_heading)
                .map(from_story),
            HeadlineStrategy::ShoutedLine => story
                .lines()
                .take(HEADLINE_SCAN_LINES)
                .map(str::trim)
                .find(|line| is_shouted_headline(line))
                .map(|line| from_story(line.to_string())),
        }
    }
}

/// Turns the writer's response into a [`Selection`]. Never fails.
#[derive(Debug, Clone)]
pub struct SelectionExtractor {
    choice_patterns: Vec<ChoicePattern>,
    headline_strategies: Vec<HeadlineStrategy>,
    headline_prefix: String,
    unknown_choice: UnknownChoice,
}

impl Default for SelectionExtractor {
    fn default() -> Self {
        Self::new("Feature", UnknownChoice::default())
    }
}

impl SelectionExtractor {
    pub fn new(headline_prefix: &str, unknown_choice: UnknownChoice) -> Self {
        Self {
            choice_patterns: vec![ChoicePattern::announcement(), ChoicePattern::idea_label()],
            headline_strategies: vec![
                HeadlineStrategy::ChosenIdea,
                HeadlineStrategy::MarkdownHeading,
                HeadlineStrategy::ShoutedLine,
            ],
            headline_prefix: headline_prefix.to_string(),
            unknown_choice,
        }
    }

    /// Tries `pattern` before the built-in choice patterns.
    pub fn with_choice_pattern(mut self, pattern: ChoicePattern) -> Self {
        self.choice_patterns.insert(0, pattern);
        self
    }

    pub fn headline_prefix(&self) -> &str {
        &self.headline_prefix
    }

    /// The number the writer announced, if any pattern recognises one.
    pub fn find_choice(&self, story: &str) -> Option<u32> {
        self.choice_patterns.iter().find_map(|pattern| {
            let number = pattern.find(story)?;
            tracing::debug!(pattern = pattern.name(), number, "chosen idea recognised");
            Some(number)
        })
    }

    pub fn extract(&self, story: &str, ideas: &IdeaList) -> Selection {
        let number = match self.find_choice(story) {
            Some(n) if ideas.get(n).is_some() => n,
            Some(n) => match self.unknown_choice {
                UnknownChoice::FallbackToOne => {
                    tracing::warn!(chosen = n, "writer chose an idea that was never proposed, using idea 1");
                    1
                }
                UnknownChoice::Keep => {
                    tracing::warn!(chosen = n, "writer chose an idea that was never proposed");
                    n
                }
            },
            None => {
                tracing::warn!("no idea selection found in the story, defaulting to idea 1");
                1
            }
        };

        self.headline_strategies
            .iter()
            .find_map(|strategy| strategy.apply(story, number, ideas))
            .unwrap_or_else(|| {
                tracing::warn!(number, "no headline found, synthesizing one");
                Selection {
                    idea_number: number,
                    headline: synthetic_headline(&self.headline_prefix, number),
                    description: String::new(),
                    source: HeadlineSource::Synthetic,
                }
            })
    }
}

/// The content-free headline used when nothing better can be found.
pub fn synthetic_headline(prefix: &str, number: u32) -> String {
    format!("{}: Idea {}", prefix, number)
}

fn markdown_heading(line: &str) -> Option<String> {
    let caps = heading_line_re().captures(line.trim())?;
    let text = caps.get(1).or_else(|| caps.get(2))?.as_str();
    let text = headline_label_re().replace(text.trim(), "");
    let text = text.trim().trim_matches(|c| c == '"' || c == '*').trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Over 20 characters, no terminal punctuation and at least 30% uppercase.
fn is_shouted_headline(line: &str) -> bool {
    let length = line.chars().count();
    if length <= 20 || line.ends_with(['.', '?', '!']) {
        return false;
    }
    let upper = line.chars().filter(|c| c.is_uppercase()).count();
    upper * 10 >= length * 3
}

fn announcement_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\bI(?:'ve|\s+have)?\s+(?:chose|choose|chosen|select|selected|picked|am\s+choosing|am\s+selecting|am\s+going\s+with|will\s+go\s+with)\s+idea\s+(?:number\s+|no\.\s*|#\s*)?(\d{1,9})",
        )
        .expect("valid regex")
    })
}

fn idea_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bIdea\s+(?:number\s+|#\s*)?(\d{1,9})\s*:").expect("valid regex"))
}

fn heading_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:#{1,6}\s+(.+?)\s*#*|\*\*(.+?)\*\*)$").expect("valid regex"))
}

fn headline_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(?:headline|title)\s*:\s*").expect("valid regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ideas() -> IdeaList {
        IdeaList::parse("1. \"Rise of X\": a profile.\n2. \"Fall of Y\": an exposé.\n3. untitled notes").unwrap()
    }

    #[test]
    fn test_announced_choice_uses_idea_title() {
        let story = "I choose idea number 1.\nRise of X\n\nParagraph one.\n\nParagraph two.";
        let selection = SelectionExtractor::default().extract(story, &ideas());

        assert_eq!(selection.idea_number, 1);
        assert_eq!(selection.headline, "Rise of X");
        assert_eq!(selection.description, "a profile.");
        assert_eq!(selection.source, HeadlineSource::Idea);
    }

    #[test]
    fn test_choice_patterns_in_order() {
        let extractor = SelectionExtractor::default();
        assert_eq!(extractor.find_choice("I've picked idea #2 because"), Some(2));
        assert_eq!(extractor.find_choice("I have chosen Idea 3, the best."), Some(3));
        assert_eq!(extractor.find_choice("Idea number 2: Fall of Y"), Some(2));
        assert_eq!(extractor.find_choice("My pick is the second idea."), None);
        // The announcement wins over an earlier label
        assert_eq!(extractor.find_choice("Idea 3: notes\nI select idea 2"), Some(2));
    }

    #[test]
    fn test_custom_pattern_is_tried_first() {
        let extractor = SelectionExtractor::default()
            .with_choice_pattern(ChoicePattern::custom("choice-tag", r"\[choice:(\d+)\]").unwrap());
        assert_eq!(extractor.find_choice("[choice:3] I choose idea 2"), Some(3));
    }

    #[test]
    fn test_markdown_heading_fallback() {
        let story = "I choose idea 3.\n\n# The Quiet Heirs of Monaco\n\nText.";
        let selection = SelectionExtractor::default().extract(story, &ideas());

        assert_eq!(selection.idea_number, 3);
        assert_eq!(selection.headline, "The Quiet Heirs of Monaco");
        assert_eq!(selection.description, "untitled notes");
        assert_eq!(selection.source, HeadlineSource::Story);
    }

    #[test]
    fn test_bold_heading_with_label() {
        let line = "**Headline: Velvet Ropes**";
        assert_eq!(markdown_heading(line), Some("Velvet Ropes".to_string()));
    }

    #[test]
    fn test_shouted_line_fallback() {
        let story = "Some intro sentence.\nTHE LAST DAYS OF A DYNASTY\n\nBody.";
        let selection = SelectionExtractor::default().extract(story, &IdeaList::default());

        assert_eq!(selection.idea_number, 1);
        assert_eq!(selection.headline, "THE LAST DAYS OF A DYNASTY");
        assert_eq!(selection.source, HeadlineSource::Story);
    }

    #[test]
    fn test_shouted_line_rules() {
        assert!(is_shouted_headline("THE Last Days OF a Dynasty"));
        assert!(!is_shouted_headline("SHORT HEADLINE"));
        assert!(!is_shouted_headline("THE LAST DAYS OF A DYNASTY."));
        assert!(!is_shouted_headline("the last days of a great dynasty"));
    }

    #[test]
    fn test_synthetic_headline_when_nothing_matches() {
        let ideas = IdeaList::parse("1. no title here\n2. \"B\": b").unwrap();
        let selection = SelectionExtractor::default().extract("just some prose.", &ideas);

        assert_eq!(selection.idea_number, 1);
        assert_eq!(selection.headline, "Feature: Idea 1");
        assert_eq!(selection.description, "");
        assert_eq!(selection.source, HeadlineSource::Synthetic);
    }

    #[test]
    fn test_empty_and_failed_input_never_fail() {
        let extractor = SelectionExtractor::default();
        for story in ["", "Analysis failed: connection reset", "\n\n\n"] {
            let selection = extractor.extract(story, &IdeaList::default());
            assert!(!selection.headline.is_empty());
        }
    }

    #[test]
    fn test_unknown_choice_policies() {
        let story = "I choose idea 9.";

        let fallback = SelectionExtractor::new("Feature", UnknownChoice::FallbackToOne).extract(story, &ideas());
        assert_eq!(fallback.idea_number, 1);
        assert_eq!(fallback.headline, "Rise of X");

        let keep = SelectionExtractor::new("Feature", UnknownChoice::Keep).extract(story, &ideas());
        assert_eq!(keep.idea_number, 9);
        assert_eq!(keep.headline, "Feature: Idea 9");
    }
}
