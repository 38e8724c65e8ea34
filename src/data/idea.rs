use serde::{Deserialize, Serialize};

/// One numbered candidate topic pulled out of the editor's response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    /// Leading number of the list entry. Unique within a batch, not necessarily contiguous.
    pub number: u32,
    /// Quoted or colon-separated title, when one could be found.
    pub title: Option<String>,
    /// Text describing the idea. The full idea text when no title was parsed.
    pub description: String,
    /// The entry as it appeared, continuation lines space-joined, including its `N.` prefix.
    pub raw_text: String,
}

impl Idea {
    /// The raw text without its leading `N.` marker.
    pub fn body(&self) -> &str {
        let trimmed = self.raw_text.trim_start();
        match trimmed.split_once('.') {
            Some((number, rest)) if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) => {
                rest.trim_start()
            }
            _ => trimmed,
        }
    }
}

/// Where a selection's headline came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadlineSource {
    /// Title of the parsed idea the writer chose.
    Idea,
    /// A heading-like line near the top of the story.
    Story,
    /// Nothing usable was found; the headline is `"{prefix}: Idea {n}"`.
    Synthetic,
}

/// The idea chosen for expansion, with the headline used to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub idea_number: u32,
    /// Never empty.
    pub headline: String,
    pub description: String,
    pub source: HeadlineSource,
}
