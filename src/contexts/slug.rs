//! Filenames for published stories.

use crate::contexts::prose::is_selection_announcement;
use crate::contexts::selection::synthetic_headline;
use crate::data::{Idea, Selection};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

const STORY_SCAN_LINES: usize = 20;
const MIN_LINE_CHARS: usize = 15;
const MIN_LINE_SLUG_CHARS: usize = 10;
const LAST_RESORT_SLUG: &str = "story";

/// Lower-cases `text`, drops punctuation, hyphenates whitespace and caps the length.
pub fn slugify(text: &str, max_len: usize) -> String {
    let lowered = text.to_lowercase();
    let cleaned = unsafe_chars_re().replace_all(&lowered, "");
    let hyphenated = separator_run_re().replace_all(&cleaned, "-");
    let capped: String = hyphenated.chars().take(max_len).collect();
    capped.trim_matches('-').to_string()
}

#[derive(Debug, Clone)]
pub struct SlugFilenameGenerator {
    max_len: usize,
    extension: String,
    headline_prefix: String,
}

impl Default for SlugFilenameGenerator {
    fn default() -> Self {
        Self::new(40, "Feature")
    }
}

impl SlugFilenameGenerator {
    pub fn new(max_len: usize, headline_prefix: &str) -> Self {
        Self {
            max_len,
            extension: "html".to_string(),
            headline_prefix: headline_prefix.to_string(),
        }
    }

    /// A slug with some content in it.
    ///
    /// When the headline slugifies to nothing, or to the synthetic
    /// "Idea N" headline, the first substantial story line is tried, then
    /// the chosen idea's own text.
    pub fn slug(&self, selection: &Selection, story: &str, chosen: Option<&Idea>) -> String {
        let generic = slugify(&synthetic_headline(&self.headline_prefix, selection.idea_number), self.max_len);
        let usable = |slug: &str| !slug.is_empty() && slug != generic;

        let slug = slugify(&selection.headline, self.max_len);
        if usable(&slug) {
            return slug;
        }

        let from_story = story
            .trim()
            .lines()
            .take(STORY_SCAN_LINES)
            .map(str::trim)
            .filter(|line| line.chars().count() > MIN_LINE_CHARS && !is_selection_announcement(line))
            .map(|line| slugify(line, self.max_len))
            .find(|slug| slug.chars().count() > MIN_LINE_SLUG_CHARS && usable(slug));
        if let Some(slug) = from_story {
            tracing::debug!(slug = %slug, "headline slug was generic, using a story line");
            return slug;
        }

        if let Some(slug) = chosen.map(|idea| slugify(idea.body(), self.max_len)).filter(|s| usable(s)) {
            tracing::debug!(slug = %slug, "headline slug was generic, using the idea text");
            return slug;
        }

        tracing::warn!("no meaningful slug found");
        if generic.is_empty() {
            LAST_RESORT_SLUG.to_string()
        } else {
            generic
        }
    }

    /// `{yyyymmdd}-{slug}.html`, suffixed `-1`, `-2`, ... until it is not in `existing`.
    pub fn filename(&self, slug: &str, date: NaiveDate, existing: &BTreeSet<String>) -> String {
        let base = format!("{}-{}", crate::data::compact_date(date), slug);
        let mut filename = format!("{}.{}", base, self.extension);
        let mut counter = 1;
        while existing.contains(&filename) {
            filename = format!("{}-{}.{}", base, counter, self.extension);
            counter += 1;
        }
        filename
    }

    pub fn generate(
        &self,
        selection: &Selection,
        story: &str,
        chosen: Option<&Idea>,
        date: NaiveDate,
        existing: &BTreeSet<String>,
    ) -> String {
        let slug = self.slug(selection, story, chosen);
        let filename = self.filename(&slug, date, existing);
        tracing::info!(headline = %selection.headline, filename = %filename, "story filename chosen");
        filename
    }
}

fn unsafe_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s-]").expect("valid regex"))
}

fn separator_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s-]+").expect("valid regex"))
}
