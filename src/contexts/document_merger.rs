//! Keeps the site index in step with published stories.
//!
//! The index stays a plain, hand-editable HTML file. Its featured card is
//! replaced on every merge and new archive cards are prepended to the grid.
//! Missing sections are bootstrapped, and that is decided by looking for
//! their markers, so running the merge again never re-adds them.

use crate::contexts::region::NamedRegion;
use crate::contexts::story_page::BLANK_INDEX;
use crate::data::{Storage, StorageError};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

pub const ARCHIVE_GRID_MARKER: &str = r#"<div class="story-grid">"#;
pub const FEATURED_CARD_MARKER: &str = r#"<div class="story-card featured">"#;
pub const FEATURED_SECTION_MARKER: &str = r#"<section class="featured-story">"#;

const ARCHIVE_SKELETON: &str = r#"
    <section class="story-archive">
        <h2 class="section-title">Recent Stories</h2>
        <div class="story-grid">
        </div>
    </section>

"#;

#[derive(Debug, Clone)]
pub struct DocumentMerger {
    main: NamedRegion,
    body: NamedRegion,
    featured_section: NamedRegion,
    featured_card: NamedRegion,
    archive: NamedRegion,
}

impl Default for DocumentMerger {
    fn default() -> Self {
        Self {
            main: NamedRegion::new("main", literal(r"<main\b[^>]*>")).closed_by(literal("</main>")),
            body: NamedRegion::new("body", literal(r"<body\b[^>]*>")).closed_by(literal("</body>")),
            featured_section: NamedRegion::new("featured-section", escaped(FEATURED_SECTION_MARKER)),
            featured_card: NamedRegion::new("featured-card", escaped(FEATURED_CARD_MARKER))
                .closed_by(literal(r"</div>\s*</div>"))
                .bounded_by("</section>"),
            archive: NamedRegion::new("archive", escaped(ARCHIVE_GRID_MARKER)).bounded_by("</section>"),
        }
    }
}

impl DocumentMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one story into the index text.
    ///
    /// `document` is the current index, or `None` to start from a blank page.
    pub fn merge(&self, document: Option<&str>, featured_card: &str, archive_card: &str) -> String {
        let doc = document.unwrap_or(BLANK_INDEX);
        let doc = self.bootstrap_archive(doc);
        let doc = self.set_featured(&doc, featured_card);
        self.prepend_archive(&doc, archive_card)
    }

    /// Reads the index at `path` (or `seed`, or a blank page when it is missing),
    /// merges the cards and writes it back.
    pub fn merge_into<S: Storage>(
        &self,
        storage: &S,
        path: &Path,
        seed: Option<&str>,
        featured_card: &str,
        archive_card: &str,
    ) -> Result<String, StorageError> {
        let current = storage.read_text(path);
        if current.is_none() {
            tracing::info!(path = %path.display(), "index missing, starting a new one");
        }
        let document = current.as_deref().or(seed);
        let merged = self.merge(document, featured_card, archive_card);
        storage.write_text(path, &merged)?;
        Ok(merged)
    }

    /// Number of cards in the archive grid.
    pub fn archive_len(&self, doc: &str) -> usize {
        self.archive
            .body(doc)
            .map_or(0, |grid| grid.matches(r#"<div class="story-card">"#).count())
    }

    /// Number of featured cards anywhere in the document.
    pub fn featured_len(&self, doc: &str) -> usize {
        doc.matches(FEATURED_CARD_MARKER).count()
    }

    fn bootstrap_archive(&self, doc: &str) -> String {
        if self.archive.is_present(doc) {
            return doc.to_string();
        }
        tracing::info!("index has no archive grid, adding one");
        self.main
            .insert_before_close(doc, ARCHIVE_SKELETON)
            .or_else(|| self.body.insert_before_close(doc, ARCHIVE_SKELETON))
            .unwrap_or_else(|| format!("{}{}", doc, ARCHIVE_SKELETON))
    }

    fn set_featured(&self, doc: &str, card: &str) -> String {
        if let Some(replaced) = self.featured_card.replace(doc, card.trim()) {
            return replaced;
        }

        if self.featured_section.is_present(doc) {
            tracing::info!("featured section has no card, inserting one");
            if let Some(inserted) = self.featured_section.insert_after_open(doc, &format!("\n{}\n", card)) {
                return inserted;
            }
        }

        tracing::info!("index has no featured section, adding one");
        let section = format!("\n\n{}\n{}\n</section>\n\n", FEATURED_SECTION_MARKER, card);
        self.main
            .insert_after_open(doc, &section)
            .or_else(|| self.body.insert_after_open(doc, &section))
            .unwrap_or_else(|| format!("{}{}", section, doc))
    }

    fn prepend_archive(&self, doc: &str, card: &str) -> String {
        if let (Some(link), Some(grid)) = (card_link(card), self.archive.body(doc)) {
            if grid.contains(&format!("href=\"{}\"", link)) {
                tracing::warn!(link, "story already in the archive, not adding it again");
                return doc.to_string();
            }
        }
        let fragment = format!("\n{}", card.trim_matches('\n'));
        self.archive
            .insert_after_open(doc, &fragment)
            .unwrap_or_else(|| doc.to_string())
    }
}

fn card_link(card: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r#"href="([^"]+)""#).expect("valid regex"));
    re.captures(card)?.get(1).map(|m| m.as_str())
}

fn literal(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

fn escaped(marker: &str) -> Regex {
    literal(&regex::escape(marker))
}
