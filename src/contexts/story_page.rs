//! Rendering of story pages and the cards that link to them from the index.

use crate::data::{Storage, StoryRecord};
use crate::contexts::prose::CONTINUE_READING_ANCHOR;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Card excerpts longer than this are cut and suffixed with `...`.
const EXCERPT_CHARS: usize = 150;

/// Escapes text coming from model prose before it is placed into markup.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Page template with `{{STORY_*}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryTemplate {
    source: String,
}

impl StoryTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The template stored at `path`, or the built-in one.
    ///
    /// The built-in template is written to `path` so it can be edited for later runs.
    pub fn load<S: Storage>(storage: &S, path: &Path) -> Self {
        if let Some(source) = storage.read_text(path) {
            return Self::new(source);
        }

        tracing::info!(path = %path.display(), "story template missing, writing the default one");
        if let Err(e) = storage.write_text(path, DEFAULT_STORY_TEMPLATE) {
            tracing::warn!(error = %e, "could not save the default story template");
        }
        Self::new(DEFAULT_STORY_TEMPLATE)
    }

    /// Fills the placeholders for `record` and drops any `<footer>` block.
    pub fn render(&self, record: &StoryRecord) -> String {
        let page = self
            .source
            .replace("{{STORY_TITLE}}", &escape_html(&record.headline))
            .replace("{{STORY_DATE_ISO}}", &record.date_iso())
            .replace("{{STORY_DATE}}", &record.date_human())
            .replace("{{STORY_DESCRIPTION}}", &escape_html(&record.description))
            .replace("{{STORY_CONTENT}}", &record.body_html)
            .replace("{{IDEA_NUMBER}}", &record.idea_number.to_string());
        footer_re().replace_all(&page, "").into_owned()
    }
}

/// Link from the index into the story, landing on the anchored paragraph.
pub fn story_link(record: &StoryRecord, stories_dir: &str) -> String {
    format!("{}/{}#{}", stories_dir, record.filename, CONTINUE_READING_ANCHOR)
}

/// The single card shown in the index's featured section.
pub fn featured_card(record: &StoryRecord, stories_dir: &str) -> String {
    format!(
        r#"
        <div class="story-card featured">
            <h2 class="story-title">{title}</h2>
            <div class="story-meta">
                <span class="story-date">{date}</span>
            </div>
            <div class="story-excerpt">
                <p>{excerpt}</p>
                <a href="{link}" class="read-more">Continue reading →</a>
            </div>
        </div>
"#,
        title = escape_html(&record.headline),
        date = record.date_human(),
        excerpt = escape_html(&truncate_excerpt(&record.excerpt)),
        link = story_link(record, stories_dir),
    )
}

/// A card for the archive grid.
pub fn archive_card(record: &StoryRecord, stories_dir: &str) -> String {
    format!(
        r#"
                <div class="story-card">
                    <h3 class="story-title">{title}</h3>
                    <div class="story-meta">
                        <span class="story-date">{date}</span>
                    </div>
                    <p class="story-excerpt">{excerpt}</p>
                    <a href="{link}" class="read-more">Continue reading →</a>
                </div>
"#,
        title = escape_html(&record.headline),
        date = record.date_human(),
        excerpt = escape_html(&truncate_excerpt(&record.excerpt)),
        link = story_link(record, stories_dir),
    )
}

fn truncate_excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(EXCERPT_CHARS - 3).collect();
    format!("{}...", cut)
}

fn footer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<footer>.*?</footer>").expect("valid regex"))
}

pub const DEFAULT_STORY_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{STORY_TITLE}}</title>
    <link rel="stylesheet" href="../assets/css/style.css">
    <style>
        .story-container { max-width: 800px; margin: 0 auto; }
        .story-header { margin-bottom: 40px; text-align: center; }
        .story-headline { font-size: 2.8rem; margin-bottom: 20px; line-height: 1.2; }
        .story-meta { font-style: italic; color: #666; margin-bottom: 20px; }
        .story-description { font-size: 1.3rem; font-style: italic; margin-bottom: 30px; color: #555; }
        .story-content { font-size: 1.2rem; line-height: 1.8; }
        .story-content p { margin-bottom: 1.5em; }
        html { scroll-behavior: smooth; }
        #continue-reading { scroll-margin-top: 20px; }
    </style>
</head>
<body>
    <main class="container">
        <article class="story-container">
            <header class="story-header">
                <h1 class="story-headline">{{STORY_TITLE}}</h1>
                <div class="story-meta">
                    <time class="story-date" datetime="{{STORY_DATE_ISO}}">{{STORY_DATE}}</time>
                </div>
                <div class="story-description">
                    {{STORY_DESCRIPTION}}...
                </div>
            </header>

            <div class="story-content">
                {{STORY_CONTENT}}
            </div>

            <a href="../index.html" class="back-link">← Back to all stories</a>
        </article>
    </main>
</body>
</html>
"#;

/// Index page with a main region and no story regions; the merger adds those.
pub const BLANK_INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Stories</title>
    <link rel="stylesheet" href="assets/css/style.css">
</head>
<body>
    <main class="container">
    </main>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::MemoryStorage;
    use chrono::NaiveDate;

    fn record() -> StoryRecord {
        StoryRecord {
            headline: "Rise of X".to_string(),
            description: "a profile.".to_string(),
            idea_number: 2,
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            filename: "20240309-rise-of-x.html".to_string(),
            excerpt: "She arrived late.".to_string(),
            body_html: "<p>She arrived late.</p>\n<p id=\"continue-reading\">Body.</p>\n".to_string(),
        }
    }

    #[test]
    fn test_render_fills_placeholders_and_drops_footer() {
        let template = StoryTemplate::new(
            "<h1>{{STORY_TITLE}}</h1><i title=\"{{STORY_DATE_ISO}}\">{{STORY_DATE}}</i>{{STORY_DESCRIPTION}}{{STORY_CONTENT}}#{{IDEA_NUMBER}}<footer>\n(c)\n</footer>",
        );
        let page = template.render(&record());
        assert_eq!(
            page,
            "<h1>Rise of X</h1><i title=\"2024-03-09\">March 09, 2024</i>a profile.<p>She arrived late.</p>\n<p id=\"continue-reading\">Body.</p>\n#2"
        );
    }

    #[test]
    fn test_missing_template_is_written_back() {
        let storage = MemoryStorage::new();
        let path = Path::new("templates/story_template.html");

        let template = StoryTemplate::load(&storage, path);

        assert_eq!(template, StoryTemplate::new(DEFAULT_STORY_TEMPLATE));
        assert_eq!(storage.read_text(path).as_deref(), Some(DEFAULT_STORY_TEMPLATE));
    }

    #[test]
    fn test_cards_show_first_paragraph_and_link_to_anchor() {
        let featured = featured_card(&record(), "stories");
        assert!(featured.contains(r#"<div class="story-card featured">"#));
        assert!(featured.contains("<p>She arrived late.</p>"));
        assert!(featured.contains(r#"href="stories/20240309-rise-of-x.html#continue-reading""#));

        let archive = archive_card(&record(), "stories");
        assert!(archive.contains(r#"<div class="story-card">"#));
        assert!(archive.contains("<p class=\"story-excerpt\">She arrived late.</p>"));
        assert!(!archive.contains("a profile."));
    }

    #[test]
    fn test_card_excerpts_are_truncated() {
        let mut long = record();
        long.excerpt = "x".repeat(200);
        let card = featured_card(&long, "stories");
        let expected = format!("<p>{}...</p>", "x".repeat(147));
        assert!(card.contains(&expected));
        let archive = archive_card(&long, "stories");
        assert!(archive.contains(&format!("<p class=\"story-excerpt\">{}...</p>", "x".repeat(147))));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"Fish & "Chips" <b>"#), "Fish &amp; &quot;Chips&quot; &lt;b&gt;");
    }
}
