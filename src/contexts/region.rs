//! Named regions of a hand-editable HTML document.
//!
//! A region is found by its opening marker, optionally closed by a pattern
//! that must occur before a boundary string. Nothing here parses HTML; every
//! edit is a splice at offsets found by pattern search, so the document keeps
//! its formatting.

use regex::Regex;
use std::ops::Range;

#[derive(Debug, Clone)]
pub struct NamedRegion {
    name: &'static str,
    open: Regex,
    close: Option<Regex>,
    boundary: Option<&'static str>,
}

impl NamedRegion {
    pub fn new(name: &'static str, open: Regex) -> Self {
        Self {
            name,
            open,
            close: None,
            boundary: None,
        }
    }

    /// Pattern ending the region. The first match after the opening marker wins.
    pub fn closed_by(mut self, close: Regex) -> Self {
        self.close = Some(close);
        self
    }

    /// The region never extends past the next occurrence of `boundary`.
    pub fn bounded_by(mut self, boundary: &'static str) -> Self {
        self.boundary = Some(boundary);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_present(&self, doc: &str) -> bool {
        self.open.is_match(doc)
    }

    /// Every complete region in the document, in order.
    pub fn spans(&self, doc: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut from = 0;
        while let Some(open) = self.open.find_at(doc, from) {
            match self.close_after(doc, open.end()) {
                Some(close) => {
                    spans.push(open.start()..close.end);
                    from = close.end;
                }
                None => from = open.end(),
            }
        }
        spans
    }

    pub fn span(&self, doc: &str) -> Option<Range<usize>> {
        self.spans(doc).into_iter().next()
    }

    /// Text between the opening marker and the close pattern, boundary or end of document.
    pub fn body<'a>(&self, doc: &'a str) -> Option<&'a str> {
        let open = self.open.find(doc)?;
        let end = match self.close_after(doc, open.end()) {
            Some(close) => close.start,
            None => self.limit(doc, open.end()),
        };
        Some(&doc[open.end()..end])
    }

    /// Replaces the first region with `fragment` and removes any later copies,
    /// leaving exactly one. `None` when the region is absent.
    pub fn replace(&self, doc: &str, fragment: &str) -> Option<String> {
        let spans = self.spans(doc);
        let first = spans.first()?.clone();

        let mut out = String::with_capacity(doc.len() + fragment.len());
        out.push_str(&doc[..first.start]);
        out.push_str(fragment);
        let mut cursor = first.end;
        for extra in &spans[1..] {
            tracing::warn!(region = self.name, "removing duplicate region");
            out.push_str(&doc[cursor..extra.start]);
            cursor = extra.end;
        }
        out.push_str(&doc[cursor..]);
        Some(out)
    }

    /// Inserts `fragment` right after the first opening marker.
    pub fn insert_after_open(&self, doc: &str, fragment: &str) -> Option<String> {
        let open = self.open.find(doc)?;
        Some(splice(doc, open.end(), fragment))
    }

    /// Inserts `fragment` right before the close pattern that ends the first region.
    pub fn insert_before_close(&self, doc: &str, fragment: &str) -> Option<String> {
        let open = self.open.find(doc)?;
        let close = self.close_after(doc, open.end())?;
        Some(splice(doc, close.start, fragment))
    }

    fn limit(&self, doc: &str, from: usize) -> usize {
        self.boundary
            .and_then(|boundary| doc[from..].find(boundary))
            .map_or(doc.len(), |offset| from + offset)
    }

    fn close_after(&self, doc: &str, from: usize) -> Option<Range<usize>> {
        let close = self.close.as_ref()?;
        let limit = self.limit(doc, from);
        close
            .find(&doc[from..limit])
            .map(|m| from + m.start()..from + m.end())
    }
}

fn splice(doc: &str, at: usize, fragment: &str) -> String {
    let mut out = String::with_capacity(doc.len() + fragment.len());
    out.push_str(&doc[..at]);
    out.push_str(fragment);
    out.push_str(&doc[at..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card_region() -> NamedRegion {
        NamedRegion::new("card", Regex::new(r#"<div class="card">"#).unwrap())
            .closed_by(Regex::new(r"</div>\s*</div>").unwrap())
            .bounded_by("</section>")
    }

    #[test]
    fn test_span_stops_at_close() {
        let doc = r#"<section><div class="card"><div>a</div> </div><p>after</p></section>"#;
        let span = card_region().span(doc).unwrap();
        assert_eq!(&doc[span], r#"<div class="card"><div>a</div> </div>"#);
    }

    #[test]
    fn test_span_does_not_cross_boundary() {
        let doc = r#"<section><div class="card"><p>broken</p></section><section><div>x</div></div></section>"#;
        assert_eq!(card_region().span(doc), None);
        assert!(card_region().is_present(doc));
    }

    #[test]
    fn test_replace_leaves_one_region() {
        let doc = r#"<section><div class="card"><div>1</div></div></section><section><div class="card"><div>2</div></div></section>"#;
        let out = card_region().replace(doc, "NEW").unwrap();
        assert_eq!(out, "<section>NEW</section><section></section>");
    }

    #[test]
    fn test_replace_absent_region() {
        assert_eq!(card_region().replace("<section></section>", "NEW"), None);
    }

    #[test]
    fn test_insertions() {
        let main = NamedRegion::new("main", Regex::new(r"<main\b[^>]*>").unwrap())
            .closed_by(Regex::new("</main>").unwrap());
        let doc = r#"<body><main class="container"></main></body>"#;

        assert_eq!(
            main.insert_after_open(doc, "A").unwrap(),
            r#"<body><main class="container">A</main></body>"#
        );
        assert_eq!(
            main.insert_before_close(doc, "Z").unwrap(),
            r#"<body><main class="container">Z</main></body>"#
        );
        assert_eq!(main.body(doc), Some(""));
    }

    #[test]
    fn test_body_runs_to_boundary_without_close() {
        let grid = NamedRegion::new("grid", Regex::new(r#"<div class="grid">"#).unwrap())
            .bounded_by("</section>");
        let doc = r#"<div class="grid"><a href="x"></a></div></section><a href="y">"#;
        assert_eq!(grid.body(doc), Some(r#"<a href="x"></a></div>"#));
    }
}
