use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A story as written to the site. Created once per run and never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub headline: String,
    pub description: String,
    pub idea_number: u32,
    pub date: NaiveDate,
    pub filename: String,
    /// First paragraph as plain text. Summary views show this and link past it.
    pub excerpt: String,
    pub body_html: String,
}

impl StoryRecord {
    /// `2024-03-09`
    pub fn date_iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// `March 09, 2024`
    pub fn date_human(&self) -> String {
        self.date.format("%B %d, %Y").to_string()
    }

    /// `20240309`, the filename prefix that keeps stories ordered on disk.
    pub fn date_compact(&self) -> String {
        compact_date(self.date)
    }
}

pub(crate) fn compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_renderings() {
        let record = StoryRecord {
            headline: "Rise of X".to_string(),
            description: String::new(),
            idea_number: 1,
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            filename: "20240309-rise-of-x.html".to_string(),
            excerpt: String::new(),
            body_html: String::new(),
        };
        assert_eq!(record.date_iso(), "2024-03-09");
        assert_eq!(record.date_human(), "March 09, 2024");
        assert_eq!(record.date_compact(), "20240309");
    }
}
