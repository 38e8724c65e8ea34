//! Record of published stories.
//!
//! Stored as JSON next to the site. Each entry keeps a hash of the story
//! body, so replaying a run with the same generated text is detected before
//! anything on the site changes.

use crate::data::{Storage, StorageError, StoryRecord};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum LedgerError {
    Parse(String),
    Serialize(String),
    Storage(StorageError),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LedgerError::Parse(reason) => write!(f, "Failed to parse publication ledger: {}", reason),
            LedgerError::Serialize(reason) => {
                write!(f, "Failed to serialize publication ledger: {}", reason)
            }
            LedgerError::Storage(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<StorageError> for LedgerError {
    fn from(e: StorageError) -> Self {
        LedgerError::Storage(e)
    }
}

/// One published story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub filename: String,
    pub headline: String,
    pub idea_number: u32,
    /// SHA-256 of the story body HTML
    pub body_hash: String,
    /// RFC 3339 time of publication
    pub published_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishLedger {
    entries: Vec<LedgerEntry>,
}

impl PublishLedger {
    /// Loads the ledger at `path`, or an empty one when there is none yet.
    pub fn load<S: Storage>(storage: &S, path: &Path) -> Result<Self, LedgerError> {
        match storage.read_text(path) {
            Some(content) => serde_json::from_str(&content).map_err(|e| LedgerError::Parse(e.to_string())),
            None => Ok(Self::default()),
        }
    }

    /// Like [`load`](Self::load), but an unreadable ledger is copied to
    /// `<path>.corrupt` and replaced by an empty one.
    pub fn load_or_reset<S: Storage>(storage: &S, path: &Path) -> Self {
        match Self::load(storage, path) {
            Ok(ledger) => ledger,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "starting a new publication ledger");
                if let Some(content) = storage.read_text(path) {
                    let backup = corrupt_path(path);
                    if let Err(e) = storage.write_text(&backup, &content) {
                        tracing::warn!(error = %e, "could not keep a copy of the unreadable ledger");
                    }
                }
                Self::default()
            }
        }
    }

    pub fn save<S: Storage>(&self, storage: &S, path: &Path) -> Result<(), LedgerError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| LedgerError::Serialize(e.to_string()))?;
        storage.write_text(path, &content)?;
        Ok(())
    }

    pub fn hash_body(body_html: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(body_html.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// The entry of an earlier story with exactly this body, if any.
    pub fn find_body(&self, body_html: &str) -> Option<&LedgerEntry> {
        let hash = Self::hash_body(body_html);
        self.entries.iter().find(|entry| entry.body_hash == hash)
    }

    pub fn record(&mut self, story: &StoryRecord) {
        self.entries.push(LedgerEntry {
            filename: story.filename.clone(),
            headline: story.headline.clone(),
            idea_number: story.idea_number,
            body_hash: Self::hash_body(&story.body_html),
            published_at: chrono::Utc::now().to_rfc3339(),
        });
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn summary(&self) -> String {
        let mut lines = vec!["Published stories:".to_string()];
        for entry in self.entries.iter().rev() {
            lines.push(format!(
                "  {}  {} (idea {}, {})",
                entry.published_at, entry.headline, entry.idea_number, entry.filename
            ));
        }
        if self.entries.is_empty() {
            lines.push("  Nothing published yet".to_string());
        }
        lines.join("\n")
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".corrupt");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contexts::MemoryStorage;
    use chrono::NaiveDate;

    fn story(body: &str) -> StoryRecord {
        StoryRecord {
            headline: "Rise of X".to_string(),
            description: String::new(),
            idea_number: 1,
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            filename: "20240309-rise-of-x.html".to_string(),
            excerpt: "Paragraph one.".to_string(),
            body_html: body.to_string(),
        }
    }

    #[test]
    fn test_hash_body() {
        let hash1 = PublishLedger::hash_body("<p>a</p>");
        let hash2 = PublishLedger::hash_body("<p>a</p>");
        let hash3 = PublishLedger::hash_body("<p>b</p>");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_record_save_and_load() {
        let storage = MemoryStorage::new();
        let path = Path::new(".storydesk/ledger.json");

        let mut ledger = PublishLedger::load(&storage, path).unwrap();
        assert!(ledger.entries().is_empty());

        ledger.record(&story("<p>a</p>"));
        ledger.save(&storage, path).unwrap();

        let loaded = PublishLedger::load(&storage, path).unwrap();
        assert_eq!(loaded, ledger);
        assert_eq!(
            loaded.find_body("<p>a</p>").map(|e| e.filename.as_str()),
            Some("20240309-rise-of-x.html")
        );
        assert!(loaded.find_body("<p>b</p>").is_none());
        assert!(loaded.summary().contains("Rise of X (idea 1, 20240309-rise-of-x.html)"));
    }

    #[test]
    fn test_corrupt_ledger_is_an_error() {
        let storage = MemoryStorage::new().with_file("ledger.json", "{not json");
        assert!(matches!(
            PublishLedger::load(&storage, Path::new("ledger.json")),
            Err(LedgerError::Parse(_))
        ));
    }

    #[test]
    fn test_corrupt_ledger_is_reset_and_kept_aside() {
        let storage = MemoryStorage::new().with_file("ledger.json", "{oops");

        let ledger = PublishLedger::load_or_reset(&storage, Path::new("ledger.json"));

        assert!(ledger.entries().is_empty());
        assert_eq!(
            storage.read_text(Path::new("ledger.json.corrupt")).as_deref(),
            Some("{oops")
        );
    }
}
