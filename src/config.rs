//! Run configuration, loaded from an optional YAML file.

use crate::contexts::UnknownChoice;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "storydesk.yml";
pub const API_KEY_VAR: &str = "ANTHROPIC_KEY";

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, reason: String },
    Parse { path: PathBuf, reason: String },
    MissingApiKey { key_file: PathBuf },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Read { path, reason } => {
                write!(f, "Failed to read config {}: {}", path.display(), reason)
            }
            ConfigError::Parse { path, reason } => {
                write!(f, "Invalid config {}: {}", path.display(), reason)
            }
            ConfigError::MissingApiKey { key_file } => write!(
                f,
                "No API key: set {} or put the key in {}",
                API_KEY_VAR,
                key_file.display()
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the publication, used in prompts.
    pub publication: String,
    /// How many ideas the editor is asked for.
    pub idea_count: u32,
    /// How the writer is told to announce its choice.
    pub selection_instruction: String,
    /// Extra regex tried before the built-in choice patterns. Group 1 is the idea number.
    pub selection_pattern: Option<String>,
    pub headline_prefix: String,
    pub unknown_choice: UnknownChoice,
    pub slug_max_len: usize,
    pub site_dir: PathBuf,
    /// Relative to `site_dir`; also the link prefix used in the index.
    pub stories_dir: String,
    pub index_file: String,
    pub template_path: PathBuf,
    pub index_template_path: PathBuf,
    pub stylesheet_source: PathBuf,
    pub agents_dir: PathBuf,
    pub model: Option<String>,
    pub ledger_path: PathBuf,
    /// Dollars per token, for the cost estimate printed after a run.
    pub cost_per_token: f64,
    pub key_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            publication: "Prestige Report".to_string(),
            idea_count: 3,
            selection_instruction: "Select the ONE idea that inspires you most and begin your response with \"I choose idea number N.\"".to_string(),
            selection_pattern: None,
            headline_prefix: "Feature".to_string(),
            unknown_choice: UnknownChoice::default(),
            slug_max_len: 40,
            site_dir: PathBuf::from("docs"),
            stories_dir: "stories".to_string(),
            index_file: "index.html".to_string(),
            template_path: PathBuf::from("templates/story_template.html"),
            index_template_path: PathBuf::from("templates/index.html"),
            stylesheet_source: PathBuf::from("templates/style.css"),
            agents_dir: PathBuf::from("agents"),
            model: None,
            ledger_path: PathBuf::from(".storydesk/ledger.json"),
            cost_per_token: 0.00015,
            key_file: PathBuf::from("scripts/key.txt"),
        }
    }
}

impl Config {
    /// Loads `path`, or the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn stories_path(&self) -> PathBuf {
        self.site_dir.join(&self.stories_dir)
    }

    pub fn index_path(&self) -> PathBuf {
        self.site_dir.join(&self.index_file)
    }

    pub fn stylesheet_path(&self) -> PathBuf {
        self.site_dir.join("assets").join("css").join("style.css")
    }
}

/// Credential for the hosted model. Debug output never shows the key.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Reads the key from the environment (after loading a `.env` file if
    /// present), then from `key_file`.
    pub fn load(key_file: &Path) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let non_empty = |k: String| Some(k.trim().to_string()).filter(|k| !k.is_empty());
        let key = std::env::var(API_KEY_VAR)
            .ok()
            .and_then(non_empty)
            .or_else(|| fs::read_to_string(key_file).ok().and_then(non_empty))
            .ok_or_else(|| ConfigError::MissingApiKey {
                key_file: key_file.to_path_buf(),
            })?;
        Ok(Self(key))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}
