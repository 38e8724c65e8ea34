//! One publishing run: two generation calls, then parse, render and merge.

use crate::config::Config;
use crate::contexts::agent_runner::{AgentModelRegistry, AgentRegistry, AgentRunner, Generation, Generator};
use crate::contexts::document_merger::DocumentMerger;
use crate::contexts::idea_list::IdeaList;
use crate::contexts::prose::Paragraphs;
use crate::contexts::selection::{ChoicePattern, SelectionExtractor};
use crate::contexts::slug::SlugFilenameGenerator;
use crate::contexts::story_page::{StoryTemplate, archive_card, featured_card};
use crate::data::{Storage, StorageError, StoryRecord};
use crate::publish_ledger::{LedgerError, PublishLedger};
use crate::registries::{EDITOR_AGENT, WRITER_AGENT};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Errors that stop a run before anything is published
#[derive(Debug)]
pub enum PublishError {
    /// The editor's response held no numbered ideas, so there is nothing to write about.
    NoIdeas,
    Storage(StorageError),
    Ledger(LedgerError),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PublishError::NoIdeas => write!(f, "No ideas could be parsed from the editor's response"),
            PublishError::Storage(e) => write!(f, "{}", e),
            PublishError::Ledger(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PublishError {}

impl From<StorageError> for PublishError {
    fn from(e: StorageError) -> Self {
        PublishError::Storage(e)
    }
}

impl From<LedgerError> for PublishError {
    fn from(e: LedgerError) -> Self {
        PublishError::Ledger(e)
    }
}

/// Values available to the agents' prompt placeholders.
#[derive(Debug, Clone, Serialize)]
pub struct AgentInput {
    pub publication: String,
    pub idea_count: u32,
    /// The editor's raw response. Empty for the editor call itself.
    pub ideas: String,
    pub selection_instruction: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishReport {
    pub record: StoryRecord,
    pub story_path: PathBuf,
    pub index_path: PathBuf,
    pub tokens: u64,
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    Published(PublishReport),
    /// The same story body was published before; the site was left alone.
    AlreadyPublished { filename: String },
}

pub struct StoryPipeline<S> {
    storage: S,
    config: Config,
}

impl<S: Storage> StoryPipeline<S> {
    pub fn new(storage: S, config: Config) -> Self {
        Self { storage, config }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn agent_input(&self, ideas: &str) -> AgentInput {
        AgentInput {
            publication: self.config.publication.clone(),
            idea_count: self.config.idea_count,
            ideas: ideas.to_string(),
            selection_instruction: self.config.selection_instruction.clone(),
        }
    }

    /// Asks the editor agent for a numbered list of ideas.
    pub async fn generate_ideas<G, R, M>(&self, generator: &G, agents: &R, models: &M) -> Generation
    where
        G: Generator,
        R: AgentRegistry,
        M: AgentModelRegistry,
    {
        AgentRunner::new(EDITOR_AGENT, generator, agents, models)
            .run(&self.agent_input(""))
            .await
    }

    /// Asks the writer agent to pick one of `ideas` and write it up.
    pub async fn write_story<G, R, M>(&self, ideas: &str, generator: &G, agents: &R, models: &M) -> Generation
    where
        G: Generator,
        R: AgentRegistry,
        M: AgentModelRegistry,
    {
        AgentRunner::new(WRITER_AGENT, generator, agents, models)
            .run(&self.agent_input(ideas))
            .await
    }

    /// Generates ideas and a story, then publishes it.
    ///
    /// The writer call embeds the editor's output, so the two calls run one after
    /// the other, and the writer is never asked when the editor produced no ideas.
    pub async fn run<G, R, M>(
        &self,
        generator: &G,
        agents: &R,
        models: &M,
        date: NaiveDate,
    ) -> Result<PublishOutcome, PublishError>
    where
        G: Generator,
        R: AgentRegistry,
        M: AgentModelRegistry,
    {
        let ideas = self.generate_ideas(generator, agents, models).await;
        self.parse_ideas(&ideas.text)?;
        let story = self.write_story(&ideas.text, generator, agents, models).await;
        self.publish(&ideas.text, &story.text, ideas.tokens + story.tokens, date)
    }

    /// The numbered ideas in the editor's response. None at all ends the run.
    pub fn parse_ideas(&self, ideas_text: &str) -> Result<IdeaList, PublishError> {
        let ideas = IdeaList::parse(ideas_text).map_err(|e| {
            tracing::error!(error = %e, "aborting run");
            PublishError::NoIdeas
        })?;
        tracing::info!(count = ideas.len(), "ideas parsed");
        Ok(ideas)
    }

    /// Turns the two raw responses into a story page and merges it into the index.
    pub fn publish(
        &self,
        ideas_text: &str,
        story_text: &str,
        tokens: u64,
        date: NaiveDate,
    ) -> Result<PublishOutcome, PublishError> {
        let ideas = self.parse_ideas(ideas_text)?;

        let selection = self.extractor().extract(story_text, &ideas);
        tracing::info!(
            idea = selection.idea_number,
            headline = %selection.headline,
            source = ?selection.source,
            "selection extracted"
        );

        let paragraphs = Paragraphs::from_story(story_text);
        let body_html = paragraphs.to_html();

        let mut ledger = PublishLedger::load_or_reset(&self.storage, &self.config.ledger_path);
        if let Some(entry) = ledger.find_body(&body_html) {
            tracing::warn!(filename = %entry.filename, "story already published, skipping");
            return Ok(PublishOutcome::AlreadyPublished {
                filename: entry.filename.clone(),
            });
        }

        let stories_path = self.config.stories_path();
        self.storage.ensure_dir(&stories_path)?;
        let existing = self.storage.list_names(&stories_path);
        let filename = SlugFilenameGenerator::new(self.config.slug_max_len, &self.config.headline_prefix)
            .generate(
                &selection,
                story_text,
                ideas.get(selection.idea_number),
                date,
                &existing,
            );

        let record = StoryRecord {
            headline: selection.headline,
            description: selection.description,
            idea_number: selection.idea_number,
            date,
            filename,
            excerpt: paragraphs.first().to_string(),
            body_html,
        };

        let template = StoryTemplate::load(&self.storage, &self.config.template_path);
        let story_path = stories_path.join(&record.filename);
        self.storage.write_text(&story_path, &template.render(&record))?;
        tracing::info!(path = %story_path.display(), "story page written");

        self.copy_stylesheet();

        let index_path = self.config.index_path();
        let seed = self.storage.read_text(&self.config.index_template_path);
        DocumentMerger::new().merge_into(
            &self.storage,
            &index_path,
            seed.as_deref(),
            &featured_card(&record, &self.config.stories_dir),
            &archive_card(&record, &self.config.stories_dir),
        )?;
        tracing::info!(path = %index_path.display(), "index updated");

        ledger.record(&record);
        ledger.save(&self.storage, &self.config.ledger_path)?;

        Ok(PublishOutcome::Published(PublishReport {
            record,
            story_path,
            index_path,
            tokens,
            estimated_cost: tokens as f64 * self.config.cost_per_token,
        }))
    }

    fn extractor(&self) -> SelectionExtractor {
        let extractor = SelectionExtractor::new(&self.config.headline_prefix, self.config.unknown_choice);
        let Some(pattern) = self.config.selection_pattern.as_deref() else {
            return extractor;
        };
        match ChoicePattern::custom("configured", pattern) {
            Ok(custom) => extractor.with_choice_pattern(custom),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring invalid selection_pattern");
                extractor
            }
        }
    }

    /// Copies the stylesheet into the site unless it is already there.
    fn copy_stylesheet(&self) {
        let target = self.config.stylesheet_path();
        if self.storage.exists(&target) {
            return;
        }
        let Some(css) = self.storage.read_text(&self.config.stylesheet_source) else {
            tracing::warn!(
                source = %self.config.stylesheet_source.display(),
                "stylesheet source missing, site will be unstyled"
            );
            return;
        };
        match self.storage.write_text(&target, &css) {
            Ok(()) => tracing::info!(path = %target.display(), "stylesheet copied"),
            Err(e) => tracing::warn!(error = %e, "could not copy stylesheet"),
        }
    }
}
