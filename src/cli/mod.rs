use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

mod progress;

use progress::RunProgress;
use storydesk::config::{ApiKey, Config as DeskConfig};
use storydesk::contexts::{
    AgentModelRegistry, AgentRegistry, AnthropicGenerator, DryRunStorage, FileStorage, Generator,
    PublishOutcome, StoryPipeline,
};
use storydesk::data::Storage;
use storydesk::publish_ledger::PublishLedger;
use storydesk::registries::{FileAgentModelRegistry, FileAgentRegistry};

#[derive(Clone, Copy)]
pub struct Config {
    pub verbose: bool,
    pub dry_run: bool,
}

const MODEL_REGISTRY_FILE: &str = "agent_model_registry.yml";

/// Generates ideas and a story with the hosted model and publishes it.
pub async fn run(settings: &DeskConfig, date: NaiveDate, config: &Config) -> Result<()> {
    let api_key = ApiKey::load(&settings.key_file).context("Cannot call the model without an API key")?;
    let generator = AnthropicGenerator::new(api_key);
    let agents = FileAgentRegistry::new(Some(settings.agents_dir.clone()));
    let models = FileAgentModelRegistry::new(
        Some(settings.agents_dir.join(MODEL_REGISTRY_FILE)),
        settings.model.clone(),
        None,
    );

    if config.dry_run {
        let pipeline = StoryPipeline::new(DryRunStorage::new(FileStorage::new(None)), settings.clone());
        generate_and_publish(&pipeline, &generator, &agents, &models, date, config).await?;
        report_dry_run(pipeline.storage());
    } else {
        let pipeline = StoryPipeline::new(FileStorage::new(None), settings.clone());
        generate_and_publish(&pipeline, &generator, &agents, &models, date, config).await?;
    }
    Ok(())
}

async fn generate_and_publish<S, G, R, M>(
    pipeline: &StoryPipeline<S>,
    generator: &G,
    agents: &R,
    models: &M,
    date: NaiveDate,
    config: &Config,
) -> Result<()>
where
    S: Storage,
    G: Generator,
    R: AgentRegistry,
    M: AgentModelRegistry,
{
    let mut progress = RunProgress::new();

    progress.start_step("Generating story ideas");
    let ideas = pipeline.generate_ideas(generator, agents, models).await;
    progress.generation("Ideas", &ideas);
    if config.verbose {
        println!("{}\n", ideas.text);
    }
    pipeline
        .parse_ideas(&ideas.text)
        .context("Nothing to write about, skipping the writer")?;

    progress.start_step("Writing story");
    let story = pipeline.write_story(&ideas.text, generator, agents, models).await;
    progress.generation("Story", &story);
    if config.verbose {
        println!("{}\n", story.text);
    }

    let outcome = pipeline
        .publish(&ideas.text, &story.text, ideas.tokens + story.tokens, date)
        .context("Failed to publish story")?;
    progress.finish(&outcome);
    Ok(())
}

/// Publishes a story from saved editor and writer responses, without calling the model.
pub fn publish(
    settings: &DeskConfig,
    ideas_path: &Path,
    story_path: &Path,
    date: NaiveDate,
    config: &Config,
) -> Result<()> {
    let ideas = fs::read_to_string(ideas_path)
        .with_context(|| format!("Failed to read ideas from {}", ideas_path.display()))?;
    let story = fs::read_to_string(story_path)
        .with_context(|| format!("Failed to read story from {}", story_path.display()))?;

    let progress = RunProgress::new();
    let result = if config.dry_run {
        let pipeline = StoryPipeline::new(DryRunStorage::new(FileStorage::new(None)), settings.clone());
        let outcome = pipeline.publish(&ideas, &story, 0, date);
        report_dry_run(pipeline.storage());
        outcome
    } else {
        StoryPipeline::new(FileStorage::new(None), settings.clone()).publish(&ideas, &story, 0, date)
    };
    let outcome = result.context("Failed to publish story")?;

    if config.verbose {
        if let PublishOutcome::Published(report) = &outcome {
            println!("{}", report.record.body_html);
        }
    }
    progress.finish(&outcome);
    Ok(())
}

/// Prints a published page as plain text.
pub fn preview(path: &Path, width: usize) -> Result<()> {
    let html = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = html2text::from_read(html.as_slice(), width)
        .with_context(|| format!("Failed to render {}", path.display()))?;
    println!("{}", text);
    Ok(())
}

/// Lists everything published so far, newest first.
pub fn ledger(settings: &DeskConfig, config: &Config) -> Result<()> {
    let storage = FileStorage::new(None);
    let ledger = PublishLedger::load(&storage, &settings.ledger_path)
        .with_context(|| format!("Failed to load {}", settings.ledger_path.display()))?;
    println!("{}", ledger.summary());
    if config.verbose {
        println!("Ledger: {}", settings.ledger_path.display());
    }
    Ok(())
}

fn report_dry_run<S: Storage>(storage: &DryRunStorage<S>) {
    let captured = storage.captured();
    if captured.is_empty() {
        println!("[DRY RUN] Nothing would be written");
        return;
    }
    for path in captured {
        println!("[DRY RUN] Would write: {}", path.display());
    }
}
