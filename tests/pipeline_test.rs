//! Full runs through the library with a scripted generator in place of the hosted model.

use chrono::NaiveDate;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use storydesk::config::Config;
use storydesk::contexts::{
    DocumentMerger, FAILURE_MARKER, Generation, GenerationError, GenerationRequest, Generator,
    MemoryStorage, PublishError, PublishOutcome, StoryPipeline,
};
use storydesk::data::Storage;
use storydesk::registries::{FileAgentModelRegistry, FileAgentRegistry};

const IDEAS: &str = "Here are this issue's pitches:\n\n1. \"The Last Salon\": Inside the final literary salon on the Upper East Side.\n2. \"Velvet Rope Economics\": How exclusivity became a business model.\n3. \"Heirs Apparent\": The quiet succession battles of old money.";

const STORY: &str = "I choose idea number 2.\n\n# Velvet Rope Economics\n\nThe line outside the club is the product.\nEverything else is decoration.\n\nBased on the pitch, here is more.\n\nOwners learned long ago that scarcity sells.";

/// Answers each call with the next scripted response and keeps the prompts it saw.
struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<Generation, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new(responses: Vec<Result<Generation, GenerationError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Generator for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Generation, GenerationError> {
        self.prompts.lock().unwrap().push(request.prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Request("script exhausted".to_string())))
    }
}

fn ok(text: &str, tokens: u64) -> Result<Generation, GenerationError> {
    Ok(Generation {
        text: text.to_string(),
        tokens,
    })
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, 2).unwrap()
}

fn registries() -> (FileAgentRegistry, FileAgentModelRegistry) {
    // Nothing exists here, so the built-in prompts and default model are used
    let dir = std::env::temp_dir().join(format!("storydesk_no_agents_{}", std::process::id()));
    (
        FileAgentRegistry::new(Some(dir.clone())),
        FileAgentModelRegistry::new(Some(dir.join("agent_model_registry.yml")), None, None),
    )
}

fn published(outcome: PublishOutcome) -> storydesk::contexts::PublishReport {
    match outcome {
        PublishOutcome::Published(report) => report,
        other => panic!("expected a published story, got {:?}", other),
    }
}

#[tokio::test]
async fn test_run_publishes_the_chosen_idea() {
    let generator = ScriptedGenerator::new(vec![ok(IDEAS, 400), ok(STORY, 600)]);
    let (agents, models) = registries();
    let pipeline = StoryPipeline::new(MemoryStorage::new(), Config::default());

    let report = published(pipeline.run(&generator, &agents, &models, date()).await.unwrap());

    assert_eq!(report.record.idea_number, 2);
    assert_eq!(report.record.headline, "Velvet Rope Economics");
    assert_eq!(report.record.description, "How exclusivity became a business model.");
    assert_eq!(report.record.filename, "20241102-velvet-rope-economics.html");
    assert_eq!(report.tokens, 1000);
    assert!((report.estimated_cost - 0.15).abs() < 1e-9);
    assert_eq!(
        report.record.body_html,
        "<p>The line outside the club is the product. Everything else is decoration.</p>\n\
         <p id=\"continue-reading\">Owners learned long ago that scarcity sells.</p>\n"
    );

    // the writer sees the editor's list
    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("\"Heirs Apparent\""));
    assert!(prompts[0].contains("Prestige Report"));
}

#[tokio::test]
async fn test_failed_editor_call_skips_the_writer() {
    let generator = ScriptedGenerator::new(vec![
        Err(GenerationError::Status {
            status: 529,
            body: "overloaded".to_string(),
        }),
        ok(STORY, 600),
    ]);
    let (agents, models) = registries();
    let pipeline = StoryPipeline::new(MemoryStorage::new(), Config::default());

    let result = pipeline.run(&generator, &agents, &models, date()).await;

    assert!(matches!(result, Err(PublishError::NoIdeas)));
    assert_eq!(generator.prompts().len(), 1);
    assert!(pipeline.storage().paths().is_empty());
}

#[tokio::test]
async fn test_failed_writer_call_still_publishes_idea_one() {
    let generator = ScriptedGenerator::new(vec![
        ok(IDEAS, 400),
        Err(GenerationError::Request("connection reset".to_string())),
    ]);
    let (agents, models) = registries();
    let pipeline = StoryPipeline::new(MemoryStorage::new(), Config::default());

    let report = published(pipeline.run(&generator, &agents, &models, date()).await.unwrap());

    assert_eq!(report.record.idea_number, 1);
    assert_eq!(report.record.headline, "The Last Salon");
    assert_eq!(report.tokens, 400);
    assert!(report.record.body_html.contains(FAILURE_MARKER));
}

#[tokio::test]
async fn test_three_runs_keep_one_featured_story() {
    let stories = [
        "I choose idea number 1.\n\nThe salon met on Thursdays.\n\nIt met for the last time in May.",
        "I choose idea number 2.\n\nThe rope is velvet.\n\nThe wait is the point.",
        "I choose idea number 3.\n\nEvery estate has a second heir.\n\nSome wait decades.",
    ];
    let (agents, models) = registries();
    let pipeline = StoryPipeline::new(MemoryStorage::new(), Config::default());

    let mut filenames = Vec::new();
    for story in stories {
        let generator = ScriptedGenerator::new(vec![ok(IDEAS, 10), ok(story, 10)]);
        let report = published(pipeline.run(&generator, &agents, &models, date()).await.unwrap());
        filenames.push(report.record.filename);
    }

    let index = pipeline.storage().read_text(Path::new("docs/index.html")).unwrap();
    let merger = DocumentMerger::new();
    assert_eq!(merger.featured_len(&index), 1);
    assert_eq!(merger.archive_len(&index), 3);

    // newest first in the archive
    let archive_start = index.find("<div class=\"story-grid\">").unwrap();
    let positions: Vec<usize> = filenames
        .iter()
        .map(|name| archive_start + index[archive_start..].find(name.as_str()).unwrap())
        .collect();
    assert!(positions[2] < positions[1]);
    assert!(positions[1] < positions[0]);

    let stories_dir = PathBuf::from("docs/stories");
    assert_eq!(pipeline.storage().list_names(&stories_dir).len(), 3);
}
