mod agent_runner;
mod anthropic;
mod document_merger;
mod file_storage;
mod idea_list;
mod prose;
mod region;
mod selection;
mod slug;
mod story_page;
mod story_pipeline;

pub use agent_runner::{
    AgentModelRegistry, AgentRegistry, AgentRunner, AgentSpecification, FAILURE_MARKER, Generation,
    GenerationError, GenerationRequest, Generator, Model, PopulateError,
};
pub use anthropic::{AnthropicGenerator, MESSAGES_ENDPOINT};
pub use document_merger::{
    ARCHIVE_GRID_MARKER, DocumentMerger, FEATURED_CARD_MARKER, FEATURED_SECTION_MARKER,
};
pub use file_storage::{DryRunStorage, FileStorage, MemoryStorage};
pub use idea_list::{IdeaList, NoIdeasFound};
pub use prose::{CONTINUE_READING_ANCHOR, Paragraphs, is_selection_announcement};
pub use region::NamedRegion;
pub use selection::{
    ChoicePattern, HeadlineStrategy, SelectionExtractor, UnknownChoice, synthetic_headline,
};
pub use slug::{SlugFilenameGenerator, slugify};
pub use story_page::{
    BLANK_INDEX, DEFAULT_STORY_TEMPLATE, StoryTemplate, archive_card, escape_html, featured_card,
};
pub use story_pipeline::{PublishError, PublishOutcome, PublishReport, StoryPipeline, AgentInput};
