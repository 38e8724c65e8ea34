mod agent_model_registry;
mod agent_registry;

pub use agent_model_registry::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, FileAgentModelRegistry};
pub use agent_registry::{EDITOR_AGENT, FileAgentRegistry, WRITER_AGENT};
