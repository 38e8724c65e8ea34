use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::OnceLock;

/// Prefix of the text handed downstream when a generation call fails.
pub const FAILURE_MARKER: &str = "Analysis failed:";

/// Errors that can occur while populating an agent's prompts
#[derive(Debug)]
pub enum PopulateError {
    MissingMandatoryPlaceholder(String),
    InvalidPlaceholderPath(String),
    AgentNotFound(String),
    InvalidSpecification(String),
}

impl fmt::Display for PopulateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PopulateError::MissingMandatoryPlaceholder(ph) => {
                write!(f, "Required placeholder '{}' could not be resolved", ph)
            }
            PopulateError::InvalidPlaceholderPath(path) => {
                write!(f, "Invalid path '{}' in placeholder", path)
            }
            PopulateError::AgentNotFound(name) => {
                write!(f, "Agent '{}' not found in registry", name)
            }
            PopulateError::InvalidSpecification(details) => {
                write!(f, "Agent specification is invalid: {}", details)
            }
        }
    }
}

impl std::error::Error for PopulateError {}

/// Errors raised by a [`Generator`] or while resolving its model
#[derive(Debug)]
pub enum GenerationError {
    ModelNotFound(String),
    Request(String),
    Status { status: u16, body: String },
    MalformedResponse(String),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GenerationError::ModelNotFound(name) => {
                write!(f, "Model for agent '{}' not found", name)
            }
            GenerationError::Request(details) => write!(f, "Request failed: {}", details),
            GenerationError::Status { status, body } => {
                write!(f, "Model endpoint answered {}: {}", status, body)
            }
            GenerationError::MalformedResponse(details) => {
                write!(f, "Unexpected model response: {}", details)
            }
        }
    }
}

impl std::error::Error for GenerationError {}

/// An agent's prompt templates, before placeholders are filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSpecification {
    pub system_prompt: String,
    pub prompt: String,
}

/// Model settings for one agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub name: String,
    pub max_tokens: u32,
}

/// One call to a text generator
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub system_prompt: &'a str,
    pub prompt: &'a str,
}

/// Text returned by a generator, with the tokens it cost
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub tokens: u64,
}

impl Generation {
    /// The sentinel passed downstream in place of a real response.
    pub fn failed(reason: impl fmt::Display) -> Self {
        Self {
            text: format!("{} {}", FAILURE_MARKER, reason),
            tokens: 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.text.starts_with(FAILURE_MARKER)
    }
}

/// A hosted language model, or anything standing in for one
pub trait Generator {
    fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> impl Future<Output = Result<Generation, GenerationError>> + Send;
}

/// Trait for loading agent specifications by name
pub trait AgentRegistry {
    fn get_specification(&self, agent_name: &str) -> Result<AgentSpecification, PopulateError>;
}

/// Trait for resolving models by agent name
pub trait AgentModelRegistry {
    fn get_model(&self, agent_name: &str) -> Result<Model, GenerationError>;
}

/// Runs one named agent: fills its prompt templates from an input value and
/// asks the generator. Failures never escape; they come back as the
/// [`FAILURE_MARKER`] sentinel so the parsing fallbacks downstream handle them.
pub struct AgentRunner<'a, G, R, M> {
    agent: String,
    generator: &'a G,
    agent_registry: &'a R,
    agent_model_registry: &'a M,
}

impl<'a, G, R, M> AgentRunner<'a, G, R, M>
where
    G: Generator,
    R: AgentRegistry,
    M: AgentModelRegistry,
{
    pub fn new(agent: &str, generator: &'a G, agent_registry: &'a R, agent_model_registry: &'a M) -> Self {
        Self {
            agent: agent.to_string(),
            generator,
            agent_registry,
            agent_model_registry,
        }
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Fills both prompt templates of this agent from `input`.
    pub fn populate<T: Serialize>(&self, input: &T) -> Result<AgentSpecification, PopulateError> {
        let template = self.agent_registry.get_specification(&self.agent)?;
        let values = serde_json::to_value(input)
            .map_err(|e| PopulateError::InvalidSpecification(e.to_string()))?;

        Ok(AgentSpecification {
            system_prompt: replace_placeholders(&template.system_prompt, &values)?,
            prompt: replace_placeholders(&template.prompt, &values)?,
        })
    }

    pub async fn run<T: Serialize>(&self, input: &T) -> Generation {
        let specification = match self.populate(input) {
            Ok(spec) => spec,
            Err(e) => {
                tracing::error!(agent = %self.agent, error = %e, "could not populate agent prompts");
                return Generation::failed(e);
            }
        };
        let model = match self.agent_model_registry.get_model(&self.agent) {
            Ok(model) => model,
            Err(e) => {
                tracing::error!(agent = %self.agent, error = %e, "could not resolve model");
                return Generation::failed(e);
            }
        };

        let request = GenerationRequest {
            model: &model.name,
            max_tokens: model.max_tokens,
            system_prompt: &specification.system_prompt,
            prompt: &specification.prompt,
        };
        tracing::debug!(agent = %self.agent, model = %model.name, "calling generator");

        match self.generator.generate(request).await {
            Ok(generation) => generation,
            Err(e) => {
                tracing::error!(agent = %self.agent, error = %e, "generation failed");
                Generation::failed(e)
            }
        }
    }
}

/// Replaces `{{input.path}}` (mandatory) and `{{input.path?}}` (optional)
/// placeholders with values from `values`. Nested paths use dots.
fn replace_placeholders(template: &str, values: &serde_json::Value) -> Result<String, PopulateError> {
    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;

    for caps in placeholder_re().captures_iter(template) {
        let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let optional = caps.get(2).is_some();
        out.push_str(&template[cursor..whole.start()]);
        cursor = whole.end();

        match resolve_path(values, path.as_str())? {
            Some(value) => out.push_str(&value_to_text(value)),
            None if optional => {}
            None => {
                return Err(PopulateError::MissingMandatoryPlaceholder(path.as_str().to_string()));
            }
        }
    }

    out.push_str(&template[cursor..]);
    Ok(out)
}

fn resolve_path<'v>(
    value: &'v serde_json::Value,
    path: &str,
) -> Result<Option<&'v serde_json::Value>, PopulateError> {
    let mut parts = path.split('.');
    if parts.next() != Some("input") {
        return Err(PopulateError::InvalidPlaceholderPath(path.to_string()));
    }
    let mut current = value;
    for part in parts {
        match current.get(part) {
            Some(v) => current = v,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*?)(\?)?\s*\}\}").expect("valid regex"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Serialize)]
    struct TestInput {
        publication: String,
        idea_count: u32,
    }

    #[derive(Serialize)]
    struct NestedInput {
        site: TestInput,
    }

    struct TestRegistry;

    impl AgentRegistry for TestRegistry {
        fn get_specification(&self, agent_name: &str) -> Result<AgentSpecification, PopulateError> {
            if agent_name == "missing" {
                return Err(PopulateError::AgentNotFound(agent_name.to_string()));
            }
            Ok(AgentSpecification {
                system_prompt: format!("You are the {} of {{{{input.publication}}}}.", agent_name),
                prompt: "Give me {{input.idea_count}} ideas.{{input.extra?}}".to_string(),
            })
        }
    }

    struct TestModelRegistry;

    impl AgentModelRegistry for TestModelRegistry {
        fn get_model(&self, _agent_name: &str) -> Result<Model, GenerationError> {
            Ok(Model {
                name: "test-model".to_string(),
                max_tokens: 64,
            })
        }
    }

    /// Echoes the request, or fails when told to.
    struct EchoGenerator {
        fail: bool,
        seen: Mutex<Vec<String>>,
    }

    impl Generator for EchoGenerator {
        async fn generate(&self, request: GenerationRequest<'_>) -> Result<Generation, GenerationError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(request.model.to_string());
            }
            if self.fail {
                return Err(GenerationError::Request("connection reset".to_string()));
            }
            Ok(Generation {
                text: format!("{} | {}", request.system_prompt, request.prompt),
                tokens: 42,
            })
        }
    }

    fn input() -> TestInput {
        TestInput {
            publication: "The Review".to_string(),
            idea_count: 3,
        }
    }

    #[test]
    fn test_placeholder_replacement() {
        let values = serde_json::to_value(input()).unwrap();
        let result = replace_placeholders("{{input.publication}} wants {{ input.idea_count }}", &values);
        assert_eq!(result.unwrap(), "The Review wants 3");
    }

    #[test]
    fn test_placeholder_optional_missing() {
        let values = serde_json::to_value(input()).unwrap();
        let result = replace_placeholders("Age: {{input.age?}}", &values);
        assert_eq!(result.unwrap(), "Age: ");
    }

    #[test]
    fn test_placeholder_mandatory_missing() {
        let values = serde_json::to_value(input()).unwrap();
        match replace_placeholders("Missing: {{input.missing_field}}", &values) {
            Err(PopulateError::MissingMandatoryPlaceholder(field)) => {
                assert_eq!(field, "input.missing_field");
            }
            other => panic!("Expected MissingMandatoryPlaceholder, got {:?}", other),
        }
    }

    #[test]
    fn test_placeholder_invalid_path() {
        let values = serde_json::to_value(input()).unwrap();
        match replace_placeholders("Invalid: {{output.field}}", &values) {
            Err(PopulateError::InvalidPlaceholderPath(path)) => assert_eq!(path, "output.field"),
            other => panic!("Expected InvalidPlaceholderPath, got {:?}", other),
        }
    }

    #[test]
    fn test_placeholder_nested() {
        let values = serde_json::to_value(NestedInput { site: input() }).unwrap();
        let result = replace_placeholders("{{input.site.publication}}", &values);
        assert_eq!(result.unwrap(), "The Review");
    }

    #[tokio::test]
    async fn test_run_populates_and_generates() {
        let generator = EchoGenerator {
            fail: false,
            seen: Mutex::new(Vec::new()),
        };
        let runner = AgentRunner::new("editor", &generator, &TestRegistry, &TestModelRegistry);

        let generation = runner.run(&input()).await;

        assert_eq!(generation.text, "You are the editor of The Review. | Give me 3 ideas.");
        assert_eq!(generation.tokens, 42);
        assert_eq!(generator.seen.lock().unwrap().as_slice(), ["test-model"]);
    }

    #[tokio::test]
    async fn test_run_turns_failures_into_sentinel() {
        let generator = EchoGenerator {
            fail: true,
            seen: Mutex::new(Vec::new()),
        };
        let runner = AgentRunner::new("writer", &generator, &TestRegistry, &TestModelRegistry);

        let generation = runner.run(&input()).await;

        assert!(generation.is_failure());
        assert!(generation.text.starts_with("Analysis failed: Request failed"));
        assert_eq!(generation.tokens, 0);
    }

    #[tokio::test]
    async fn test_run_with_unknown_agent_is_a_sentinel() {
        let generator = EchoGenerator {
            fail: false,
            seen: Mutex::new(Vec::new()),
        };
        let runner = AgentRunner::new("missing", &generator, &TestRegistry, &TestModelRegistry);

        let generation = runner.run(&input()).await;

        assert!(generation.is_failure());
        assert!(generator.seen.lock().unwrap().is_empty());
    }
}
