use crate::contexts::{AgentRegistry, AgentSpecification, PopulateError};
use std::fs;
use std::path::PathBuf;

pub const EDITOR_AGENT: &str = "editor";
pub const WRITER_AGENT: &str = "writer";

const EDITOR_SYSTEM_PROMPT: &str = "You are a senior editor at {{input.publication}}. Generate {{input.idea_count}} captivating feature story ideas that blend celebrity profiles, cultural analysis, investigative reporting, and human interest. Number each idea and give it a compelling title in double quotes, followed by a colon and a one-sentence description.";

const EDITOR_PROMPT: &str = "Please generate {{input.idea_count}} captivating feature ideas for the next issue of {{input.publication}}.";

const WRITER_SYSTEM_PROMPT: &str = "You are an accomplished writer for {{input.publication}}. Write a captivating story of about 300 words based on the assigned topic, with sophisticated prose, cultural insight, and narrative flair. Include a compelling headline.";

const WRITER_PROMPT: &str = "Here are {{input.idea_count}} feature ideas for {{input.publication}}:\n\n{{input.ideas}}\n\n{{input.selection_instruction}} Then write a compelling feature based on your selected idea.";

/// File-based implementation of AgentRegistry
///
/// Loads `<agents_dir>/<name>.yml` with `system_prompt` and `prompt` keys.
/// The editor and writer agents have built-in prompts used when their file
/// is missing or leaves a key out.
#[derive(Clone, Debug)]
pub struct FileAgentRegistry {
    agents_dir: PathBuf,
}

impl FileAgentRegistry {
    /// Creates a new FileAgentRegistry
    ///
    /// # Arguments
    /// * `agents_dir` - Optional path to agents directory (defaults to "agents")
    pub fn new(agents_dir: Option<PathBuf>) -> Self {
        Self {
            agents_dir: agents_dir.unwrap_or_else(|| PathBuf::from("agents")),
        }
    }
}

impl AgentRegistry for FileAgentRegistry {
    fn get_specification(&self, agent_name: &str) -> Result<AgentSpecification, PopulateError> {
        let agent_path = self.agents_dir.join(format!("{}.yml", agent_name));
        let builtin = builtin_specification(agent_name);

        if !agent_path.exists() {
            return builtin.ok_or_else(|| PopulateError::AgentNotFound(agent_name.to_string()));
        }

        let content = fs::read_to_string(&agent_path).map_err(|e| {
            PopulateError::InvalidSpecification(format!(
                "Failed to read agent specification {}: {}",
                agent_path.display(),
                e
            ))
        })?;
        parse_specification(&content, builtin)
    }
}

fn builtin_specification(agent_name: &str) -> Option<AgentSpecification> {
    let (system_prompt, prompt) = match agent_name {
        EDITOR_AGENT => (EDITOR_SYSTEM_PROMPT, EDITOR_PROMPT),
        WRITER_AGENT => (WRITER_SYSTEM_PROMPT, WRITER_PROMPT),
        _ => return None,
    };
    Some(AgentSpecification {
        system_prompt: system_prompt.to_string(),
        prompt: prompt.to_string(),
    })
}

/// Reads `system_prompt` and `prompt` from an agent YAML file, filling gaps from `builtin`.
fn parse_specification(
    yaml_content: &str,
    builtin: Option<AgentSpecification>,
) -> Result<AgentSpecification, PopulateError> {
    use yaml_rust::YamlLoader;

    let docs = YamlLoader::load_from_str(yaml_content)
        .map_err(|e| PopulateError::InvalidSpecification(format!("Invalid YAML: {}", e)))?;
    let Some(doc) = docs.first() else {
        return builtin.ok_or_else(|| PopulateError::InvalidSpecification("Empty YAML document".to_string()));
    };

    let field = |key: &str, fallback: Option<&String>| -> Result<String, PopulateError> {
        doc[key]
            .as_str()
            .map(str::to_string)
            .or_else(|| fallback.cloned())
            .ok_or_else(|| {
                PopulateError::InvalidSpecification(format!("No {} field found in agent specification", key))
            })
    };

    Ok(AgentSpecification {
        system_prompt: field("system_prompt", builtin.as_ref().map(|b| &b.system_prompt))?,
        prompt: field("prompt", builtin.as_ref().map(|b| &b.prompt))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_specification() {
        let yaml = r#"
name: columnist
system_prompt: |
  You write a weekly column.
  Keep it short.
prompt: "Write about {{input.topic}}."
"#;
        let spec = parse_specification(yaml, None).unwrap();
        assert!(spec.system_prompt.contains("You write a weekly column."));
        assert_eq!(spec.prompt, "Write about {{input.topic}}.");
    }

    #[test]
    fn test_partial_file_falls_back_to_builtin() {
        let yaml = "system_prompt: Be brief.\n";
        let spec = parse_specification(yaml, builtin_specification(EDITOR_AGENT)).unwrap();
        assert_eq!(spec.system_prompt, "Be brief.");
        assert_eq!(spec.prompt, EDITOR_PROMPT);
    }

    #[test]
    fn test_missing_prompt_without_builtin() {
        let yaml = "system_prompt: Be brief.\n";
        assert!(parse_specification(yaml, None).is_err());
    }

    #[test]
    fn test_builtin_agents_without_files() {
        let registry = FileAgentRegistry::new(Some(PathBuf::from("/nonexistent/agents")));
        let writer = registry.get_specification(WRITER_AGENT).unwrap();
        assert!(writer.prompt.contains("{{input.ideas}}"));

        match registry.get_specification("critic") {
            Err(PopulateError::AgentNotFound(name)) => assert_eq!(name, "critic"),
            other => panic!("Expected AgentNotFound, got {:?}", other),
        }
    }
}
