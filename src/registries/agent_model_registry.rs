use crate::contexts::{AgentModelRegistry, GenerationError, Model};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// File-based implementation of AgentModelRegistry
/// Loads agent-to-model mappings from a YAML file
#[derive(Clone, Debug)]
pub struct FileAgentModelRegistry {
    registry_path: PathBuf,
    default_model: String,
    default_max_tokens: u32,
}

impl FileAgentModelRegistry {
    /// Creates a new FileAgentModelRegistry
    ///
    /// # Arguments
    /// * `registry_path` - Optional path to registry file (defaults to "agents/agent_model_registry.yml")
    /// * `default_model` - Model used for agents the registry does not list
    /// * `default_max_tokens` - Token limit used when an entry does not set one
    pub fn new(
        registry_path: Option<PathBuf>,
        default_model: Option<String>,
        default_max_tokens: Option<u32>,
    ) -> Self {
        Self {
            registry_path: registry_path
                .unwrap_or_else(|| PathBuf::from("agents/agent_model_registry.yml")),
            default_model: default_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            default_max_tokens: default_max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }

    fn load_registry(&self) -> Result<HashMap<String, Model>, GenerationError> {
        if !self.registry_path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&self.registry_path).map_err(|e| {
            GenerationError::Request(format!("Failed to read agent model registry: {}", e))
        })?;

        parse_registry(&content, &self.default_model, self.default_max_tokens)
    }
}

impl AgentModelRegistry for FileAgentModelRegistry {
    fn get_model(&self, agent_name: &str) -> Result<Model, GenerationError> {
        let registry = self.load_registry()?;

        Ok(registry.get(agent_name).cloned().unwrap_or_else(|| Model {
            name: self.default_model.clone(),
            max_tokens: self.default_max_tokens,
        }))
    }
}

/// Parses the YAML registry file into a HashMap
/// Entries are either a model name or an object with `model` and `max_tokens`
fn parse_registry(
    yaml_content: &str,
    default_model: &str,
    default_max_tokens: u32,
) -> Result<HashMap<String, Model>, GenerationError> {
    use yaml_rust::{Yaml, YamlLoader};

    let docs = YamlLoader::load_from_str(yaml_content)
        .map_err(|e| GenerationError::MalformedResponse(format!("Invalid registry YAML: {}", e)))?;

    let mut registry = HashMap::new();
    let Some(hash) = docs.first().and_then(|doc| doc.as_hash()) else {
        return Ok(registry);
    };

    for (key, value) in hash {
        let Some(agent) = key.as_str() else {
            continue;
        };
        let model = if let Some(name) = value.as_str() {
            Model {
                name: name.to_string(),
                max_tokens: default_max_tokens,
            }
        } else if let Some(entry) = value.as_hash() {
            let name = entry
                .get(&Yaml::String("model".to_string()))
                .and_then(|v| v.as_str())
                .unwrap_or(default_model)
                .to_string();
            let max_tokens = entry
                .get(&Yaml::String("max_tokens".to_string()))
                .and_then(|v| v.as_i64())
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(default_max_tokens);
            Model { name, max_tokens }
        } else {
            Model {
                name: default_model.to_string(),
                max_tokens: default_max_tokens,
            }
        };
        registry.insert(agent.to_string(), model);
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_registry_string_form() {
        let yaml = r#"
editor: claude-3-haiku-20240307
writer: claude-3-opus-20240229
"#;
        let registry = parse_registry(yaml, "default", 512).unwrap();
        assert_eq!(
            registry.get("editor"),
            Some(&Model {
                name: "claude-3-haiku-20240307".to_string(),
                max_tokens: 512
            })
        );
        assert_eq!(registry.get("writer").map(|m| m.name.as_str()), Some("claude-3-opus-20240229"));
    }

    #[test]
    fn test_parse_registry_object_form() {
        let yaml = r#"
writer:
  model: claude-3-opus-20240229
  max_tokens: 2048
editor:
  max_tokens: 300
"#;
        let registry = parse_registry(yaml, "default", 1024).unwrap();
        let writer = registry.get("writer").unwrap();
        assert_eq!(writer.name, "claude-3-opus-20240229");
        assert_eq!(writer.max_tokens, 2048);

        let editor = registry.get("editor").unwrap();
        assert_eq!(editor.name, "default");
        assert_eq!(editor.max_tokens, 300);
    }

    #[test]
    fn test_parse_empty_registry() {
        assert!(parse_registry("", "default", 1024).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let registry = FileAgentModelRegistry::new(
            Some(PathBuf::from("/nonexistent/registry.yml")),
            Some("house-model".to_string()),
            None,
        );
        let model = registry.get_model("writer").unwrap();
        assert_eq!(model.name, "house-model");
        assert_eq!(model.max_tokens, DEFAULT_MAX_TOKENS);
    }
}
