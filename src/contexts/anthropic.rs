//! [`Generator`] backed by the Anthropic Messages API.

use crate::config::ApiKey;
use crate::contexts::{Generation, GenerationError, GenerationRequest, Generator};
use serde::{Deserialize, Serialize};

pub const MESSAGES_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct AnthropicGenerator {
    client: reqwest::Client,
    api_key: ApiKey,
}

impl AnthropicGenerator {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

impl Generator for AnthropicGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<Generation, GenerationError> {
        let body = MessagesRequest {
            model: request.model,
            max_tokens: request.max_tokens,
            system: request.system_prompt,
            messages: [Message {
                role: "user",
                content: request.prompt,
            }],
        };

        let response = self
            .client
            .post(MESSAGES_ENDPOINT)
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_response(&text)
    }
}

fn parse_response(body: &str) -> Result<Generation, GenerationError> {
    let response: MessagesResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

    let text = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty() {
        return Err(GenerationError::MalformedResponse("no text content".to_string()));
    }

    Ok(Generation {
        text,
        tokens: response.usage.input_tokens + response.usage.output_tokens,
    })
}
