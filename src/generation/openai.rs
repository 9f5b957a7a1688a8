//! OpenAI-compatible chat completions backend.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::lines::body_lines;
use super::{GenerationClient, GenerationError, GenerationRequest};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// Single-turn prompt/response session against an OpenAI-compatible API.
///
/// Image attachments are not sent; such requests fall back to text only.
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClient {
    pub fn new(endpoint: String, api_key: Option<String>, model: String) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(api_key) => request.header("Authorization", format!("Bearer {api_key}")),
            None => request,
        }
    }
}

#[async_trait]
impl GenerationClient for OpenAiClient {
    fn name(&self) -> String {
        format!("openai:{}@{}", self.model, self.endpoint)
    }

    fn supports_images(&self) -> bool {
        false
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/v1/models", self.endpoint);
        match self.authorized(self.client.get(&url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "endpoint unreachable");
                false
            }
        }
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        if !request.images.is_empty() {
            tracing::debug!(
                images = request.images.len(),
                "image attachments unsupported, sending text only"
            );
        }

        let url = format!("{}/v1/chat/completions", self.endpoint);

        let mut messages = Vec::with_capacity(2);
        if let Some(system_prompt) = &request.system_prompt {
            messages.push(Message {
                role: "system",
                content: system_prompt,
            });
        }
        messages.push(Message {
            role: "user",
            content: &request.prompt,
        });

        let chat_request = ChatCompletionRequest {
            model: &self.model,
            messages,
            stream: true,
            temperature: request.params.temperature,
            max_tokens: request.params.max_tokens,
        };

        let response = self
            .authorized(self.client.post(&url).json(&chat_request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Http { status, body });
        }

        let mut lines = std::pin::pin!(body_lines(response.bytes_stream()));
        let mut full_response = String::new();

        while let Some(line) = lines.next().await {
            let line = line?;
            if line == "data: [DONE]" {
                break;
            }
            if let Some(content) = parse_sse_line(&line) {
                full_response.push_str(&content);
            }
        }

        Ok(full_response)
    }
}

/// Extracts the delta text from one `data:` line; `None` for anything else.
fn parse_sse_line(line: &str) -> Option<String> {
    let json_str = line.strip_prefix("data: ")?;

    let response = serde_json::from_str::<StreamResponse>(json_str).ok()?;

    let content: String = response
        .choices
        .into_iter()
        .filter_map(|c| c.delta.content)
        .filter(|c| !c.is_empty())
        .collect();

    if content.is_empty() {
        None
    } else {
        Some(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sse_line_with_content() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(parse_sse_line(line), Some("Hello".to_string()));
    }

    #[test]
    fn test_parse_sse_line_ignores_role_only_delta() {
        let line = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_sse_line(line), None);
    }

    #[test]
    fn test_parse_sse_line_joins_choices() {
        let line =
            r#"data: {"choices":[{"delta":{"content":"Hello"}},{"delta":{"content":" World"}}]}"#;
        assert_eq!(parse_sse_line(line), Some("Hello World".to_string()));
    }

    #[test]
    fn test_parse_sse_line_rejects_non_data_lines() {
        assert_eq!(parse_sse_line(": keep-alive"), None);
        assert_eq!(parse_sse_line("data: [DONE]"), None);
        assert_eq!(parse_sse_line("data: not json"), None);
    }

    #[test]
    fn test_name_includes_model_and_endpoint() {
        let client = OpenAiClient::new(
            "http://localhost:8080/".to_string(),
            None,
            "gpt-4o-mini".to_string(),
        );
        assert_eq!(client.name(), "openai:gpt-4o-mini@http://localhost:8080");
        assert!(!client.supports_images());
    }
}
