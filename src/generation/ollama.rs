//! Remote generation daemon speaking the Ollama HTTP API.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::lines::body_lines;
use super::{GenerationClient, GenerationError, GenerationParams, GenerationRequest};
use crate::models::{
    DiskState, ModelContainer, ModelError, ModelLoader, ModelLocation, ModelManager, ModelSpec,
    ProgressEvent, ProgressSink,
};

pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Serialize)]
struct Options {
    temperature: f32,
    num_predict: u32,
}

impl From<GenerationParams> for Options {
    fn from(params: GenerationParams) -> Self {
        Self {
            temperature: params.temperature,
            num_predict: params.max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: Options,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessageBody<'a>>,
    stream: bool,
    options: Options,
}

#[derive(Debug, Serialize)]
struct ChatMessageBody<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Debug, Serialize)]
struct PullBody<'a> {
    model: &'a str,
    stream: bool,
}

/// One newline-delimited progress event from `/api/pull`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PullEvent {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub completed: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

pub type PullStream = Pin<Box<dyn Stream<Item = Result<PullEvent, GenerationError>> + Send>>;

/// Thin wrapper over the daemon's HTTP endpoints.
#[derive(Clone)]
pub struct OllamaApi {
    client: Client,
    endpoint: String,
}

impl OllamaApi {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(GenerationError::Http { status, body })
        }
    }

    pub async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?;
        let tags: TagsResponse = Self::check(response).await?.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: Option<&str>,
        params: GenerationParams,
    ) -> Result<String, GenerationError> {
        let body = GenerateBody {
            model,
            prompt,
            system,
            stream: false,
            options: params.into(),
        };
        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(&body)
            .send()
            .await?;
        let parsed: GenerateResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        Ok(parsed.response)
    }

    pub async fn chat(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessageBody {
                role: "system",
                content: system,
                images: Vec::new(),
            });
        }
        messages.push(ChatMessageBody {
            role: "user",
            content: &request.prompt,
            images: request.images.iter().map(|img| STANDARD.encode(img)).collect(),
        });

        let body = ChatBody {
            model,
            messages,
            stream: false,
            options: request.params.into(),
        };
        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&body)
            .send()
            .await?;
        let parsed: ChatResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        Ok(parsed.message.content)
    }

    /// Starts pulling `model`, yielding progress events as the daemon reports them.
    pub async fn pull(&self, model: &str) -> Result<PullStream, GenerationError> {
        let body = PullBody {
            model,
            stream: true,
        };
        let response = self
            .client
            .post(self.url("/api/pull"))
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let events = body_lines(response.bytes_stream()).map(|line| {
            let line = line?;
            serde_json::from_str::<PullEvent>(&line)
                .map_err(|e| GenerationError::InvalidResponse(format!("{e}: {line}")))
        });
        Ok(Box::pin(events))
    }
}

/// Generation client for the remote daemon.
///
/// When a [`ModelManager`] is attached, each model is pulled (once, coalesced)
/// before its first use.
pub struct OllamaClient {
    api: OllamaApi,
    text_model: String,
    vision_model: Option<String>,
    models: Option<ModelManager>,
}

impl OllamaClient {
    pub const fn new(api: OllamaApi, text_model: String, vision_model: Option<String>) -> Self {
        Self {
            api,
            text_model,
            vision_model,
            models: None,
        }
    }

    #[must_use]
    pub fn with_model_manager(mut self, models: ModelManager) -> Self {
        self.models = Some(models);
        self
    }

    async fn ensure_model(&self, model: &str) -> Result<(), GenerationError> {
        if let Some(models) = &self.models {
            models.load(model).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl GenerationClient for OllamaClient {
    fn name(&self) -> String {
        format!("ollama:{}@{}", self.text_model, self.api.endpoint())
    }

    fn supports_images(&self) -> bool {
        self.vision_model.is_some()
    }

    async fn is_available(&self) -> bool {
        match self.api.list_models().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(endpoint = %self.api.endpoint(), error = %e, "daemon unreachable");
                false
            }
        }
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        if request.images.is_empty() {
            self.ensure_model(&self.text_model).await?;
            return self
                .api
                .generate(
                    &self.text_model,
                    &request.prompt,
                    request.system_prompt.as_deref(),
                    request.params,
                )
                .await;
        }

        let Some(vision_model) = &self.vision_model else {
            return Err(GenerationError::UnsupportedInput(
                "no vision model configured".to_string(),
            ));
        };
        self.ensure_model(vision_model).await?;
        self.api.chat(vision_model, &request).await
    }
}

/// Model loader that asks the daemon to pull weights.
///
/// Layer digests serve as file identities for progress tracking.
pub struct DaemonLoader {
    api: OllamaApi,
}

impl DaemonLoader {
    pub const fn new(api: OllamaApi) -> Self {
        Self { api }
    }
}

fn tag_matches(installed: &str, wanted: &str) -> bool {
    installed == wanted
        || (!wanted.contains(':') && installed.strip_suffix(":latest") == Some(wanted))
}

#[async_trait]
impl ModelLoader for DaemonLoader {
    async fn probe(&self, spec: &ModelSpec) -> DiskState {
        match self.api.list_models().await {
            Ok(installed) if installed.iter().any(|m| tag_matches(m, &spec.name)) => {
                DiskState::Complete
            }
            Ok(_) => DiskState::Missing,
            Err(e) => {
                tracing::debug!(model = %spec.name, error = %e, "readiness probe failed");
                DiskState::Missing
            }
        }
    }

    async fn load(
        &self,
        spec: &ModelSpec,
        progress: ProgressSink,
        cancel: CancellationToken,
    ) -> Result<ModelContainer, ModelError> {
        if cancel.is_cancelled() {
            return Err(ModelError::Cancelled);
        }

        let mut events = self
            .api
            .pull(&spec.name)
            .await
            .map_err(|e| ModelError::Download(e.to_string()))?;

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ModelError::Cancelled),
                next = events.next() => next,
            };
            let Some(event) = next else { break };
            let event = event.map_err(|e| ModelError::Download(e.to_string()))?;

            if let Some(error) = event.error {
                return Err(ModelError::Download(error));
            }
            if let (Some(digest), Some(total)) = (event.digest, event.total) {
                progress(ProgressEvent {
                    file_id: digest,
                    completed: event.completed.unwrap_or(0),
                    total,
                });
            } else {
                tracing::debug!(model = %spec.name, status = %event.status, "pull status");
            }
        }

        Ok(ModelContainer {
            spec: spec.clone(),
            location: ModelLocation::Daemon {
                endpoint: self.api.endpoint().to_string(),
            },
        })
    }
}
