//! Text and vision generation backends behind one interface.

mod lines;
mod local;
mod ollama;
mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::models::ModelError;

pub use local::{ChatMessage, GenerationStats, LocalClient, LocalRuntime, RuntimeEvent, TokenStream};
pub use ollama::{DEFAULT_OLLAMA_ENDPOINT, DaemonLoader, OllamaApi, OllamaClient, PullEvent, PullStream};
pub use openai::OpenAiClient;

/// Sampling parameters forwarded to the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 1024,
        }
    }
}

/// A single-turn generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    /// Encoded image files (PNG, JPEG, ...).
    pub images: Vec<Vec<u8>>,
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.images.push(image);
        self
    }

    #[must_use]
    pub const fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation backend unavailable: {0}")]
    Unavailable(String),

    #[error("request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// A text (and optionally vision) generation backend.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Short identifier used in logs and cache keys.
    fn name(&self) -> String;

    /// Whether image attachments are understood.
    fn supports_images(&self) -> bool;

    async fn is_available(&self) -> bool;

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}

/// Backend families selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Remote generation daemon speaking the Ollama HTTP API.
    #[default]
    Ollama,
    /// OpenAI-compatible chat completions endpoint.
    OpenAi,
    /// On-device runtime with locally managed weights.
    Local,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Local => "local",
        })
    }
}
