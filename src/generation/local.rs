//! On-device generation over locally managed weights.

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;

use super::{GenerationClient, GenerationError, GenerationParams, GenerationRequest};
use crate::models::{ModelContainer, ModelManager};

/// One chat turn handed to the on-device runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
    pub images: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationStats {
    pub tokens: usize,
    pub tokens_per_second: f64,
}

/// Items produced by a runtime while generating.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    Token(String),
    Finished(GenerationStats),
}

pub type TokenStream = Pin<Box<dyn Stream<Item = Result<RuntimeEvent, GenerationError>> + Send>>;

/// The accelerator that actually runs a loaded model.
#[async_trait]
pub trait LocalRuntime: Send + Sync {
    async fn chat(
        &self,
        container: Arc<ModelContainer>,
        messages: Vec<ChatMessage>,
        params: GenerationParams,
    ) -> Result<TokenStream, GenerationError>;
}

/// Generation client backed by the model manager and an on-device runtime.
pub struct LocalClient {
    models: ModelManager,
    runtime: Arc<dyn LocalRuntime>,
    text_model: String,
    vision_model: Option<String>,
}

impl LocalClient {
    pub fn new(
        models: ModelManager,
        runtime: Arc<dyn LocalRuntime>,
        text_model: String,
        vision_model: Option<String>,
    ) -> Self {
        Self {
            models,
            runtime,
            text_model,
            vision_model,
        }
    }

    fn messages(request: GenerationRequest) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
                images: Vec::new(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt,
            images: request.images,
        });
        messages
    }
}

#[async_trait]
impl GenerationClient for LocalClient {
    fn name(&self) -> String {
        format!("local:{}", self.text_model)
    }

    fn supports_images(&self) -> bool {
        self.vision_model.is_some()
    }

    async fn is_available(&self) -> bool {
        self.models.is_ready(&self.text_model).await
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let model = if request.images.is_empty() {
            &self.text_model
        } else {
            self.vision_model.as_ref().ok_or_else(|| {
                GenerationError::UnsupportedInput("no vision model configured".to_string())
            })?
        };

        let container = self.models.load(model).await?;
        let params = request.params;
        let mut stream = self
            .runtime
            .chat(container, Self::messages(request), params)
            .await?;

        let mut output = String::new();
        while let Some(event) = stream.next().await {
            match event? {
                RuntimeEvent::Token(token) => output.push_str(&token),
                RuntimeEvent::Finished(stats) => {
                    tracing::debug!(
                        model = %model,
                        tokens = stats.tokens,
                        tokens_per_second = stats.tokens_per_second,
                        "generation finished"
                    );
                    break;
                }
            }
        }

        Ok(output)
    }
}
