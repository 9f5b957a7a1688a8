use serde::Deserialize;
use std::sync::{Arc, PoisonError, RwLock};

use super::cleanup::{clean_response, extract_json, parse_category, parse_tags};
use super::prompt::{
    DETECTION_SYSTEM_PROMPT, IMAGE_PROMPT, IMAGE_SYSTEM_PROMPT, REWRITE_SYSTEM_PROMPT,
    build_classify_prompt, build_combined_prompt, build_custom_prompt, build_rewrite_prompt,
    build_summarize_prompt, build_tags_prompt, build_translation_system_prompt,
};
use super::{MAX_TAGS, ProcessedResult, RequestType};
use crate::cache::ResultCache;
use crate::generation::{GenerationClient, GenerationError, GenerationParams, GenerationRequest};
use crate::item::{ContentAnalysis, PromptKind};

#[derive(Debug, Deserialize)]
struct CombinedResponse {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    category: Option<String>,
}

/// Wraps the active [`GenerationClient`] with shared prompts and cleanup.
pub struct ProviderAdapter {
    client: RwLock<Arc<dyn GenerationClient>>,
    cache: ResultCache,
    params: GenerationParams,
}

impl ProviderAdapter {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            client: RwLock::new(client),
            cache: ResultCache::default(),
            params: GenerationParams::default(),
        }
    }

    #[must_use]
    pub const fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn client(&self) -> Arc<dyn GenerationClient> {
        Arc::clone(&self.client.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the backend. Cached results came from the old model and are dropped.
    pub fn switch_client(&self, client: Arc<dyn GenerationClient>) {
        let name = client.name();
        *self.client.write().unwrap_or_else(PoisonError::into_inner) = client;
        self.cache.clear();
        tracing::info!(client = %name, "generation backend switched");
    }

    pub const fn cache(&self) -> &ResultCache {
        &self.cache
    }

    async fn call(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let client = self.client();
        let response = client.generate(request.with_params(self.params)).await?;
        if response.trim().is_empty() {
            return Err(GenerationError::InvalidResponse(format!(
                "{} returned an empty response",
                client.name()
            )));
        }
        Ok(response)
    }

    /// Runs a structured request, consulting the result cache first.
    pub async fn process(
        &self,
        text: &str,
        request: &RequestType,
    ) -> Result<ProcessedResult, GenerationError> {
        if let Some(cached) = self.cache.get(text, request) {
            tracing::debug!(request = %request.cache_tag(), "result cache hit");
            return Ok(cached);
        }

        let prompt = match request {
            RequestType::Summarize => build_summarize_prompt(text),
            RequestType::ExtractTags => build_tags_prompt(text, MAX_TAGS),
            RequestType::Classify => build_classify_prompt(text),
            RequestType::Combined => build_combined_prompt(text, MAX_TAGS),
            RequestType::Custom(instruction) => build_custom_prompt(instruction, text),
        };
        let response = self.call(GenerationRequest::new(prompt)).await?;
        let result = parse_processed(request, &response);

        self.cache.put(text, request, result.clone());
        Ok(result)
    }

    /// Rewrites `text` with the instruction for `kind` and cleans the answer.
    pub async fn process_with_prompt_type(
        &self,
        text: &str,
        kind: PromptKind,
    ) -> Result<String, GenerationError> {
        let request = GenerationRequest::new(build_rewrite_prompt(kind, text))
            .with_system(REWRITE_SYSTEM_PROMPT);
        let cleaned = clean_response(&self.call(request).await?);
        if cleaned.is_empty() {
            return Err(GenerationError::InvalidResponse(format!(
                "{kind} rewrite was empty after cleanup"
            )));
        }
        Ok(cleaned)
    }

    /// Free-form generation; `context` is prepended to the prompt when given.
    pub async fn generate(
        &self,
        prompt: &str,
        context: Option<&str>,
    ) -> Result<String, GenerationError> {
        let prompt = match context {
            Some(context) if !context.trim().is_empty() => format!("{context}\n\n{prompt}"),
            _ => prompt.to_string(),
        };
        self.call(GenerationRequest::new(prompt)).await
    }

    /// Raw detection answer; callers parse the language code out of it.
    pub async fn detect_language(&self, text: &str) -> Result<String, GenerationError> {
        self.call(GenerationRequest::new(text).with_system(DETECTION_SYSTEM_PROMPT))
            .await
    }

    pub async fn translate(
        &self,
        text: &str,
        target_language: &str,
    ) -> Result<String, GenerationError> {
        let request = GenerationRequest::new(text)
            .with_system(build_translation_system_prompt(target_language));
        let cleaned = clean_response(&self.call(request).await?);
        if cleaned.is_empty() {
            return Err(GenerationError::InvalidResponse(
                "translation was empty after cleanup".to_string(),
            ));
        }
        Ok(cleaned)
    }

    /// Describes an encoded image. Fails fast when the backend has no vision support.
    pub async fn describe_image(&self, image: Vec<u8>) -> Result<String, GenerationError> {
        if !self.client().supports_images() {
            return Err(GenerationError::UnsupportedInput(
                "backend does not accept images".to_string(),
            ));
        }
        let request = GenerationRequest::new(IMAGE_PROMPT)
            .with_system(IMAGE_SYSTEM_PROMPT)
            .with_image(image);
        Ok(clean_response(&self.call(request).await?))
    }
}

fn parse_processed(request: &RequestType, response: &str) -> ProcessedResult {
    match request {
        RequestType::Summarize => ProcessedResult::Summary(clean_response(response)),
        RequestType::ExtractTags => {
            ProcessedResult::Tags(parse_tags(&clean_response(response), MAX_TAGS))
        }
        RequestType::Classify => ProcessedResult::Category(
            parse_category(response).unwrap_or_else(|| response.trim().to_string()),
        ),
        RequestType::Combined => ProcessedResult::Combined(parse_combined(response)),
        RequestType::Custom(_) => ProcessedResult::Custom(clean_response(response)),
    }
}

fn parse_combined(response: &str) -> ContentAnalysis {
    let decoded = extract_json(response)
        .and_then(|json| serde_json::from_str::<CombinedResponse>(json).ok());

    match decoded {
        Some(combined) => ContentAnalysis {
            summary: combined.summary.filter(|s| !s.trim().is_empty()),
            tags: parse_tags(&combined.tags.join(","), MAX_TAGS),
            category: combined.category.map(|c| c.trim().to_lowercase()),
        },
        None => {
            tracing::debug!("combined response was not valid JSON, keeping raw text");
            ContentAnalysis {
                summary: Some(clean_response(response)),
                ..ContentAnalysis::default()
            }
        }
    }
}
