//! Builds generation backends and storage from resolved configuration.

use anyhow::{Context, Result, bail};
use std::sync::Arc;

use crate::config::ResolvedConfig;
use crate::generation::{
    DaemonLoader, GenerationClient, OllamaApi, OllamaClient, OpenAiClient, ProviderKind,
};
use crate::models::{HubLoader, ModelCatalog, ModelKind, ModelManager, ModelSpec};
use crate::paths;
use crate::persistence::{HistoryStore, KeyringKeyStore};
use crate::store::{HistorySnapshot, ItemStore};

/// Model manager for the configured provider.
///
/// Daemon providers know every model named in config; on-device providers
/// use the built-in catalog.
pub fn model_manager(config: &ResolvedConfig) -> Result<ModelManager> {
    let max_loaded = config.processing.max_loaded_models;
    match config.kind {
        ProviderKind::Ollama => {
            let loader = DaemonLoader::new(OllamaApi::new(config.endpoint.clone()));
            Ok(ModelManager::with_capacity(
                Arc::new(loader),
                daemon_catalog(config),
                max_loaded,
            ))
        }
        ProviderKind::Local => {
            let loader = HubLoader::new(config.endpoint.clone(), paths::models_dir());
            Ok(ModelManager::with_capacity(
                Arc::new(loader),
                ModelCatalog::builtin(),
                max_loaded,
            ))
        }
        ProviderKind::OpenAi => bail!(
            "Provider '{}' is an OpenAI-compatible service and manages its own models",
            config.provider_name
        ),
    }
}

fn daemon_catalog(config: &ResolvedConfig) -> ModelCatalog {
    let mut catalog = ModelCatalog::from_specs(
        config
            .models
            .iter()
            .chain(std::iter::once(&config.model))
            .map(|name| ModelSpec::daemon(name, ModelKind::TextOnly)),
    );
    if let Some(vision) = &config.vision_model {
        catalog.insert(ModelSpec::daemon(vision, ModelKind::Vision));
    }
    catalog
}

/// The generation client selected by `kind`.
pub fn generation_client(config: &ResolvedConfig) -> Result<Arc<dyn GenerationClient>> {
    match config.kind {
        ProviderKind::Ollama => {
            let client = OllamaClient::new(
                OllamaApi::new(config.endpoint.clone()),
                config.model.clone(),
                config.vision_model.clone(),
            )
            .with_model_manager(model_manager(config)?);
            Ok(Arc::new(client))
        }
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiClient::new(
            config.endpoint.clone(),
            config.api_key.clone(),
            config.model.clone(),
        ))),
        ProviderKind::Local => bail!(
            "Provider '{}' needs an on-device runtime, which this binary does not include\n\n\
             Weights can still be fetched with:\n  \
             cliplens models download {}",
            config.provider_name,
            config.model
        ),
    }
}

pub fn history_store() -> Arc<HistoryStore> {
    Arc::new(HistoryStore::new(
        paths::history_file(),
        Arc::new(KeyringKeyStore::default()),
    ))
}

/// Reads the history file off the async runtime.
pub async fn load_history(history: &Arc<HistoryStore>) -> Result<HistorySnapshot> {
    let history = Arc::clone(history);
    tokio::task::spawn_blocking(move || history.load())
        .await
        .context("Failed to read history")
}

/// A store holding the saved history.
pub async fn open_store(history: &Arc<HistoryStore>, capacity: usize) -> Result<ItemStore> {
    let store = ItemStore::new(capacity);
    store.restore(load_history(history).await?).await;
    Ok(store)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ProcessingConfig;

    fn resolved(kind: ProviderKind) -> ResolvedConfig {
        ResolvedConfig {
            provider_name: "test".to_string(),
            kind,
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            vision_model: Some("llava".to_string()),
            api_key: None,
            models: vec!["llama3.2".to_string(), "mistral".to_string()],
            processing: ProcessingConfig::default(),
        }
    }

    #[test]
    fn test_daemon_catalog_covers_configured_models() {
        let catalog = daemon_catalog(&resolved(ProviderKind::Ollama));
        let names: Vec<_> = catalog.specs().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["llama3.2", "llava", "mistral"]);
        assert_eq!(catalog.get("llava").unwrap().kind, ModelKind::Vision);
    }

    #[tokio::test]
    async fn test_local_provider_needs_runtime() {
        let config = resolved(ProviderKind::Local);
        let err = generation_client(&config).err().unwrap();
        assert!(err.to_string().contains("on-device runtime"));
        assert!(!model_manager(&config).unwrap().catalog().is_empty());
    }

    #[test]
    fn test_openai_has_no_model_manager() {
        assert!(model_manager(&resolved(ProviderKind::OpenAi)).is_err());
    }
}
