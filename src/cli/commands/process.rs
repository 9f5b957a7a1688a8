use anyhow::{Context, Result, bail};
use std::sync::Arc;

use super::backend;
use super::history::print_item;
use crate::config::{ConfigManager, ResolveOptions, resolve_config};
use crate::input::InputReader;
use crate::orchestrator::Orchestrator;
use crate::persistence::Persister;
use crate::provider::{ProviderAdapter, RequestType};
use crate::store::ItemStore;
use crate::translation::validate_language;
use crate::ui::Spinner;

pub struct ProcessOptions {
    pub file: Option<String>,
    pub to: Option<String>,
    pub analyze: bool,
    pub no_save: bool,
    pub provider: Option<String>,
    pub model: Option<String>,
}

pub async fn run_process(options: ProcessOptions) -> Result<()> {
    let config_file = ConfigManager::new().load_or_default()?;
    let config = resolve_config(
        &ResolveOptions {
            provider: options.provider.clone(),
            model: options.model.clone(),
        },
        &config_file,
    )?;
    if let Some(lang) = &options.to {
        validate_language(lang, &config.processing.languages)?;
    }

    let captured = InputReader::read(options.file.as_deref())?;
    if captured.content.trim().is_empty() && captured.image_data.is_none() {
        bail!("Error: Input is empty");
    }

    let client = backend::generation_client(&config)?;
    if !client.is_available().await {
        bail!(
            "Provider '{}' is not reachable at {}\n\n\
             Check that the backend is running, or pick another with --provider.",
            config.provider_name,
            config.endpoint
        );
    }

    let history = backend::history_store();
    let (store, persister) = if options.no_save {
        (ItemStore::new(config.processing.history_limit), None)
    } else {
        let store = backend::open_store(&history, config.processing.history_limit).await?;
        let persister = Persister::spawn(
            store.clone(),
            Arc::clone(&history),
            config.processing.save_debounce(),
        );
        (store, Some(persister))
    };

    let adapter = Arc::new(ProviderAdapter::new(client));
    let orchestrator = Orchestrator::new(store.clone(), adapter, config.processing.settings());

    let spinner = Spinner::new("Processing...");
    let id = orchestrator.ingest(captured).await;
    orchestrator.drain().await;

    if let Some(lang) = &options.to {
        spinner.set_message("Translating...");
        orchestrator.cascade().select_target_language(id, lang).await;
    }
    if options.analyze {
        spinner.set_message("Analyzing...");
        orchestrator.analyze_content(id, RequestType::Combined).await;
    }
    orchestrator.drain().await;
    spinner.stop();

    let item = store
        .get(id)
        .await
        .context("Processed item is no longer in the history")?;
    print_item(&item);

    if let Some(persister) = persister {
        persister.shutdown().await.context("Failed to save history")?;
    }
    Ok(())
}
