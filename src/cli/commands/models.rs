//! Model listing and downloads.

use anyhow::{Context, Result};

use super::backend;
use crate::cli::ModelsCommand;
use crate::config::{ConfigManager, ResolveOptions, resolve_config};
use crate::models::{ModelKind, ModelManager, ModelSource};
use crate::ui::{DownloadBar, Style};

pub async fn run_models(command: ModelsCommand, options: ResolveOptions) -> Result<()> {
    let config_file = ConfigManager::new().load_or_default()?;
    let config = resolve_config(&options, &config_file)?;
    let manager = backend::model_manager(&config)?;

    match command {
        ModelsCommand::List => list(&manager, &config.provider_name),
        ModelsCommand::Status => {
            manager.refresh_readiness().await;
            status(&manager).await;
        }
        ModelsCommand::Download { name } => download(&manager, &name).await?,
    }
    Ok(())
}

fn list(manager: &ModelManager, provider: &str) {
    println!("{} {}", Style::header("Models for"), Style::value(provider));
    for spec in manager.catalog().specs() {
        let kind = match spec.kind {
            ModelKind::TextOnly => "text",
            ModelKind::Vision => "vision",
        };
        let source = match &spec.source {
            ModelSource::Hub { repo, files } => format!("{repo} ({} files)", files.len()),
            ModelSource::Daemon => "daemon".to_string(),
        };
        println!(
            "  {}  {}  {}",
            Style::value(format!("{:28}", spec.name)),
            Style::label(format!("{kind:6}")),
            Style::secondary(source)
        );
    }
}

async fn status(manager: &ModelManager) {
    for spec in manager.catalog().specs() {
        let state = if manager.is_ready(&spec.name).await {
            Style::success("ready")
        } else {
            Style::warning("not downloaded")
        };
        println!("  {}  {state}", Style::value(format!("{:28}", spec.name)));
    }
}

async fn download(manager: &ModelManager, name: &str) -> Result<()> {
    let mut handle = manager.download_model(name)?;
    let mut status = manager.subscribe();
    let bar = DownloadBar::new(name);
    let mut cancelled = false;

    let result = loop {
        tokio::select! {
            result = &mut handle => break result.context("Download task failed")?,
            changed = status.changed() => {
                if changed.is_ok() {
                    bar.update(&status.borrow_and_update());
                }
            }
            signal = tokio::signal::ctrl_c(), if !cancelled => {
                signal.context("Failed to listen for Ctrl+C")?;
                cancelled = true;
                manager.cancel_download().await;
            }
        }
    };
    drop(bar);

    match result {
        Ok(container) => {
            println!(
                "{} {} is ready",
                Style::success("✓"),
                Style::value(container.name())
            );
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            let state = if manager.is_ready(name).await {
                "complete"
            } else {
                "incomplete, run the command again to resume"
            };
            println!("Download cancelled ({state})");
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to download model '{name}'")),
    }
}
