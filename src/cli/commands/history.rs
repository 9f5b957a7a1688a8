//! History inspection and maintenance.

use anyhow::{Context, Result, bail};
use chrono::Local;
use std::sync::Arc;

use super::backend;
use crate::cli::HistoryCommand;
use crate::config::ConfigManager;
use crate::item::{ClipboardItem, PromptKind, ResultSlot};
use crate::persistence::{DEFAULT_DEBOUNCE, HistoryStore, Persister};
use crate::store::ItemStore;
use crate::translation::language_name;
use crate::ui::Style;

const PREVIEW_CHARS: usize = 60;

pub async fn run_history(command: HistoryCommand) -> Result<()> {
    let processing = ConfigManager::new().load_or_default()?.processing;
    let history = backend::history_store();

    match command {
        HistoryCommand::List => {
            let store = backend::open_store(&history, processing.history_limit).await?;
            list(&store).await;
        }
        HistoryCommand::Show { index } => {
            let store = backend::open_store(&history, processing.history_limit).await?;
            let item = nth_item(&store, index).await?;
            let pastes = store.paste_count(&item.content).await;
            print_item(&item);
            if pastes > 0 {
                println!("  {} {pastes}", Style::label("pasted"));
            }
        }
        HistoryCommand::Clear { keep_useful } => {
            clear(history, processing.history_limit, keep_useful).await?;
        }
        HistoryCommand::Useful { index, off } => {
            let store = backend::open_store(&history, processing.history_limit).await?;
            let item = nth_item(&store, index).await?;
            store.set_useful(item.id, !off).await;
            save(&history, &store).await?;
            println!(
                "{} Item {index} {}",
                Style::success("✓"),
                if off { "unmarked" } else { "marked as useful" }
            );
        }
    }
    Ok(())
}

async fn list(store: &ItemStore) {
    let items = store.items().await;
    if items.is_empty() {
        println!("History is empty.");
        return;
    }
    for (index, item) in items.iter().enumerate() {
        println!(
            "{}  {}  {}  {}{}",
            Style::value(format!("{:>4}", index + 1)),
            Style::secondary(item.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M")),
            Style::label(format!("{:5}", item.item_type.label())),
            preview(&item.content),
            if item.is_useful {
                format!(" {}", Style::success("★"))
            } else {
                String::new()
            }
        );
    }
}

async fn nth_item(store: &ItemStore, index: usize) -> Result<ClipboardItem> {
    if index == 0 {
        bail!("Item numbers start at 1");
    }
    let len = store.len().await;
    store.nth(index - 1).await.with_context(|| {
        format!("No item {index}: history has {len} item(s)\n\nRun 'cliplens history list' to see them.")
    })
}

async fn clear(history: Arc<HistoryStore>, capacity: usize, keep_useful: bool) -> Result<()> {
    let store = backend::open_store(&history, capacity).await?;
    let persister = Persister::spawn(store, history, DEFAULT_DEBOUNCE);
    let removed = persister
        .clear_history(keep_useful)
        .await
        .context("Failed to clear history")?;
    persister.shutdown().await.context("Failed to save history")?;
    println!("{} Removed {removed} item(s)", Style::success("✓"));
    Ok(())
}

async fn save(history: &Arc<HistoryStore>, store: &ItemStore) -> Result<()> {
    let snapshot = store.snapshot().await;
    let history = Arc::clone(history);
    tokio::task::spawn_blocking(move || history.save(&snapshot))
        .await
        .context("Failed to save history")?
        .context("Failed to save history")
}

fn preview(content: &str) -> String {
    let line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    let mut preview: String = line.chars().take(PREVIEW_CHARS).collect();
    if line.chars().count() > PREVIEW_CHARS || content.trim().lines().count() > 1 {
        preview.push('…');
    }
    preview
}

fn slot_text(slot: &ResultSlot) -> String {
    if slot.processing {
        Style::hint("(processing)")
    } else {
        slot.text.clone()
    }
}

/// Prints an item with every result computed for it.
pub fn print_item(item: &ClipboardItem) {
    println!(
        "{} {}",
        Style::header(item.item_type.label()),
        Style::secondary(item.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"))
    );
    if let Some(app) = &item.source_app {
        println!("  {} {}", Style::label("source"), Style::secondary(app));
    }
    if let Some(language) = &item.detected_language {
        println!(
            "  {} {} {}",
            Style::label("language"),
            Style::code(language),
            Style::secondary(language_name(language))
        );
    }
    println!();
    println!("{}", item.content.trim_end());

    if let Some(slot) = &item.image_analysis {
        println!();
        println!("{}", Style::header("Description"));
        println!("{}", slot_text(slot));
    }

    let rewrites: Vec<_> = PromptKind::ALL
        .into_iter()
        .filter_map(|kind| item.prompt_results.get(&kind).map(|slot| (kind, slot)))
        .collect();
    if !rewrites.is_empty() {
        println!();
        println!("{}", Style::header("Rewrites"));
        for (kind, slot) in rewrites {
            let marker = if item.selected_prompt == Some(kind) {
                format!(" {}", Style::marker("selected"))
            } else {
                String::new()
            };
            println!("  {}{marker}", Style::value(kind));
            println!("    {}", slot_text(slot).trim_end().replace('\n', "\n    "));
        }
    }

    if !item.translated_results.is_empty() {
        println!();
        println!("{}", Style::header("Translations"));
        for (language, slot) in &item.translated_results {
            let marker = if item.selected_target_language.as_ref() == Some(language) {
                format!(" {}", Style::marker("selected"))
            } else {
                String::new()
            };
            println!("  {}{marker}", Style::code(language));
            println!("    {}", slot_text(slot).trim_end().replace('\n', "\n    "));
        }
    }

    if let Some(analysis) = &item.analysis {
        println!();
        println!("{}", Style::header("Analysis"));
        if let Some(summary) = &analysis.summary {
            println!("  {} {summary}", Style::label("summary "));
        }
        if !analysis.tags.is_empty() {
            println!("  {} {}", Style::label("tags    "), analysis.tags.join(", "));
        }
        if let Some(category) = &analysis.category {
            println!("  {} {category}", Style::label("category"));
        }
    }
}
