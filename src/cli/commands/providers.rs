//! Provider listing command handler.

use anyhow::Result;

use crate::config::{ConfigManager, ProviderConfig};
use crate::ui::Style;

/// Prints configured providers to stdout.
///
/// With `specific_provider`, shows that provider's details; otherwise lists
/// every provider with its kind and endpoint.
pub fn print_providers(specific_provider: Option<&str>) -> Result<()> {
    let manager = ConfigManager::new();
    let config = manager.load_or_default()?;

    if config.providers.is_empty() {
        println!("No providers configured.");
        println!(
            "Add a [providers.<name>] table to {}",
            manager.config_path().display()
        );
        return Ok(());
    }

    let default_provider = config.cliplens.provider.as_deref();
    let marker = |name: &str| {
        if default_provider == Some(name) {
            format!(" {}", Style::marker("default"))
        } else {
            String::new()
        }
    };

    if let Some(name) = specific_provider {
        let provider = config
            .providers
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Provider '{name}' not found"))?;
        println!("{}{}", Style::header(name), marker(name));
        print_details(provider);
    } else {
        println!("{}\n", Style::header("Configured providers"));
        for (name, provider) in &config.providers {
            println!("  {}{}", Style::value(name), marker(name));
            println!(
                "    {} {}  {}",
                Style::label("kind"),
                provider.kind,
                Style::secondary(endpoint_label(provider))
            );
            if !provider.models.is_empty() {
                println!("    {} {}", Style::label("models"), provider.models.join(", "));
            }
        }
    }

    Ok(())
}

fn print_details(provider: &ProviderConfig) {
    println!("  {}     {}", Style::label("kind"), provider.kind);
    println!("  {} {}", Style::label("endpoint"), endpoint_label(provider));
    if provider.requires_api_key() {
        let state = if provider.get_api_key().is_some() {
            Style::success("(set)")
        } else {
            Style::warning("(not set)")
        };
        println!("  {}  {state}", Style::label("api_key"));
    }
    if provider.models.is_empty() {
        println!("  {}   {}", Style::label("models"), Style::secondary("(none configured)"));
    } else {
        println!("  {}", Style::label("models"));
        for model in &provider.models {
            println!("    - {}", Style::value(model));
        }
    }
}

fn endpoint_label(provider: &ProviderConfig) -> String {
    provider
        .endpoint()
        .unwrap_or_else(|| "(no endpoint)".to_string())
}
