#![allow(clippy::unwrap_used)]
//! Config priority contract tests.
//!
//! CLI options take priority over config file settings, which take priority
//! over built-in defaults.

use std::collections::BTreeMap;

use cliplens::config::{
    ConfigFile, GeneralConfig, ProcessingConfig, ProviderConfig, ResolveOptions, resolve_config,
};
use cliplens::generation::ProviderKind;

fn make_config_with_defaults() -> ConfigFile {
    let mut providers = BTreeMap::new();
    providers.insert(
        "local_daemon".to_string(),
        ProviderConfig {
            kind: ProviderKind::Ollama,
            endpoint: Some("http://daemon.local:11434".to_string()),
            models: vec!["config_model".to_string()],
            ..ProviderConfig::default()
        },
    );
    providers.insert(
        "remote".to_string(),
        ProviderConfig {
            kind: ProviderKind::OpenAi,
            endpoint: Some("https://api.example.com".to_string()),
            api_key: Some("inline_key".to_string()),
            models: vec!["gpt-small".to_string()],
            ..ProviderConfig::default()
        },
    );

    ConfigFile {
        cliplens: GeneralConfig {
            provider: Some("local_daemon".to_string()),
            model: Some("config_model".to_string()),
            vision_model: Some("llava".to_string()),
        },
        processing: ProcessingConfig::default(),
        providers,
    }
}

#[test]
fn test_config_defaults_used_when_cli_not_specified() {
    let config = make_config_with_defaults();
    let resolved = resolve_config(&ResolveOptions::default(), &config).unwrap();

    assert_eq!(resolved.provider_name, "local_daemon");
    assert_eq!(resolved.kind, ProviderKind::Ollama);
    assert_eq!(resolved.endpoint, "http://daemon.local:11434");
    assert_eq!(resolved.model, "config_model");
    assert_eq!(resolved.vision_model.as_deref(), Some("llava"));
    assert_eq!(resolved.models, vec!["config_model".to_string()]);
}

#[test]
fn test_cli_model_overrides_config_model() {
    let config = make_config_with_defaults();
    let options = ResolveOptions {
        model: Some("cli_model".to_string()),
        ..ResolveOptions::default()
    };

    let resolved = resolve_config(&options, &config).unwrap();
    assert_eq!(resolved.model, "cli_model");
}

#[test]
fn test_cli_provider_overrides_config_provider() {
    let config = make_config_with_defaults();
    let options = ResolveOptions {
        provider: Some("remote".to_string()),
        model: Some("gpt-small".to_string()),
    };

    let resolved = resolve_config(&options, &config).unwrap();
    assert_eq!(resolved.provider_name, "remote");
    assert_eq!(resolved.kind, ProviderKind::OpenAi);
    assert_eq!(resolved.endpoint, "https://api.example.com");
    assert_eq!(resolved.api_key.as_deref(), Some("inline_key"));
}

#[test]
fn test_unknown_cli_provider_lists_available() {
    let config = make_config_with_defaults();
    let options = ResolveOptions {
        provider: Some("missing".to_string()),
        ..ResolveOptions::default()
    };

    let err = resolve_config(&options, &config).unwrap_err().to_string();
    assert!(err.contains("Provider 'missing' not found"));
    assert!(err.contains("local_daemon"));
    assert!(err.contains("remote"));
}

#[test]
fn test_processing_defaults_apply_without_section() {
    let config: ConfigFile = toml::from_str(
        r#"
[cliplens]
provider = "ollama"
model = "llama3.2"

[providers.ollama]
kind = "ollama"
"#,
    )
    .unwrap();

    let resolved = resolve_config(&ResolveOptions::default(), &config).unwrap();
    assert_eq!(resolved.processing, ProcessingConfig::default());
    assert_eq!(resolved.endpoint, "http://localhost:11434");
    assert_eq!(resolved.processing.languages, vec!["en", "es", "fr", "de", "ja"]);
}

#[test]
fn test_openai_provider_without_endpoint_is_an_error() {
    let config: ConfigFile = toml::from_str(
        r#"
[cliplens]
provider = "remote"
model = "gpt-small"

[providers.remote]
kind = "openai"
"#,
    )
    .unwrap();

    let err = resolve_config(&ResolveOptions::default(), &config)
        .unwrap_err()
        .to_string();
    assert!(err.contains("has no endpoint"));
}
