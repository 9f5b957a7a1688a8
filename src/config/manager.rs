use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::generation::{DEFAULT_OLLAMA_ENDPOINT, ProviderKind};
use crate::models::{DEFAULT_HUB_URL, DEFAULT_MAX_LOADED_MODELS};
use crate::orchestrator::{DEFAULT_MIN_IMAGE_DIMENSION, ProcessingSettings};
use crate::paths;
use crate::store::DEFAULT_HISTORY_LIMIT;
use crate::translation::default_languages;
use crate::ui::Style;

/// Default settings in the `[cliplens]` section of config.toml.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default provider name.
    pub provider: Option<String>,
    /// Default text model.
    pub model: Option<String>,
    /// Model used for image descriptions, if any.
    pub vision_model: Option<String>,
}

/// The `[processing]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub auto_analyze_images: bool,
    pub min_image_dimension: u32,
    pub history_limit: usize,
    pub save_debounce_ms: u64,
    pub max_loaded_models: usize,
    /// Translation targets (ISO 639-1 codes).
    pub languages: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            auto_analyze_images: true,
            min_image_dimension: DEFAULT_MIN_IMAGE_DIMENSION,
            history_limit: DEFAULT_HISTORY_LIMIT,
            save_debounce_ms: 750,
            max_loaded_models: DEFAULT_MAX_LOADED_MODELS,
            languages: default_languages(),
        }
    }
}

impl ProcessingConfig {
    pub const fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn settings(&self) -> ProcessingSettings {
        ProcessingSettings {
            auto_analyze_images: self.auto_analyze_images,
            min_image_dimension: self.min_image_dimension,
            languages: self.languages.clone(),
        }
    }
}

/// Configuration for one generation backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    /// API endpoint; each kind has a default except `openai`.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Inline API key; `api_key_env` is preferred.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Models known to work with this provider.
    #[serde(default)]
    pub models: Vec<String>,
}

impl ProviderConfig {
    /// The API key from `api_key_env` if set and non-empty, else the inline key.
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(env_var) = &self.api_key_env
            && let Ok(key) = std::env::var(env_var)
            && !key.is_empty()
        {
            return Some(key);
        }
        self.api_key.clone()
    }

    /// Providers that name a key in any form must end up with one.
    pub const fn requires_api_key(&self) -> bool {
        self.api_key.is_some() || self.api_key_env.is_some()
    }

    /// Configured endpoint, or the kind's default.
    pub fn endpoint(&self) -> Option<String> {
        self.endpoint.clone().or_else(|| match self.kind {
            ProviderKind::Ollama => Some(DEFAULT_OLLAMA_ENDPOINT.to_string()),
            ProviderKind::Local => Some(DEFAULT_HUB_URL.to_string()),
            ProviderKind::OpenAi => None,
        })
    }
}

/// Everything in config.toml.
///
/// Corresponds to `~/.config/cliplens/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub cliplens: GeneralConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
}

/// Settings for one run: CLI overrides applied on top of config.toml.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub provider_name: String,
    pub kind: ProviderKind,
    pub endpoint: String,
    pub model: String,
    pub vision_model: Option<String>,
    pub api_key: Option<String>,
    /// The provider's configured model list.
    pub models: Vec<String>,
    pub processing: ProcessingConfig,
}

/// CLI overrides that take precedence over config file values.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// Picks the provider and model for this run.
///
/// # Errors
///
/// Returns an error if provider or model is missing, the provider is not
/// configured, no languages are configured, or a required API key is absent.
pub fn resolve_config(
    options: &ResolveOptions,
    config_file: &ConfigFile,
) -> Result<ResolvedConfig> {
    let provider_name = options
        .provider
        .as_ref()
        .or(config_file.cliplens.provider.as_ref())
        .cloned()
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Missing required configuration: 'provider'\n\n\
                 Please provide it via:\n  \
                 - CLI option: cliplens --provider <name>\n  \
                 - Config file: ~/.config/cliplens/config.toml"
            )
        })?;

    let provider_config = config_file.providers.get(&provider_name).ok_or_else(|| {
        if config_file.providers.is_empty() {
            anyhow::anyhow!(
                "Provider '{provider_name}' not found\n\n\
                 No providers configured. Add a [providers.<name>] table to \
                 ~/.config/cliplens/config.toml"
            )
        } else {
            anyhow::anyhow!(
                "Provider '{provider_name}' not found\n\n\
                 Available providers:\n  \
                 - {}",
                config_file
                    .providers
                    .keys()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join("\n  - ")
            )
        }
    })?;

    let model = options
        .model
        .as_ref()
        .or(config_file.cliplens.model.as_ref())
        .cloned()
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Missing required configuration: 'model'\n\n\
                 Please provide it via:\n  \
                 - CLI option: cliplens --model <name>\n  \
                 - Config file: ~/.config/cliplens/config.toml"
            )
        })?;

    if !provider_config.models.is_empty() && !provider_config.models.contains(&model) {
        eprintln!(
            "{} Model '{}' is not in the configured models list for '{}'\n\
             Configured models: {}\n\
             Proceeding anyway...\n",
            Style::warning("Warning:"),
            model,
            provider_name,
            provider_config.models.join(", ")
        );
    }

    let endpoint = provider_config.endpoint().ok_or_else(|| {
        anyhow::anyhow!(
            "Provider '{provider_name}' has no endpoint\n\n\
             Set endpoint in [providers.{provider_name}]"
        )
    })?;

    if config_file.processing.languages.is_empty() {
        bail!("No translation languages configured\n\nSet languages in [processing]");
    }

    let api_key = provider_config.get_api_key();
    if provider_config.requires_api_key() && api_key.is_none() {
        let env_var = provider_config.api_key_env.as_deref().unwrap_or("API_KEY");
        bail!(
            "Provider '{provider_name}' requires an API key\n\n\
             Set the {env_var} environment variable:\n  \
             export {env_var}=\"your-api-key\"\n\n\
             Or set api_key in ~/.config/cliplens/config.toml"
        );
    }

    Ok(ResolvedConfig {
        provider_name,
        kind: provider_config.kind,
        endpoint,
        model,
        vision_model: config_file.cliplens.vision_model.clone(),
        api_key,
        models: provider_config.models.clone(),
        processing: config_file.processing.clone(),
    })
}

/// Reads and writes config.toml.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Configuration lives at `$XDG_CONFIG_HOME/cliplens/config.toml`
    /// or `~/.config/cliplens/config.toml` if `XDG_CONFIG_HOME` is not set.
    pub fn new() -> Self {
        Self {
            config_path: paths::config_dir().join("config.toml"),
        }
    }

    pub const fn at(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub const fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    pub fn load(&self) -> Result<ConfigFile> {
        let contents = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;

        toml::from_str(&contents).with_context(|| {
            format!("Failed to parse config file: {}", self.config_path.display())
        })
    }

    pub fn save(&self, config: &ConfigFile) -> Result<()> {
        let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
        crate::fs::atomic_write(&self.config_path, contents.as_bytes()).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })
    }

    /// Missing file means defaults; a malformed file is still an error.
    pub fn load_or_default(&self) -> Result<ConfigFile> {
        if self.config_path.exists() {
            self.load()
        } else {
            Ok(ConfigFile::default())
        }
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
