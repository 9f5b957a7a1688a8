//! Known models and how to obtain them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ModelError;

/// Whether a model accepts image attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    TextOnly,
    Vision,
}

/// Where a model's weights come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// Files fetched from a HuggingFace-style repository onto local disk.
    Hub { repo: String, files: Vec<String> },
    /// A model tag managed by a remote generation daemon.
    Daemon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub kind: ModelKind,
    pub source: ModelSource,
}

impl ModelSpec {
    pub fn hub(name: &str, kind: ModelKind, repo: &str, files: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            source: ModelSource::Hub {
                repo: repo.to_string(),
                files: files.iter().map(|f| (*f).to_string()).collect(),
            },
        }
    }

    pub fn daemon(name: &str, kind: ModelKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            source: ModelSource::Daemon,
        }
    }
}

const QWEN_TEXT_FILES: &[&str] = &[
    "config.json",
    "model.safetensors",
    "tokenizer.json",
    "tokenizer_config.json",
];

const QWEN_VISION_FILES: &[&str] = &[
    "config.json",
    "model.safetensors",
    "preprocessor_config.json",
    "tokenizer.json",
    "tokenizer_config.json",
];

/// Registry of models a manager is allowed to load.
///
/// Lookups of unknown names fail before any disk or network access.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    specs: BTreeMap<String, ModelSpec>,
}

impl ModelCatalog {
    /// On-device models shipped as defaults.
    pub fn builtin() -> Self {
        Self::from_specs([
            ModelSpec::hub(
                "qwen2.5-1.5b-instruct",
                ModelKind::TextOnly,
                "mlx-community/Qwen2.5-1.5B-Instruct-4bit",
                QWEN_TEXT_FILES,
            ),
            ModelSpec::hub(
                "qwen2-vl-2b-instruct",
                ModelKind::Vision,
                "mlx-community/Qwen2-VL-2B-Instruct-4bit",
                QWEN_VISION_FILES,
            ),
        ])
    }

    pub fn from_specs(specs: impl IntoIterator<Item = ModelSpec>) -> Self {
        Self {
            specs: specs
                .into_iter()
                .map(|spec| (spec.name.clone(), spec))
                .collect(),
        }
    }

    pub fn insert(&mut self, spec: ModelSpec) {
        self.specs.insert(spec.name.clone(), spec);
    }

    pub fn get(&self, name: &str) -> Result<&ModelSpec, ModelError> {
        self.specs
            .get(name)
            .ok_or_else(|| ModelError::UnknownModel(name.to_string()))
    }

    pub fn specs(&self) -> impl Iterator<Item = &ModelSpec> {
        self.specs.values()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
