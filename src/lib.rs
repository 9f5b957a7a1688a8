//! # cliplens - clipboard history with AI results
//!
//! `cliplens` keeps a history of clipboard entries and enriches each one in
//! the background: grammar and tone rewrites, language detection followed by
//! translation into every configured language, and image descriptions. Any
//! text or vision backend can do the work, from a local Ollama daemon to an
//! OpenAI-compatible service or an on-device runtime with downloaded weights.
//! The history is saved encrypted, with writes debounced.
//!
//! ## Quick Start
//!
//! ```bash
//! # Capture a file as a new history item and process it
//! cliplens process ./notes.txt
//!
//! # From stdin, showing the Japanese translation
//! pbpaste | cliplens process --to ja
//!
//! # Browse the history
//! cliplens history list
//! cliplens history show 1
//!
//! # Fetch on-device weights
//! cliplens models download qwen2.5-1.5b-instruct
//! ```
//!
//! ## Configuration
//!
//! Settings are stored in `~/.config/cliplens/config.toml`:
//!
//! ```toml
//! [cliplens]
//! provider = "ollama"
//! model = "llama3.2"
//! vision_model = "llava"
//!
//! [processing]
//! languages = ["en", "es", "fr", "de", "ja"]
//!
//! [providers.ollama]
//! kind = "ollama"
//! endpoint = "http://localhost:11434"
//! models = ["llama3.2", "llava"]
//! ```

/// Fingerprint-keyed cache of structured results.
pub mod cache;

/// Command-line interface definitions and handlers.
pub mod cli;

/// Configuration file management and provider settings.
pub mod config;

/// File system utilities.
pub mod fs;

/// Text and vision generation backends.
pub mod generation;

/// Input reading from files and stdin.
pub mod input;

/// Clipboard items and their result slots.
pub mod item;

/// Diagnostic logging setup.
pub mod logging;

/// Model download, caching and load management.
pub mod models;

/// Per-item fan-out of generation jobs.
pub mod orchestrator;

/// XDG-style path utilities for configuration and data.
pub mod paths;

/// Encrypted, debounced history storage.
pub mod persistence;

/// Prompt templates, response cleanup and the provider adapter.
pub mod provider;

/// The single-writer item collection.
pub mod store;

/// Language detection and translation fan-out.
pub mod translation;

/// Terminal UI components (spinner, progress bar, colors).
pub mod ui;
