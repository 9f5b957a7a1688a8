//! Subcommand implementations.

mod backend;

/// History inspection and maintenance.
pub mod history;

/// Model listing and downloads.
pub mod models;

/// Capture-and-process command handler.
pub mod process;

/// Provider listing command handler.
pub mod providers;
