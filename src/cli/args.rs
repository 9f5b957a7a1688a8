use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cliplens")]
#[command(about = "Clipboard history with AI rewrites, translations and image descriptions")]
#[command(version)]
pub struct Args {
    /// Provider name from config.toml
    #[arg(short = 'p', long, global = true)]
    pub provider: Option<String>,

    /// Model name
    #[arg(short = 'm', long, global = true)]
    pub model: Option<String>,

    /// Show debug logs on stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Capture a file (or stdin) as a new history item and process it
    Process {
        /// File to capture (reads from stdin if not provided)
        file: Option<String>,

        /// Show the translation for this language code
        #[arg(short = 't', long = "to")]
        to: Option<String>,

        /// Also summarize, tag and classify the text
        #[arg(short = 'a', long)]
        analyze: bool,

        /// Process without writing the history file
        #[arg(long)]
        no_save: bool,
    },
    /// Inspect and manage the stored history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
    /// Download and inspect models
    Models {
        #[command(subcommand)]
        command: ModelsCommand,
    },
    /// List configured translation languages
    Languages,
    /// List configured providers
    Providers {
        /// Show details for one provider
        name: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List items, most recent first
    List,
    /// Show one item with all of its results
    Show {
        /// Position in the list (1 = most recent)
        index: usize,
    },
    /// Delete the history
    Clear {
        /// Keep items marked as useful
        #[arg(long)]
        keep_useful: bool,
    },
    /// Mark an item as useful
    Useful {
        /// Position in the list (1 = most recent)
        index: usize,

        /// Remove the mark instead
        #[arg(long)]
        off: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// List models the active provider can load
    List,
    /// Show which models are ready on disk
    Status,
    /// Download a model (Ctrl+C cancels)
    Download {
        /// Model name
        name: String,
    },
}
