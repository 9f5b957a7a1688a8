use anyhow::Result;
use clap::Parser;

use cliplens::cli::commands::{history, models, process, providers};
use cliplens::cli::{Args, Command};
use cliplens::config::{ConfigManager, ResolveOptions};
use cliplens::logging;
use cliplens::translation::print_languages;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    match args.command {
        Command::Process {
            file,
            to,
            analyze,
            no_save,
        } => {
            let options = process::ProcessOptions {
                file,
                to,
                analyze,
                no_save,
                provider: args.provider,
                model: args.model,
            };
            process::run_process(options).await?;
        }
        Command::History { command } => {
            history::run_history(command).await?;
        }
        Command::Models { command } => {
            let options = ResolveOptions {
                provider: args.provider,
                model: args.model,
            };
            models::run_models(command, options).await?;
        }
        Command::Languages => {
            let config = ConfigManager::new().load_or_default()?;
            print_languages(&config.processing.languages);
        }
        Command::Providers { name } => {
            providers::print_providers(name.as_deref())?;
        }
    }

    Ok(())
}
