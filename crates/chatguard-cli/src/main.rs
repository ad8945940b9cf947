mod cli;
mod commands;

use anyhow::Result;
use chatguard_config::Config;
use clap::Parser;

use crate::cli::Commands;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        commands::completions(shell);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Check {
            text,
            offline,
            json,
        } => commands::check::handle(&config, &text, offline, json).await,
        Commands::Health => commands::health::handle(&config).await,
        Commands::Settings(cmd) => commands::settings::handle(cmd, config, cli.config.as_deref()),
        Commands::Simulate {
            edits,
            contenteditable,
            offline,
            host,
        } => commands::simulate::handle(&config, edits, contenteditable, offline, host).await,
        Commands::Completions { .. } => Ok(()),
    }
}
