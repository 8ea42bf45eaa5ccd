//! CBR Agents CLI entry point.

use anyhow::Result;
use clap::Parser;

use cbr_agents::cli::commands::{chat, classify, serve, status};
use cbr_agents::cli::{handle_error, Cli, Commands};
use cbr_agents::infrastructure::config::ConfigLoader;
use cbr_agents::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ConfigLoader::load(cli.config.as_deref())?;
    let _logger = LoggerImpl::init(&config.logging)?;

    match cli.command {
        Commands::Serve(args) => serve::execute(args, config).await,
        Commands::Chat(args) => chat::execute(args, config, cli.json).await,
        Commands::Status => status::execute(config, cli.json).await,
        Commands::Classify { text } => classify::execute(&text, &config, cli.json),
    }
}
