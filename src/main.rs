//! Murmur - terminal messenger client
//!
#![doc = "Main entry point for the murmur CLI."]

use anyhow::Result;

use murmur::cli::{Cli, Commands};
use murmur::commands;
use murmur::config::Config;
use murmur::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config = Config::load(cli.config.as_deref(), &cli)?;

    // Initialize logging once the level is known
    init_logging(&config.logging)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { open } => {
            if let Some(username) = &open {
                tracing::debug!("Opening conversation with {} at startup", username);
            }
            commands::chat::run_chat(config, open).await?;
        }
        Commands::Conversations { json } => {
            tracing::info!("Listing conversations");
            commands::conversations::run_conversations(config, json).await?;
        }
        Commands::Send { to, text } => {
            tracing::info!("Sending one message to {}", to);
            commands::send::run_send(config, to, text.join(" ")).await?;
        }
        Commands::Search { username } => {
            tracing::info!("Searching users matching {}", username);
            commands::search::run_search(config, username).await?;
        }
    }

    Ok(())
}
