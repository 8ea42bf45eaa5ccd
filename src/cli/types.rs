//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::models::AgentRole;

#[derive(Parser, Debug)]
#[command(name = "cbr-agents")]
#[command(about = "CBR Agents - chat dispatcher for hosted driving-exam assistants", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file, replacing cbr-agents.yaml and cbr-agents.local.yaml
    #[arg(short, long, global = true, env = "CBR_AGENTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP chat API
    Serve(ServeArgs),

    /// Chat with the assistants from the terminal
    Chat(ChatArgs),

    /// Show the reachability of every configured agent
    Status,

    /// Classify a message without sending it anywhere
    Classify {
        /// Message text
        text: String,
    },
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind, overriding server.host
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on, overriding server.port
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Continue an existing session
    #[arg(short, long)]
    pub session: Option<String>,

    /// Send every message to this agent instead of classifying it
    #[arg(short, long)]
    pub agent: Option<AgentRole>,

    /// Send a single message and exit
    #[arg(short, long)]
    pub message: Option<String>,

    /// Use the in-memory runtime instead of Azure AI Foundry
    #[arg(long)]
    pub offline: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_chat_with_agent() {
        let cli = Cli::try_parse_from([
            "cbr-agents",
            "--json",
            "chat",
            "--agent",
            "booking",
            "-m",
            "Examen verzetten",
        ])
        .unwrap();

        assert!(cli.json);
        let Commands::Chat(args) = cli.command else {
            panic!("expected chat command");
        };
        assert_eq!(args.agent, Some(AgentRole::Booking));
        assert_eq!(args.message.as_deref(), Some("Examen verzetten"));
        assert!(!args.offline);
    }

    #[test]
    fn test_rejects_unknown_agent() {
        let parsed = Cli::try_parse_from(["cbr-agents", "chat", "--agent", "planner"]);
        assert!(parsed.is_err());
    }
}
