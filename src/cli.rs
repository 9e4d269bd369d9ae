//! Command-line interface definition for Murmur
//!
//! This module defines the CLI structure using clap's derive API,
//! providing an interactive chat shell and one-shot commands.

use clap::{Parser, Subcommand};

/// Murmur - terminal messenger client
///
/// Chat with other users of a messenger server, live.
#[derive(Parser, Debug, Clone)]
#[command(name = "murmur")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (default: config/config.yaml, then the
    /// platform config directory)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Murmur
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Open the conversation with this user right away
        #[arg(short, long)]
        open: Option<String>,
    },

    /// List conversations with unread counts
    Conversations {
        /// Print the conversations as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send one message and exit
    Send {
        /// Username of the recipient
        #[arg(short, long)]
        to: String,

        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Search users by username
    Search {
        /// Username or prefix to look for
        username: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
