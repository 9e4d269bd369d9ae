//! Special commands parser for the interactive chat shell
//!
//! Special commands let the user move around the conversation list while
//! chatting:
//! - Open a conversation by the other participant's username
//! - Search users and clear the search results
//! - List conversations
//! - Display help information
//! - Exit the session
//!
//! Commands are prefixed with `/`. The command word is case-insensitive;
//! usernames are passed through as typed.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an argument it does not take
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed in the chat shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Open the conversation with a user and acknowledge it
    Open(String),

    /// Search users; matches appear as new conversations
    Search(String),

    /// Remove search results from the conversation list
    ClearSearch,

    /// Show the conversation list with unread badges
    List,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input is sent as a message to the active conversation.
    None,
}

fn required_arg(command: &str, usage: &str, arg: &str) -> Result<String, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        })
    } else {
        Ok(arg.to_string())
    }
}

fn no_arg(command: &str, arg: &str, parsed: SpecialCommand) -> Result<SpecialCommand, CommandError> {
    if arg.is_empty() {
        Ok(parsed)
    } else {
        Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        })
    }
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if input starts with "/" but is not
/// a valid command, `CommandError::MissingArgument` if `/open` or `/search`
/// lack a username, and `CommandError::UnsupportedArgument` if a bare
/// command is given one.
///
/// # Examples
///
/// ```
/// use murmur::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// let cmd = parse_special_command("/open Santiago").unwrap();
/// assert_eq!(cmd, SpecialCommand::Open("Santiago".to_string()));
///
/// let cmd = parse_special_command("see you at noon").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let (word, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((word, arg)) => (word.to_lowercase(), arg.trim()),
        None => (lower, ""),
    };

    match word.as_str() {
        "/open" | "/o" => {
            required_arg("/open", "/open <username>", arg).map(SpecialCommand::Open)
        }
        "/search" | "/s" => {
            required_arg("/search", "/search <username>", arg).map(SpecialCommand::Search)
        }
        "/clear" => no_arg("/clear", arg, SpecialCommand::ClearSearch),
        "/list" | "/ls" => no_arg("/list", arg, SpecialCommand::List),
        "/help" | "/?" => no_arg("/help", arg, SpecialCommand::Help),
        "/quit" | "/exit" | "exit" | "quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Display help information for the chat shell
pub fn print_help() {
    println!(
        r#"
Chat Commands
=============

CONVERSATIONS:
  /open <username>   - Open the conversation with a user (alias /o)
  /list              - Show conversations and unread counts (alias /ls)

SEARCH:
  /search <username> - Find users to start a conversation with (alias /s)
  /clear             - Remove search results from the list

SESSION CONTROL:
  /help              - Show this help message (alias /?)
  /quit              - Leave the chat (also: exit, quit)

Any other input is sent to the open conversation.
"#
    );
}
