/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes four top-level command modules:

- `chat`          — Interactive chat shell with live updates
- `conversations` — List conversations and unread counts
- `send`          — Send one message
- `search`        — Look up users

Every handler builds what it needs from the library: the gateway for
one-shot requests, a full `ChatSession` for anything live.
*/

use std::sync::Arc;

use chrono::Local;
use colored::Colorize;

use crate::config::{Config, DisplayConfig};
use crate::error::{MurmurError, Result};
use crate::gateway::{GatewayConfig, RemoteGateway};
use crate::model::{Conversation, UserId};
use crate::render::{preview_line, render_conversation, render_message, Bubble, UnreadBadge};
use crate::store::Snapshot;

// Special commands parser for the chat shell
pub mod special_commands;

fn gateway(config: &Config) -> Result<RemoteGateway> {
    Ok(RemoteGateway::new(GatewayConfig::from_config(config))?)
}

/// Renders a conversation's messages in local time, honoring the
/// read-receipt setting.
pub fn conversation_bubbles(
    conversation: &Conversation,
    current_user: UserId,
    display: &DisplayConfig,
) -> Vec<Bubble> {
    render_conversation(
        conversation,
        current_user,
        display.show_read_receipts,
        &Local,
        &display.time_format,
    )
}

fn print_conversation_list(snapshot: &Snapshot) {
    if snapshot.is_empty() {
        println!("{}", "No conversations yet. Try /search <username>.".yellow());
        return;
    }
    for conversation in snapshot.iter() {
        println!("  {}", preview_line(conversation));
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat shell.
    //!
    //! Connects a `ChatSession`, then multiplexes two inputs: lines typed by
    //! the user (read on a dedicated thread, since rustyline blocks) and
    //! store snapshots pushed by the event bridge. Every snapshot triggers
    //! the read flow for the open conversation.

    use super::*;
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::session::ChatSession;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use tokio::sync::{mpsc, watch};

    /// Store snapshots as the user has seen them.
    ///
    /// `catch_up` diffs against the last snapshot it reported, so changes
    /// published while a command was running are still shown afterwards.
    struct UpdateFeed {
        updates: watch::Receiver<Snapshot>,
        seen: Snapshot,
    }

    impl UpdateFeed {
        fn new(mut updates: watch::Receiver<Snapshot>) -> Self {
            let seen = updates.borrow_and_update().clone();
            Self { updates, seen }
        }

        /// Waits for the next store change. Returns false once the store is gone.
        async fn changed(&mut self) -> bool {
            self.updates.changed().await.is_ok()
        }

        fn catch_up(
            &mut self,
            current_user: UserId,
            active: Option<&str>,
            display: &DisplayConfig,
        ) -> Vec<String> {
            let current = self.updates.borrow_and_update().clone();
            let notes = describe_updates(&self.seen, &current, current_user, active, display);
            self.seen = current;
            notes
        }
    }

    /// Start the interactive chat shell
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `open` - Username whose conversation to open at startup
    ///
    /// # Errors
    ///
    /// Fails if the session cannot connect. Errors inside the session are
    /// logged and the shell keeps running.
    pub async fn run_chat(config: Config, open: Option<String>) -> Result<()> {
        tracing::info!("Starting interactive chat");

        let session = ChatSession::connect(&config).await?;
        session.start().await;

        let mut feed = UpdateFeed::new(session.store().subscribe());

        print_welcome_banner(&session);
        print_conversation_list(&feed.seen);

        if let Some(username) = open {
            open_conversation(&session, &config, &username).await;
        }

        let (prompt_tx, prompt_rx) = std::sync::mpsc::channel::<String>();
        let (line_tx, mut line_rx) =
            mpsc::unbounded_channel::<std::result::Result<String, ReadlineError>>();
        std::thread::spawn(move || {
            let mut rl = match DefaultEditor::new() {
                Ok(rl) => rl,
                Err(e) => {
                    let _ = line_tx.send(Err(e));
                    return;
                }
            };
            while let Ok(prompt) = prompt_rx.recv() {
                let line = rl.readline(&prompt);
                if let Ok(text) = &line {
                    let _ = rl.add_history_entry(text.as_str());
                }
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        });

        prompt_tx.send(prompt_for(&session))?;

        loop {
            tokio::select! {
                line = line_rx.recv() => match line {
                    Some(Ok(line)) => {
                        if !handle_line(&session, &config, line.trim()).await {
                            break;
                        }
                        prompt_tx.send(prompt_for(&session))?;
                    }
                    Some(Err(ReadlineError::Interrupted)) => {
                        println!("CTRL-C");
                        break;
                    }
                    Some(Err(ReadlineError::Eof)) => {
                        println!("CTRL-D");
                        break;
                    }
                    Some(Err(err)) => {
                        tracing::error!("Readline error: {:?}", err);
                        break;
                    }
                    None => break,
                },
                changed = feed.changed() => {
                    if !changed {
                        break;
                    }
                    let active = session.active_username();
                    for note in feed.catch_up(session.user().id, active.as_deref(), &config.display) {
                        println!("{}", note);
                    }
                    session.sync_active().await;
                }
            }
        }

        session.end().await;
        println!("Goodbye!");
        Ok(())
    }

    /// Applies one line of input. Returns false when the shell should exit.
    async fn handle_line(session: &ChatSession, config: &Config, line: &str) -> bool {
        if line.is_empty() {
            return true;
        }

        let command = match parse_special_command(line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e.to_string().red());
                return true;
            }
        };

        match command {
            SpecialCommand::Open(username) => {
                open_conversation(session, config, &username).await;
            }
            SpecialCommand::Search(username) => {
                let users = session.search(&username).await;
                if users.is_empty() {
                    println!("{}", format!("No users matching '{}'", username).yellow());
                } else {
                    for user in users {
                        println!("  {} {}", "+".green(), user.username.bold());
                    }
                    println!("Use {} to start chatting.", "/open <username>".cyan());
                }
            }
            SpecialCommand::ClearSearch => {
                session.clear_search();
                println!("{}", "Search results cleared.".dimmed());
            }
            SpecialCommand::List => print_conversation_list(&session.store().snapshot()),
            SpecialCommand::Help => print_help(),
            SpecialCommand::Exit => return false,
            SpecialCommand::None => match session.post_to_active(line).await {
                Ok(Some(message)) => {
                    let time = crate::render::format_time(
                        &message.created_at,
                        &Local,
                        &config.display.time_format,
                    );
                    println!("{}", Bubble::Sent { text: message.text, time }.paint());
                }
                Ok(None) => eprintln!("{}", "Message not sent; see the log for details.".red()),
                Err(e) => match e.downcast_ref::<MurmurError>() {
                    Some(MurmurError::NoActiveConversation) => println!(
                        "{}",
                        "No conversation open. Use /open <username> first.".yellow()
                    ),
                    _ => eprintln!("{}", format!("Error: {}", e).red()),
                },
            },
        }
        true
    }

    async fn open_conversation(session: &ChatSession, config: &Config, username: &str) {
        match session.open_conversation(username).await {
            Ok(conversation) => {
                println!();
                println!("{}", format!("── {} ──", conversation.other_user.username).bold());
                for bubble in conversation_bubbles(&conversation, session.user().id, &config.display)
                {
                    println!("{}", bubble.paint());
                }
                println!();
            }
            Err(e) => eprintln!("{}", e.to_string().red()),
        }
    }

    fn prompt_for(session: &ChatSession) -> String {
        match session.active_username() {
            Some(username) => format!("[{}] >> ", username),
            None => ">> ".to_string(),
        }
    }

    fn print_welcome_banner(session: &ChatSession) {
        println!();
        println!(
            "{} {}",
            "murmur".bold().cyan(),
            format!("signed in as {}", session.user().username).dimmed()
        );
        println!("Type {} for commands.", "/help".cyan());
        println!();
    }

    /// Lines to print for what changed between two snapshots.
    ///
    /// Messages from the other participant of the open conversation are
    /// shown in full; elsewhere they become a one-line notice with the
    /// unread badge. A moved read marker in the open conversation is shown
    /// when read receipts are enabled.
    pub fn describe_updates(
        before: &Snapshot,
        after: &Snapshot,
        current_user: UserId,
        active: Option<&str>,
        display: &DisplayConfig,
    ) -> Vec<String> {
        let mut notes = Vec::new();

        for conversation in after.iter() {
            let previous = before.find_by_participant(conversation.other_user.id);
            let (seen_messages, seen_marker) = previous
                .map(|p| (p.messages.len(), p.last_message_id_read_by_recipient))
                .unwrap_or((0, None));
            if previous.is_some_and(|p| Arc::ptr_eq(p, conversation)) {
                continue;
            }

            let is_active = active == Some(conversation.other_user.username.as_str());
            let incoming: Vec<_> = conversation
                .messages
                .iter()
                .skip(seen_messages)
                .filter(|m| m.sender_id != current_user)
                .collect();

            if is_active {
                for message in incoming {
                    let bubble = render_message(
                        message,
                        &conversation.other_user,
                        current_user,
                        None,
                        &Local,
                        &display.time_format,
                    );
                    notes.push(bubble.paint());
                }
                if display.show_read_receipts
                    && conversation.last_message_id_read_by_recipient != seen_marker
                    && conversation.last_message_id_read_by_recipient.is_some()
                {
                    notes.push(
                        format!("{:>8} seen by {}", "✓", conversation.other_user.username)
                            .green()
                            .to_string(),
                    );
                }
            } else if let Some(last) = incoming.last() {
                let badge = UnreadBadge::for_conversation(conversation)
                    .map(|b| format!(" {}", b))
                    .unwrap_or_default();
                notes.push(format!(
                    "{} {}{}: {}",
                    "new message from".dimmed(),
                    conversation.other_user.username.bold(),
                    badge.blue(),
                    last.text
                ));
            }
        }

        notes
    }

}

// Conversation listing handler
pub mod conversations {
    //! `murmur conversations`: one fetch, printed as a table or JSON.

    use super::*;
    use prettytable::{format, Table};

    /// List conversations with unread badges
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    pub async fn run_conversations(config: Config, json: bool) -> Result<()> {
        let gateway = gateway(&config)?;
        let snapshot = crate::store::transform::hydrate(gateway.fetch_conversations().await?);

        if json {
            let conversations: Vec<&Conversation> = snapshot.iter().map(|c| c.as_ref()).collect();
            println!("{}", serde_json::to_string_pretty(&conversations)?);
            return Ok(());
        }

        if snapshot.is_empty() {
            println!("{}", "No conversations found.".yellow());
            return Ok(());
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
        table.add_row(prettytable::row![
            "User".bold(),
            "Online".bold(),
            "Unread".bold(),
            "Latest".bold()
        ]);

        for conversation in snapshot.iter() {
            let unread = UnreadBadge::for_conversation(conversation)
                .map(|b| b.to_string().blue().bold().to_string())
                .unwrap_or_default();
            let online = if conversation.other_user.online {
                "●".green()
            } else {
                "○".dimmed()
            };
            let latest = conversation.latest_message_text.clone().unwrap_or_default();
            let latest = if latest.chars().count() > 40 {
                format!("{}...", latest.chars().take(37).collect::<String>())
            } else {
                latest
            };
            table.add_row(prettytable::row![
                conversation.other_user.username.cyan(),
                online,
                unread,
                latest
            ]);
        }

        println!("\nConversations ({} unread):", snapshot.total_unread());
        table.printstd();
        println!();
        Ok(())
    }
}

// One-shot send handler
pub mod send {
    //! `murmur send --to <username> <text>`.
    //!
    //! Uses a full session so the store and signals behave exactly as in
    //! the chat shell: existing conversations get the message appended,
    //! unknown users are looked up first and a conversation is started.

    use super::*;
    use crate::session::ChatSession;

    /// Send one message and exit
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot connect, the recipient cannot
    /// be found, or the message is not accepted.
    pub async fn run_send(config: Config, to: String, text: String) -> Result<()> {
        let session = ChatSession::connect(&config).await?;
        session.start().await;

        if session.store().snapshot().find_by_username(&to).is_none() {
            session.search(&to).await;
        }

        let outcome = session.open_conversation(&to).await;
        let result = match outcome {
            Ok(_) => session.post_to_active(&text).await,
            Err(e) => Err(e),
        };
        session.end().await;

        match result? {
            Some(message) => {
                println!("{}", format!("Sent to {} (message {})", to, message.id).green());
                Ok(())
            }
            None => Err(MurmurError::Transport(format!("message to {} was not accepted", to)).into()),
        }
    }
}

// User search handler
pub mod search {
    //! `murmur search <username>`.

    use super::*;

    /// Print users matching `username`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn run_search(config: Config, username: String) -> Result<()> {
        let gateway = gateway(&config)?;
        let users = match gateway.search_users(&username).await {
            Ok(users) => users,
            Err(crate::gateway::GatewayError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        if users.is_empty() {
            println!("{}", format!("No users matching '{}'", username).yellow());
            return Ok(());
        }

        for user in users {
            let online = if user.online { "●".green() } else { "○".dimmed() };
            println!("{} {} {}", online, user.username.bold(), format!("#{}", user.id).dimmed());
        }
        Ok(())
    }
}
