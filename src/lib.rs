//! Murmur - terminal messenger client library
//!
//! This library keeps a signed-in user's conversations in sync with a
//! messenger server: an HTTP API for history and sending, and a WebSocket
//! signal channel for live messages, read receipts and presence.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `model`: Users, messages and conversations as the API serializes them
//! - `store`: `ConversationStore`, immutable snapshots and pure transforms
//! - `signals`: Signal wire types and transports (WebSocket, in-process fake)
//! - `bridge`: `EventBridge` dispatching inbound signals into the store
//! - `gateway`: `RemoteGateway` HTTP client
//! - `session`: `ChatSession` wiring the above together, read receipts
//! - `render`: Message bubbles and unread badges
//! - `config`, `logging`, `error`: Ambient setup
//! - `cli`, `commands`: Command-line interface and handlers
//!
//! # Example
//!
//! ```no_run
//! use murmur::{ChatSession, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let session = ChatSession::connect(&config).await?;
//!     session.start().await;
//!     println!("{} conversations", session.store().snapshot().len());
//!     session.end().await;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod render;
pub mod session;
pub mod signals;
pub mod store;

// Re-export commonly used types
pub use bridge::{EventBridge, Subscription};
pub use config::Config;
pub use error::{MurmurError, Result};
pub use gateway::RemoteGateway;
pub use model::{Conversation, Message, User};
pub use session::{ChatSession, ReadState};
pub use store::{ConversationStore, Snapshot};

#[cfg(test)]
pub mod test_utils;
