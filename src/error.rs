//! Error types for Murmur
//!
//! This module defines the crate-level error type, using `thiserror` for
//! ergonomic error handling. HTTP status mapping lives in
//! [`crate::gateway::GatewayError`] and converts into [`MurmurError`].

use thiserror::Error;

use crate::gateway::GatewayError;

/// Main error type for Murmur operations
///
/// Covers configuration loading, remote API calls, the real-time signal
/// channel, and the interactive shell.
#[derive(Error, Debug)]
pub enum MurmurError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote API errors (status mapping, authentication, not found)
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Signal transport errors (connection closed, send failed)
    #[error("Signal transport error: {0}")]
    Transport(String),

    /// A signal frame could not be decoded or encoded
    #[error("Signal codec error: {0}")]
    SignalCodec(String),

    /// The requested conversation or participant is not in the store
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    /// No conversation is currently open in the session
    #[error("No active conversation")]
    NoActiveConversation,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// WebSocket protocol errors
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Result type alias for Murmur operations
///
/// Uses `anyhow::Error` so callers can attach context while the typed
/// [`MurmurError`] stays recoverable through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
