//! HTTP client for the messenger API.
//!
//! [`RemoteGateway`] is a thin request/response wrapper. It owns no state
//! beyond its configuration; callers apply the results to the
//! [`crate::store::ConversationStore`].
//!
//! # Example
//!
//! ```rust,no_run
//! use murmur::gateway::{GatewayConfig, RemoteGateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = RemoteGateway::new(GatewayConfig {
//!         base_url: "http://localhost:3001/api".to_string(),
//!         token: Some("session-token".to_string()),
//!         timeout_secs: 30,
//!     })?;
//!
//!     for conversation in gateway.fetch_conversations().await? {
//!         println!("{} ({})", conversation.other_user.username, conversation.unread_messages);
//!     }
//!     Ok(())
//! }
//! ```

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::config::Config;
use crate::model::{Conversation, ConversationId, Message, MessageId, User, UserId};

/// Errors that can occur during gateway calls.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API error with status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The server rejected the credentials.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Base URL cannot address the endpoint.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Body of `POST /messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    /// Message body.
    pub text: String,
    /// User the message is addressed to.
    pub recipient_id: UserId,
    /// Existing conversation, or `None` to start one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    /// The sending user, sent along when starting a conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<User>,
}

/// Response of `POST /messages`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostedMessage {
    /// The stored message with its server id and conversation id.
    pub message: Message,
    /// Echo of the sender when the message started a conversation.
    #[serde(default)]
    pub sender: Option<User>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadAcknowledgement {
    conversation_id: ConversationId,
    last_read_message_id: MessageId,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API base URL, e.g. `http://localhost:3001/api`.
    pub base_url: String,
    /// Bearer token, if the server requires one.
    pub token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl GatewayConfig {
    /// Takes the server and auth sections of the application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.server.api_url.clone(),
            token: config.auth.token.clone(),
            timeout_secs: config.server.timeout_seconds,
        }
    }
}

/// Messenger API client.
#[derive(Debug, Clone)]
pub struct RemoteGateway {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl RemoteGateway {
    /// Creates a new gateway.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidUrl` if the base URL does not parse and
    /// `GatewayError::Http` if the HTTP client cannot be created.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| GatewayError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(config.base_url));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: config.token,
        })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Builds a request with authentication headers.
    fn build_request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, GatewayError> {
        let url = self.endpoint(segments)?;
        let mut request = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        Ok(request)
    }

    /// Maps non-success statuses onto [`GatewayError`] and decodes the body.
    async fn check_status(response: Response, what: &str) -> Result<Response, GatewayError> {
        let status = response.status();
        match status {
            s if s.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => Err(GatewayError::Authentication(format!(
                "{} rejected the session",
                what
            ))),
            StatusCode::NOT_FOUND => Err(GatewayError::NotFound(what.to_string())),
            _ => {
                let body = response.text().await.unwrap_or_default();
                error!(status = status.as_u16(), body = %body, request = what, "API request failed");
                Err(GatewayError::Api {
                    status: status.as_u16(),
                    message: body,
                })
            }
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, GatewayError> {
        let bytes = Self::check_status(response, what).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Fetches the signed-in user (`GET /auth/user`).
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Authentication` when the token is missing or
    /// expired.
    pub async fn current_user(&self) -> Result<User, GatewayError> {
        let response = self
            .build_request(Method::GET, &["auth", "user"])?
            .send()
            .await?;
        let user: User = Self::decode(response, "GET /auth/user").await?;
        debug!(user_id = user.id, username = %user.username, "Resolved current user");
        Ok(user)
    }

    /// Fetches every conversation of the signed-in user (`GET /conversations`).
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the request fails or the body does not
    /// decode.
    pub async fn fetch_conversations(&self) -> Result<Vec<Conversation>, GatewayError> {
        let response = self
            .build_request(Method::GET, &["conversations"])?
            .send()
            .await?;
        let conversations: Vec<Conversation> =
            Self::decode(response, "GET /conversations").await?;
        info!(count = conversations.len(), "Fetched conversations");
        Ok(conversations)
    }

    /// Stores a message (`POST /messages`).
    ///
    /// # Arguments
    ///
    /// * `outgoing` - Message text, recipient and, for an existing
    ///   conversation, its id
    ///
    /// # Returns
    ///
    /// The stored message as assigned by the server.
    pub async fn post_message(&self, outgoing: &OutgoingMessage) -> Result<PostedMessage, GatewayError> {
        let response = self
            .build_request(Method::POST, &["messages"])?
            .json(outgoing)
            .send()
            .await?;
        let posted: PostedMessage = Self::decode(response, "POST /messages").await?;
        debug!(
            message_id = posted.message.id,
            conversation_id = ?posted.message.conversation_id,
            recipient_id = outgoing.recipient_id,
            "Posted message"
        );
        Ok(posted)
    }

    /// Persists the viewing user's read marker (`PUT /conversations`).
    ///
    /// The acknowledgement body is ignored.
    pub async fn mark_read(
        &self,
        conversation_id: ConversationId,
        last_read_message_id: MessageId,
    ) -> Result<(), GatewayError> {
        let body = ReadAcknowledgement {
            conversation_id,
            last_read_message_id,
        };
        let response = self
            .build_request(Method::PUT, &["conversations"])?
            .json(&body)
            .send()
            .await?;
        Self::check_status(response, "PUT /conversations").await?;
        debug!(conversation_id, last_read_message_id, "Acknowledged read");
        Ok(())
    }

    /// Searches users by username (`GET /users/{username}`).
    ///
    /// The result may include the signed-in user; filtering is left to the
    /// caller.
    pub async fn search_users(&self, username: &str) -> Result<Vec<User>, GatewayError> {
        let response = self
            .build_request(Method::GET, &["users", username])?
            .send()
            .await?;
        let users: Vec<User> = Self::decode(response, "GET /users").await?;
        debug!(query = %username, matches = users.len(), "Searched users");
        Ok(users)
    }
}
