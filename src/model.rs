//! Data model shared by the store, the gateway, and the signal channel.
//!
//! Field names follow the messenger API's camelCase JSON so the same types
//! deserialize from `GET /conversations`, `POST /messages` responses, and
//! inbound `new-message` signals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned user identifier.
pub type UserId = i64;

/// Server-assigned message identifier. Ids grow monotonically per server.
pub type MessageId = i64;

/// Server-assigned conversation identifier.
pub type ConversationId = i64;

/// A participant as seen by the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user id.
    pub id: UserId,
    /// Display name, unique per server.
    pub username: String,
    /// Avatar URL, if the user has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Presence flag maintained by `add-online-user` / `remove-offline-user`.
    #[serde(default)]
    pub online: bool,
}

impl User {
    /// Creates an offline user without an avatar.
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            photo_url: None,
            online: false,
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message id.
    pub id: MessageId,
    /// Author of the message.
    pub sender_id: UserId,
    /// Message body.
    pub text: String,
    /// Creation time as recorded by the server.
    pub created_at: DateTime<Utc>,
    /// Owning conversation. The conversation listing omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
}

/// A thread between the signed-in user and one other participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Server id; `None` for an ephemeral conversation built from search results.
    #[serde(default)]
    pub id: Option<ConversationId>,
    /// The other participant.
    pub other_user: User,
    /// Messages in chronological order.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Cached text of the newest message, for previews.
    #[serde(default)]
    pub latest_message_text: Option<String>,
    /// Messages not yet acknowledged by the signed-in user.
    #[serde(default)]
    pub unread_messages: usize,
    /// The signed-in user's own read marker, as persisted by the server.
    #[serde(default)]
    pub last_read_message_id: Option<MessageId>,
    /// The other participant's read marker, learned from read receipts.
    #[serde(default)]
    pub last_message_id_read_by_recipient: Option<MessageId>,
}

impl Conversation {
    /// Builds an ephemeral conversation for a search result.
    pub fn ephemeral(other_user: User) -> Self {
        Self {
            id: None,
            other_user,
            messages: Vec::new(),
            latest_message_text: None,
            unread_messages: 0,
            last_read_message_id: None,
            last_message_id_read_by_recipient: None,
        }
    }

    /// Builds a real conversation seeded with its first inbound message.
    pub fn started_by(sender: User, message: Message) -> Self {
        Self {
            id: message.conversation_id,
            other_user: sender,
            latest_message_text: Some(message.text.clone()),
            messages: vec![message],
            unread_messages: 1,
            last_read_message_id: None,
            last_message_id_read_by_recipient: None,
        }
    }

    /// Returns true when the conversation has no server id yet.
    pub fn is_ephemeral(&self) -> bool {
        self.id.is_none()
    }

    /// Returns the newest message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Appends a message and refreshes the cached preview text.
    pub(crate) fn push_message(&mut self, message: Message) {
        self.latest_message_text = Some(message.text.clone());
        self.messages.push(message);
    }
}
