//! Real-time signals
//!
//! Signals travel as one JSON text frame each, wrapped in an envelope naming
//! the event:
//!
//! ```text
//! {"event": "new-message", "data": {"message": {...}, "recipientId": 2, "sender": null}}
//! ```
//!
//! Four signals are inbound and drive the conversation store
//! (`new-message`, `read-message`, `add-online-user`, `remove-offline-user`).
//! `new-message` and `read-message` are also emitted by this client;
//! `go-online` and `logout` are outbound-only presence announcements.
//!
//! # Example
//!
//! ```
//! use murmur::signals::{PresenceChange, Signal};
//!
//! let frame = r#"{"event":"add-online-user","data":{"id":7}}"#;
//! let signal = Signal::decode(frame).unwrap();
//! assert_eq!(signal, Signal::AddOnlineUser(PresenceChange { id: 7 }));
//! assert_eq!(signal.name(), "add-online-user");
//! ```

pub mod transport;
pub mod websocket;

#[cfg(test)]
pub mod fake;

use serde::{Deserialize, Serialize};

use crate::error::{MurmurError, Result};
use crate::model::{ConversationId, Message, MessageId, User, UserId};

pub use transport::SignalTransport;

/// Payload of `new-message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    /// The stored message, including its conversation id.
    pub message: Message,
    /// Recipient of the message.
    #[serde(default)]
    pub recipient_id: Option<UserId>,
    /// Present when the message started a new conversation.
    #[serde(default)]
    pub sender: Option<User>,
}

/// Payload of `read-message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadMessage {
    /// Conversation that was read.
    pub conversation_id: ConversationId,
    /// User who read it.
    pub read_user_id: UserId,
    /// Newest message id that user has seen.
    pub last_read_message_id: MessageId,
}

/// Payload of the presence signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceChange {
    /// User whose presence changed.
    pub id: UserId,
}

/// A named real-time signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum Signal {
    /// A message was stored for a conversation.
    NewMessage(NewMessage),
    /// A participant read a conversation up to a message.
    ReadMessage(ReadMessage),
    /// A user came online.
    AddOnlineUser(PresenceChange),
    /// A user went offline.
    RemoveOfflineUser(PresenceChange),
    /// This client announces itself online.
    GoOnline(PresenceChange),
    /// This client announces it is leaving.
    Logout(PresenceChange),
}

impl Signal {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Signal::NewMessage(_) => "new-message",
            Signal::ReadMessage(_) => "read-message",
            Signal::AddOnlineUser(_) => "add-online-user",
            Signal::RemoveOfflineUser(_) => "remove-offline-user",
            Signal::GoOnline(_) => "go-online",
            Signal::Logout(_) => "logout",
        }
    }

    /// Returns true for signals the server never delivers to clients.
    pub fn is_outbound_only(&self) -> bool {
        matches!(self, Signal::GoOnline(_) | Signal::Logout(_))
    }

    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`MurmurError::SignalCodec`] for malformed JSON or unknown events.
    pub fn decode(frame: &str) -> Result<Self> {
        serde_json::from_str(frame)
            .map_err(|e| MurmurError::SignalCodec(format!("cannot decode frame: {}", e)).into())
    }

    /// Encodes the signal as one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`MurmurError::SignalCodec`] if serialization fails.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            MurmurError::SignalCodec(format!("cannot encode {}: {}", self.name(), e)).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{message, user};

    #[test]
    fn test_decode_new_message_with_sender() {
        let frame = r#"{
            "event": "new-message",
            "data": {
                "message": {"id": 3, "senderId": 2, "text": "hi", "createdAt": "2024-03-01T10:00:00Z", "conversationId": 8},
                "recipientId": 1,
                "sender": {"id": 2, "username": "thomas", "online": true}
            }
        }"#;

        match Signal::decode(frame).unwrap() {
            Signal::NewMessage(payload) => {
                assert_eq!(payload.message.conversation_id, Some(8));
                assert_eq!(payload.recipient_id, Some(1));
                assert_eq!(payload.sender.unwrap().username, "thomas");
            }
            other => panic!("unexpected signal: {:?}", other),
        }
    }

    #[test]
    fn test_decode_new_message_null_sender() {
        let frame = r#"{"event":"new-message","data":{"message":{"id":3,"senderId":2,"text":"hi","createdAt":"2024-03-01T10:00:00Z","conversationId":8},"recipientId":1,"sender":null}}"#;
        let signal = Signal::decode(frame).unwrap();
        assert!(matches!(signal, Signal::NewMessage(NewMessage { sender: None, .. })));
    }

    #[test]
    fn test_decode_read_message() {
        let frame = r#"{"event":"read-message","data":{"conversationId":8,"readUserId":2,"lastReadMessageId":3}}"#;
        assert_eq!(
            Signal::decode(frame).unwrap(),
            Signal::ReadMessage(ReadMessage {
                conversation_id: 8,
                read_user_id: 2,
                last_read_message_id: 3,
            })
        );
    }

    #[test]
    fn test_decode_presence() {
        let frame = r#"{"event":"remove-offline-user","data":{"id":4}}"#;
        assert_eq!(
            Signal::decode(frame).unwrap(),
            Signal::RemoveOfflineUser(PresenceChange { id: 4 })
        );
    }

    #[test]
    fn test_decode_unknown_event_fails() {
        let err = Signal::decode(r#"{"event":"typing","data":{"id":4}}"#).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MurmurError>(),
            Some(MurmurError::SignalCodec(_))
        ));
        assert!(Signal::decode("not json").is_err());
    }

    #[test]
    fn test_encode_uses_envelope() {
        let signal = Signal::NewMessage(NewMessage {
            message: message(3, 1, "hello", Some(8)),
            recipient_id: Some(2),
            sender: Some(user(1, "me")),
        });
        let value: serde_json::Value = serde_json::from_str(&signal.encode().unwrap()).unwrap();
        assert_eq!(value["event"], "new-message");
        assert_eq!(value["data"]["recipientId"], 2);
        assert_eq!(value["data"]["message"]["conversationId"], 8);
    }

    #[test]
    fn test_outbound_only_classification() {
        assert!(Signal::GoOnline(PresenceChange { id: 1 }).is_outbound_only());
        assert!(Signal::Logout(PresenceChange { id: 1 }).is_outbound_only());
        assert!(!Signal::AddOnlineUser(PresenceChange { id: 1 }).is_outbound_only());
    }
}
