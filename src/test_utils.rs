//! Test utilities for Murmur
//!
//! Fixture builders for users, messages, and conversations, plus temporary
//! file helpers and assertion helpers shared by the unit tests.

use crate::config::Config;
use crate::error::MurmurError;
use crate::model::{Conversation, ConversationId, Message, MessageId, User, UserId};
use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;
use tempfile::TempDir;

/// Fixed base time for fixture messages; message `n` is created `n` minutes later.
pub fn base_time() -> DateTime<Utc> {
    "2024-03-01T10:00:00Z"
        .parse()
        .expect("fixture timestamp must parse")
}

/// Build an offline user.
pub fn user(id: UserId, username: &str) -> User {
    User::new(id, username)
}

/// Build a message whose timestamp is derived from its id.
pub fn message(
    id: MessageId,
    sender_id: UserId,
    text: &str,
    conversation_id: Option<ConversationId>,
) -> Message {
    Message {
        id,
        sender_id,
        text: text.to_string(),
        created_at: base_time() + Duration::minutes(id),
        conversation_id,
    }
}

/// Build a conversation with a zero unread counter and a consistent preview.
pub fn conversation(
    id: Option<ConversationId>,
    other_id: UserId,
    other_username: &str,
    messages: Vec<Message>,
) -> Conversation {
    let latest_message_text = messages.last().map(|m| m.text.clone());
    Conversation {
        id,
        other_user: user(other_id, other_username),
        messages,
        latest_message_text,
        unread_messages: 0,
        last_read_message_id: None,
        last_message_id_read_by_recipient: None,
    }
}

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content and return its path
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T, MurmurError>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Create a test configuration with default values
pub fn test_config() -> Config {
    Config::default()
}

/// Create a test configuration YAML string
pub fn test_config_yaml() -> String {
    r#"
server:
  api_url: http://chat.example.test/api
  socket_url: wss://chat.example.test/signals
  timeout_seconds: 10
auth:
  token: secret-token
display:
  time_format: "%H:%M"
  show_read_receipts: false
logging:
  level: debug
  json_format: true
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "test.txt", "content");
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "content");
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<(), MurmurError> =
            Err(MurmurError::Config("test error message".to_string()));
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        let result: Result<(), MurmurError> = Ok(());
        assert_error_contains(result, "error");
    }

    #[test]
    fn test_message_fixture_orders_by_id() {
        let a = message(1, 2, "a", None);
        let b = message(2, 2, "b", None);
        assert!(a.created_at < b.created_at);
    }

    #[test]
    fn test_conversation_fixture_preview() {
        let convo = conversation(Some(1), 2, "thomas", vec![message(1, 2, "hey", Some(1))]);
        assert_eq!(convo.latest_message_text.as_deref(), Some("hey"));
        assert_eq!(convo.unread_messages, 0);
    }

    #[test]
    fn test_test_config_yaml() {
        let config: Config = serde_yaml::from_str(&test_config_yaml()).unwrap();
        assert!(config.validate().is_ok());
        assert!(test_config().validate().is_ok());
    }
}
