//! Presentation of conversations: message bubbles and unread badges.
//!
//! Everything here is a pure function of a conversation (plus the signed-in
//! user and a timezone); the terminal front end only paints the results.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use colored::Colorize;

use crate::model::{Conversation, Message, MessageId, User, UserId};

/// Default `h:mm` time label format (12-hour clock, no leading zero).
pub const DEFAULT_TIME_FORMAT: &str = "%-I:%M";

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bubble {
    /// Sent by the signed-in user.
    Sent { text: String, time: String },
    /// Sent by the signed-in user and the newest message the recipient has read.
    SentAndRead {
        text: String,
        time: String,
        reader: User,
    },
    /// Sent by the other participant.
    Received {
        text: String,
        time: String,
        sender: User,
    },
}

impl Bubble {
    /// Message body.
    pub fn text(&self) -> &str {
        match self {
            Bubble::Sent { text, .. }
            | Bubble::SentAndRead { text, .. }
            | Bubble::Received { text, .. } => text,
        }
    }

    /// Time label.
    pub fn time(&self) -> &str {
        match self {
            Bubble::Sent { time, .. }
            | Bubble::SentAndRead { time, .. }
            | Bubble::Received { time, .. } => time,
        }
    }

    /// Colored single-line rendering for the terminal.
    pub fn paint(&self) -> String {
        match self {
            Bubble::Sent { text, time } => {
                format!("{:>8} {} {}", time.dimmed(), "you:".cyan().bold(), text)
            }
            Bubble::SentAndRead { text, time, reader } => format!(
                "{:>8} {} {} {}",
                time.dimmed(),
                "you:".cyan().bold(),
                text,
                format!("(seen by {})", reader.username).green()
            ),
            Bubble::Received { text, time, sender } => format!(
                "{:>8} {} {}",
                time.dimmed(),
                format!("{}:", sender.username).magenta().bold(),
                text
            ),
        }
    }
}

/// Formats a message timestamp in `tz` using a strftime pattern.
pub fn format_time<Tz>(created_at: &DateTime<Utc>, tz: &Tz, pattern: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    created_at.with_timezone(tz).format(pattern).to_string()
}

/// Maps one message to its bubble.
///
/// `read_marker` is the newest message id the other participant has read;
/// only the sent message carrying exactly that id shows the receipt.
pub fn render_message<Tz>(
    message: &Message,
    other_user: &User,
    current_user: UserId,
    read_marker: Option<MessageId>,
    tz: &Tz,
    pattern: &str,
) -> Bubble
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let text = message.text.clone();
    let time = format_time(&message.created_at, tz, pattern);

    if message.sender_id != current_user {
        return Bubble::Received {
            text,
            time,
            sender: other_user.clone(),
        };
    }

    if read_marker == Some(message.id) {
        Bubble::SentAndRead {
            text,
            time,
            reader: other_user.clone(),
        }
    } else {
        Bubble::Sent { text, time }
    }
}

/// Renders every message of a conversation in order.
///
/// With `show_receipts` off no bubble carries the recipient's read marker.
pub fn render_conversation<Tz>(
    conversation: &Conversation,
    current_user: UserId,
    show_receipts: bool,
    tz: &Tz,
    pattern: &str,
) -> Vec<Bubble>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let read_marker = conversation
        .last_message_id_read_by_recipient
        .filter(|_| show_receipts);
    conversation
        .messages
        .iter()
        .map(|m| {
            render_message(
                m,
                &conversation.other_user,
                current_user,
                read_marker,
                tz,
                pattern,
            )
        })
        .collect()
}

/// Unread counter shown next to a conversation preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnreadBadge(usize);

impl UnreadBadge {
    /// Returns a badge for a positive count, `None` otherwise.
    pub fn for_count(count: usize) -> Option<Self> {
        (count > 0).then_some(Self(count))
    }

    /// Badge for a conversation's store-tracked counter.
    pub fn for_conversation(conversation: &Conversation) -> Option<Self> {
        Self::for_count(conversation.unread_messages)
    }

    pub fn count(self) -> usize {
        self.0
    }
}

impl fmt::Display for UnreadBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0)
    }
}

/// One-line preview for the conversation list: presence dot, name, badge, text.
pub fn preview_line(conversation: &Conversation) -> String {
    let dot = if conversation.other_user.online {
        "●".green()
    } else {
        "○".dimmed()
    };
    let badge = UnreadBadge::for_conversation(conversation)
        .map(|b| format!(" {}", b.to_string().blue().bold()))
        .unwrap_or_default();
    let preview = conversation.latest_message_text.as_deref().unwrap_or("");
    format!(
        "{} {}{} {}",
        dot,
        conversation.other_user.username.bold(),
        badge,
        preview.dimmed()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{conversation, message};
    use chrono::FixedOffset;

    const ME: UserId = 1;

    #[test]
    fn test_format_time_twelve_hour_without_leading_zero() {
        let ts: DateTime<Utc> = "2024-03-01T15:07:00Z".parse().unwrap();
        assert_eq!(format_time(&ts, &Utc, DEFAULT_TIME_FORMAT), "3:07");

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(format_time(&ts, &plus_two, DEFAULT_TIME_FORMAT), "5:07");
    }

    #[test]
    fn test_render_conversation_maps_each_kind() {
        let mut convo = conversation(
            Some(10),
            2,
            "santiago",
            vec![
                message(1, 2, "hello", Some(10)),
                message(2, ME, "hey", Some(10)),
                message(3, ME, "you there?", Some(10)),
            ],
        );
        convo.last_message_id_read_by_recipient = Some(2);

        let bubbles = render_conversation(&convo, ME, true, &Utc, DEFAULT_TIME_FORMAT);
        assert_eq!(bubbles.len(), 3);
        assert!(matches!(&bubbles[0], Bubble::Received { sender, .. } if sender.username == "santiago"));
        assert!(matches!(&bubbles[1], Bubble::SentAndRead { reader, .. } if reader.id == 2));
        assert!(matches!(&bubbles[2], Bubble::Sent { .. }));
        assert_eq!(bubbles[2].text(), "you there?");
        assert_eq!(bubbles[0].time(), "10:01");
    }

    #[test]
    fn test_received_message_never_shows_receipt() {
        let convo = conversation(Some(10), 2, "santiago", vec![message(1, 2, "hello", Some(10))]);
        let bubble = render_message(
            &convo.messages[0],
            &convo.other_user,
            ME,
            Some(1),
            &Utc,
            DEFAULT_TIME_FORMAT,
        );
        assert!(matches!(bubble, Bubble::Received { .. }));
    }

    #[test]
    fn test_badge_hidden_for_zero() {
        assert_eq!(UnreadBadge::for_count(0), None);
        let badge = UnreadBadge::for_count(4).unwrap();
        assert_eq!(badge.count(), 4);
        assert_eq!(badge.to_string(), "(4)");
    }

    #[test]
    fn test_preview_line_contains_name_and_badge() {
        colored::control::set_override(false);
        let mut convo = conversation(Some(10), 2, "santiago", vec![message(1, 2, "hello", Some(10))]);
        convo.unread_messages = 2;
        let line = preview_line(&convo);
        assert!(line.contains("santiago"));
        assert!(line.contains("(2)"));
        assert!(line.contains("hello"));
    }

    #[test]
    fn test_paint_includes_text() {
        colored::control::set_override(false);
        let bubble = Bubble::Sent {
            text: "hi".to_string(),
            time: "3:07".to_string(),
        };
        let painted = bubble.paint();
        assert!(painted.contains("you:"));
        assert!(painted.contains("hi"));
    }
}
