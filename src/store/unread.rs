//! Unread-count derivation from read markers.
//!
//! The conversation listing carries the signed-in user's read marker rather
//! than a counter. [`derived_unread`] turns that marker into a count once, at
//! hydration; from then on the store-tracked counter is authoritative.

use crate::model::Conversation;

/// Counts messages from the other participant newer than the read marker.
///
/// Without a marker every message from the other participant is unread.
pub fn derived_unread(conversation: &Conversation) -> usize {
    let other = conversation.other_user.id;
    conversation
        .messages
        .iter()
        .filter(|m| m.sender_id == other)
        .filter(|m| match conversation.last_read_message_id {
            Some(marker) => m.id > marker,
            None => true,
        })
        .count()
}
