//! Pure transforms over conversation snapshots.
//!
//! Every function takes a snapshot by reference and returns the next one.
//! Conversations that do not change are shared with the input; when nothing
//! changes the input snapshot itself is returned, so `Snapshot::ptr_eq`
//! tells callers whether anything happened.

use std::collections::HashSet;
use std::sync::Arc;

use super::unread::derived_unread;
use super::Snapshot;
use crate::model::{Conversation, ConversationId, Message, MessageId, User, UserId};

/// Builds the initial snapshot from a full fetch, seeding unread counters.
pub fn hydrate(conversations: Vec<Conversation>) -> Snapshot {
    Snapshot::from_arcs(
        conversations
            .into_iter()
            .map(|mut convo| {
                convo.unread_messages = derived_unread(&convo);
                Arc::new(convo)
            })
            .collect(),
    )
}

/// Appends an inbound or echoed message.
///
/// With `new_sender` the message starts a brand-new conversation at the front
/// of the list. Otherwise it is appended to the conversation named by
/// `message.conversation_id`; the unread counter only moves for messages not
/// authored by `current_user`. Unknown conversations leave the snapshot as is.
pub fn add_message(
    snapshot: &Snapshot,
    current_user: UserId,
    message: Message,
    new_sender: Option<User>,
) -> Snapshot {
    if let Some(sender) = new_sender {
        let mut next = Vec::with_capacity(snapshot.len() + 1);
        next.push(Arc::new(Conversation::started_by(sender, message)));
        next.extend(snapshot.iter().cloned());
        return Snapshot::from_arcs(next);
    }

    let Some(conversation_id) = message.conversation_id else {
        return snapshot.clone();
    };

    snapshot.update_where(
        |c| c.id == Some(conversation_id),
        |c| {
            if message.sender_id != current_user {
                c.unread_messages += 1;
            }
            c.push_message(message.clone());
        },
    )
}

/// Records the first message sent by the signed-in user to `recipient_id`.
///
/// The matching conversation (usually ephemeral) adopts the message's
/// conversation id and starts with nothing unread.
pub fn add_new_conversation(snapshot: &Snapshot, recipient_id: UserId, message: Message) -> Snapshot {
    snapshot.update_where(
        |c| c.other_user.id == recipient_id,
        |c| {
            c.id = message.conversation_id;
            c.unread_messages = 0;
            c.push_message(message.clone());
        },
    )
}

/// Zeroes the unread counter of a conversation if it is positive.
pub fn mark_conversation_read(snapshot: &Snapshot, conversation_id: ConversationId) -> Snapshot {
    snapshot.update_where(
        |c| c.id == Some(conversation_id) && c.unread_messages > 0,
        |c| c.unread_messages = 0,
    )
}

/// Moves the "read by recipient" marker, ignoring the user's own read events.
pub fn record_read_receipt(
    snapshot: &Snapshot,
    current_user: UserId,
    conversation_id: ConversationId,
    last_read_message_id: MessageId,
    read_by_user_id: UserId,
) -> Snapshot {
    if read_by_user_id == current_user {
        return snapshot.clone();
    }

    snapshot.update_where(
        |c| {
            c.id == Some(conversation_id)
                && c.last_message_id_read_by_recipient != Some(last_read_message_id)
        },
        |c| c.last_message_id_read_by_recipient = Some(last_read_message_id),
    )
}

/// Sets the participant's presence flag in every conversation with them.
pub fn set_presence(snapshot: &Snapshot, user_id: UserId, online: bool) -> Snapshot {
    snapshot.update_where(
        |c| c.other_user.id == user_id && c.other_user.online != online,
        |c| c.other_user.online = online,
    )
}

/// Appends an ephemeral conversation for each user not already present.
pub fn merge_search_results(snapshot: &Snapshot, users: Vec<User>) -> Snapshot {
    let mut present: HashSet<UserId> = snapshot.iter().map(|c| c.other_user.id).collect();

    let additions: Vec<Arc<Conversation>> = users
        .into_iter()
        .filter(|u| present.insert(u.id))
        .map(|u| Arc::new(Conversation::ephemeral(u)))
        .collect();

    if additions.is_empty() {
        return snapshot.clone();
    }

    let mut next = Vec::with_capacity(snapshot.len() + additions.len());
    next.extend(snapshot.iter().cloned());
    next.extend(additions);
    Snapshot::from_arcs(next)
}

/// Drops every conversation that has no server id.
pub fn clear_ephemeral(snapshot: &Snapshot) -> Snapshot {
    if !snapshot.iter().any(|c| c.is_ephemeral()) {
        return snapshot.clone();
    }

    Snapshot::from_arcs(
        snapshot
            .iter()
            .filter(|c| !c.is_ephemeral())
            .cloned()
            .collect(),
    )
}
