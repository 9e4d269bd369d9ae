//! Conversation store
//!
//! [`ConversationStore`] owns the signed-in user's conversation list as an
//! immutable [`Snapshot`]. Mutations go through the pure functions in
//! [`transform`]; a mutation that produces a new snapshot is published to
//! every [`tokio::sync::watch`] subscriber, and one that changes nothing is
//! not. Observers detect change by comparing snapshots with
//! [`Snapshot::ptr_eq`] or individual conversations with [`Arc::ptr_eq`].
//!
//! # Example
//!
//! ```
//! use murmur::model::{Message, User};
//! use murmur::store::ConversationStore;
//!
//! let store = ConversationStore::new(1);
//! let message = Message {
//!     id: 1,
//!     sender_id: 2,
//!     text: "hi".to_string(),
//!     created_at: chrono::Utc::now(),
//!     conversation_id: Some(10),
//! };
//! store.add_message(message, Some(User::new(2, "santiago")));
//!
//! let snapshot = store.snapshot();
//! assert_eq!(snapshot.len(), 1);
//! assert_eq!(snapshot.find(10).unwrap().unread_messages, 1);
//! ```

pub mod transform;
pub mod unread;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::model::{Conversation, ConversationId, Message, MessageId, User, UserId};

pub use unread::derived_unread;

/// Immutable, cheaply clonable view of the ordered conversation list.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    conversations: Arc<Vec<Arc<Conversation>>>,
}

impl Snapshot {
    /// Wraps owned conversations in a new snapshot.
    pub fn new(conversations: Vec<Conversation>) -> Self {
        Self::from_arcs(conversations.into_iter().map(Arc::new).collect())
    }

    pub(crate) fn from_arcs(conversations: Vec<Arc<Conversation>>) -> Self {
        Self {
            conversations: Arc::new(conversations),
        }
    }

    /// Conversations in display order.
    pub fn conversations(&self) -> &[Arc<Conversation>] {
        &self.conversations
    }

    /// Iterates conversations in display order.
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Conversation>> {
        self.conversations.iter()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Returns true when both snapshots are the same allocation.
    pub fn ptr_eq(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.conversations, &other.conversations)
    }

    /// Finds a conversation by server id.
    pub fn find(&self, conversation_id: ConversationId) -> Option<&Arc<Conversation>> {
        self.iter().find(|c| c.id == Some(conversation_id))
    }

    /// Finds the conversation with the participant named `username`.
    pub fn find_by_username(&self, username: &str) -> Option<&Arc<Conversation>> {
        self.iter().find(|c| c.other_user.username == username)
    }

    /// Finds the conversation with the participant `user_id`.
    pub fn find_by_participant(&self, user_id: UserId) -> Option<&Arc<Conversation>> {
        self.iter().find(|c| c.other_user.id == user_id)
    }

    /// Total unread messages across all conversations.
    pub fn total_unread(&self) -> usize {
        self.iter().map(|c| c.unread_messages).sum()
    }

    /// Copies conversations matching `pred`, applies `update` to each copy,
    /// and shares the rest. Returns `self` when nothing matches.
    pub(crate) fn update_where<P, U>(&self, pred: P, mut update: U) -> Snapshot
    where
        P: Fn(&Conversation) -> bool,
        U: FnMut(&mut Conversation),
    {
        let mut changed = false;
        let next: Vec<Arc<Conversation>> = self
            .iter()
            .map(|convo| {
                if pred(convo) {
                    changed = true;
                    let mut copy = Conversation::clone(convo);
                    update(&mut copy);
                    Arc::new(copy)
                } else {
                    Arc::clone(convo)
                }
            })
            .collect();

        if changed {
            Snapshot::from_arcs(next)
        } else {
            self.clone()
        }
    }
}

/// Owned store of the signed-in user's conversations.
///
/// Shared as `Arc<ConversationStore>` between the session and the signal
/// dispatch task. Writes are serialized by the watch channel; every
/// operation returns whether it produced a new snapshot.
#[derive(Debug)]
pub struct ConversationStore {
    current_user: UserId,
    state: watch::Sender<Snapshot>,
}

impl ConversationStore {
    /// Creates an empty store for the signed-in user.
    pub fn new(current_user: UserId) -> Self {
        let (state, _) = watch::channel(Snapshot::default());
        Self {
            current_user,
            state,
        }
    }

    /// Id of the signed-in user.
    pub fn current_user(&self) -> UserId {
        self.current_user
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    /// Receiver notified each time a mutation produces a new snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state.subscribe()
    }

    fn apply<F>(&self, op: &'static str, transform: F) -> bool
    where
        F: FnOnce(&Snapshot) -> Snapshot,
    {
        let changed = self.state.send_if_modified(|current| {
            let next = transform(current);
            if next.ptr_eq(current) {
                false
            } else {
                *current = next;
                true
            }
        });
        debug!(op, changed, "Applied store transform");
        changed
    }

    /// Replaces the whole list with a fresh fetch.
    pub fn replace(&self, conversations: Vec<Conversation>) -> bool {
        self.apply("replace", |_| transform::hydrate(conversations))
    }

    /// See [`transform::add_message`].
    pub fn add_message(&self, message: Message, new_sender: Option<User>) -> bool {
        let me = self.current_user;
        self.apply("add_message", |s| {
            transform::add_message(s, me, message, new_sender)
        })
    }

    /// See [`transform::add_new_conversation`].
    pub fn add_new_conversation(&self, recipient_id: UserId, message: Message) -> bool {
        self.apply("add_new_conversation", |s| {
            transform::add_new_conversation(s, recipient_id, message)
        })
    }

    /// See [`transform::mark_conversation_read`].
    pub fn mark_conversation_read(&self, conversation_id: ConversationId) -> bool {
        self.apply("mark_conversation_read", |s| {
            transform::mark_conversation_read(s, conversation_id)
        })
    }

    /// Zeroes the unread counter of `conversation_id` and returns the id of
    /// its newest message, or `None` if nothing was unread.
    ///
    /// The id is read and the counter zeroed in the same write.
    pub fn take_unread(&self, conversation_id: ConversationId) -> Option<MessageId> {
        let mut taken = None;
        self.apply("take_unread", |s| {
            taken = s
                .find(conversation_id)
                .filter(|c| c.unread_messages > 0)
                .and_then(|c| c.last_message())
                .map(|m| m.id);
            match taken {
                Some(_) => transform::mark_conversation_read(s, conversation_id),
                None => s.clone(),
            }
        });
        taken
    }

    /// See [`transform::record_read_receipt`].
    pub fn record_read_receipt(
        &self,
        conversation_id: ConversationId,
        last_read_message_id: MessageId,
        read_by_user_id: UserId,
    ) -> bool {
        let me = self.current_user;
        self.apply("record_read_receipt", |s| {
            transform::record_read_receipt(
                s,
                me,
                conversation_id,
                last_read_message_id,
                read_by_user_id,
            )
        })
    }

    /// See [`transform::set_presence`].
    pub fn set_presence(&self, user_id: UserId, online: bool) -> bool {
        self.apply("set_presence", |s| transform::set_presence(s, user_id, online))
    }

    /// See [`transform::merge_search_results`].
    pub fn merge_search_results(&self, users: Vec<User>) -> bool {
        self.apply("merge_search_results", |s| {
            transform::merge_search_results(s, users)
        })
    }

    /// See [`transform::clear_ephemeral`].
    pub fn clear_ephemeral(&self) -> bool {
        self.apply("clear_ephemeral", transform::clear_ephemeral)
    }
}
