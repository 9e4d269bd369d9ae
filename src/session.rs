//! Chat session: the glue between gateway, store and event bridge.
//!
//! A [`ChatSession`] owns the [`ConversationStore`] for one signed-in user.
//! It hydrates the store from the API, keeps it live through the
//! [`EventBridge`], and sends the user's own actions back out.
//!
//! Network failures inside session operations are logged and swallowed;
//! the session keeps running with whatever state it has. Only
//! [`ChatSession::connect`] fails hard, because without a user or a signal
//! channel there is no session to run.
//!
//! # Read receipts
//!
//! While a conversation is active and has unread messages the session runs
//! the read flow once:
//!
//! ```text
//! Unread(n) --> MarkingRead --> Read
//!               zero the unread counter
//!               PUT /conversations {conversationId, lastReadMessageId}
//!               emit read-message
//! ```
//!
//! A failed PUT is logged and the flow still completes locally. If more
//! messages arrive while the flow is running it repeats for the newest one
//! before leaving `MarkingRead`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::bridge::{EventBridge, Subscription};
use crate::config::Config;
use crate::error::{MurmurError, Result};
use crate::gateway::{GatewayConfig, OutgoingMessage, RemoteGateway};
use crate::model::{Conversation, ConversationId, Message, User};
use crate::signals::websocket::WebSocketTransport;
use crate::signals::{NewMessage, PresenceChange, ReadMessage, Signal, SignalTransport};
use crate::store::ConversationStore;

/// Where a conversation is in the read-receipt flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// Unacknowledged messages are waiting.
    Unread(usize),
    /// The acknowledgement is in flight.
    MarkingRead,
    /// Nothing left to acknowledge.
    Read,
}

/// One signed-in user's live view of their conversations.
#[derive(Debug)]
pub struct ChatSession {
    user: User,
    gateway: RemoteGateway,
    store: Arc<ConversationStore>,
    bridge: EventBridge,
    active: Mutex<Option<String>>,
    marking: Mutex<HashSet<ConversationId>>,
    subscription: Mutex<Option<Subscription>>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ChatSession {
    /// Creates a session over an existing gateway and transport.
    pub fn new(user: User, gateway: RemoteGateway, transport: Arc<dyn SignalTransport>) -> Self {
        let store = Arc::new(ConversationStore::new(user.id));
        let bridge = EventBridge::new(Arc::clone(&store), transport);
        Self {
            user,
            gateway,
            store,
            bridge,
            active: Mutex::new(None),
            marking: Mutex::new(HashSet::new()),
            subscription: Mutex::new(None),
        }
    }

    /// Resolves the signed-in user and opens the signal channel.
    ///
    /// The returned session is not started yet; call [`ChatSession::start`].
    ///
    /// # Errors
    ///
    /// Fails if the gateway cannot be built, `GET /auth/user` fails, or the
    /// WebSocket handshake fails.
    pub async fn connect(config: &Config) -> Result<Self> {
        let gateway = RemoteGateway::new(GatewayConfig::from_config(config))?;
        let user = gateway.current_user().await?;

        let socket_url = config.socket_url()?;
        let transport =
            WebSocketTransport::connect(&socket_url, config.auth.token.as_deref()).await?;

        info!(user_id = user.id, username = %user.username, "Session connected");
        Ok(Self::new(user, gateway, Arc::new(transport)))
    }

    /// The signed-in user.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// The store this session keeps current.
    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Subscribes to signals, announces presence and loads conversations.
    pub async fn start(&self) {
        let subscription = self.bridge.subscribe();
        *lock(&self.subscription) = Some(subscription);

        let online = Signal::GoOnline(PresenceChange { id: self.user.id });
        if let Err(e) = self.bridge.emit(&online).await {
            warn!(error = %e, "Failed to announce presence");
        }

        self.load_conversations().await;
    }

    /// Replaces the store contents with `GET /conversations`.
    ///
    /// Returns false if the fetch failed; the store is then left as it was.
    pub async fn load_conversations(&self) -> bool {
        match self.gateway.fetch_conversations().await {
            Ok(conversations) => {
                self.store.replace(conversations);
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch conversations");
                false
            }
        }
    }

    /// Sends `text` to `recipient`.
    ///
    /// Starts a conversation when none with a server id exists yet. On
    /// success the store is updated and `new-message` is emitted.
    ///
    /// Returns the stored message, or `None` if the request failed.
    pub async fn post_message(&self, recipient: &User, text: &str) -> Option<Message> {
        let conversation_id = self
            .store
            .snapshot()
            .find_by_participant(recipient.id)
            .and_then(|c| c.id);

        let outgoing = OutgoingMessage {
            text: text.to_string(),
            recipient_id: recipient.id,
            conversation_id,
            sender: conversation_id.is_none().then(|| self.user.clone()),
        };

        let posted = match self.gateway.post_message(&outgoing).await {
            Ok(posted) => posted,
            Err(e) => {
                warn!(error = %e, recipient = %recipient.username, "Failed to send message");
                return None;
            }
        };

        match conversation_id {
            None => self
                .store
                .add_new_conversation(recipient.id, posted.message.clone()),
            Some(_) => self.store.add_message(posted.message.clone(), None),
        };

        let signal = Signal::NewMessage(NewMessage {
            message: posted.message.clone(),
            recipient_id: Some(recipient.id),
            sender: posted.sender,
        });
        if let Err(e) = self.bridge.emit(&signal).await {
            warn!(error = %e, "Failed to emit new-message");
        }

        Some(posted.message)
    }

    /// Sends `text` to the participant of the active conversation.
    ///
    /// # Errors
    ///
    /// Returns [`MurmurError::NoActiveConversation`] if nothing is open and
    /// [`MurmurError::ConversationNotFound`] if the active conversation has
    /// left the store.
    pub async fn post_to_active(&self, text: &str) -> Result<Option<Message>> {
        let username = self
            .active_username()
            .ok_or(MurmurError::NoActiveConversation)?;
        let recipient = self
            .store
            .snapshot()
            .find_by_username(&username)
            .map(|c| c.other_user.clone())
            .ok_or_else(|| MurmurError::ConversationNotFound(username.clone()))?;
        Ok(self.post_message(&recipient, text).await)
    }

    /// Makes the conversation with `username` the active one and
    /// acknowledges its unread messages.
    ///
    /// # Errors
    ///
    /// Returns [`MurmurError::ConversationNotFound`] if no conversation with
    /// that participant is in the store.
    pub async fn open_conversation(&self, username: &str) -> Result<Arc<Conversation>> {
        let conversation = self
            .store
            .snapshot()
            .find_by_username(username)
            .cloned()
            .ok_or_else(|| MurmurError::ConversationNotFound(username.to_string()))?;

        *lock(&self.active) = Some(username.to_string());
        debug!(username, conversation_id = ?conversation.id, "Opened conversation");

        self.acknowledge(&conversation).await;
        Ok(conversation)
    }

    /// Username of the active conversation's participant.
    pub fn active_username(&self) -> Option<String> {
        lock(&self.active).clone()
    }

    /// The active conversation as of the current snapshot.
    pub fn active_conversation(&self) -> Option<Arc<Conversation>> {
        let username = self.active_username()?;
        self.store.snapshot().find_by_username(&username).cloned()
    }

    /// Re-runs the read flow for the active conversation.
    ///
    /// Call after every store change so messages arriving in the open
    /// conversation are acknowledged.
    pub async fn sync_active(&self) {
        if let Some(conversation) = self.active_conversation() {
            self.acknowledge(&conversation).await;
        }
    }

    async fn acknowledge(&self, conversation: &Conversation) {
        let Some(conversation_id) = conversation.id else {
            return;
        };
        if conversation.unread_messages == 0 {
            return;
        }
        if !lock(&self.marking).insert(conversation_id) {
            return;
        }

        // Messages that land while the acknowledgement is in flight bump the
        // counter again and are picked up by the next pass.
        while let Some(last_id) = self.store.take_unread(conversation_id) {
            if let Err(e) = self.gateway.mark_read(conversation_id, last_id).await {
                warn!(error = %e, conversation_id, "Failed to persist read marker");
            }

            let receipt = Signal::ReadMessage(ReadMessage {
                conversation_id,
                read_user_id: self.user.id,
                last_read_message_id: last_id,
            });
            if let Err(e) = self.bridge.emit(&receipt).await {
                warn!(error = %e, conversation_id, "Failed to emit read-message");
            }
            debug!(conversation_id, last_read_message_id = last_id, "Acknowledged messages");
        }

        lock(&self.marking).remove(&conversation_id);
    }

    /// Where `conversation_id` is in the read-receipt flow.
    ///
    /// # Errors
    ///
    /// Returns [`MurmurError::ConversationNotFound`] for an unknown id.
    pub fn read_state(&self, conversation_id: ConversationId) -> Result<ReadState> {
        if lock(&self.marking).contains(&conversation_id) {
            return Ok(ReadState::MarkingRead);
        }
        let snapshot = self.store.snapshot();
        let conversation = snapshot
            .find(conversation_id)
            .ok_or_else(|| MurmurError::ConversationNotFound(conversation_id.to_string()))?;
        Ok(match conversation.unread_messages {
            0 => ReadState::Read,
            n => ReadState::Unread(n),
        })
    }

    /// Searches users and shows matches as ephemeral conversations.
    ///
    /// The signed-in user is never offered as a match. Returns the matches,
    /// or an empty list if the request failed.
    pub async fn search(&self, username: &str) -> Vec<User> {
        let users: Vec<User> = match self.gateway.search_users(username).await {
            Ok(users) => users
                .into_iter()
                .filter(|u| u.id != self.user.id)
                .collect(),
            Err(e) => {
                warn!(error = %e, query = %username, "User search failed");
                return Vec::new();
            }
        };
        self.store.merge_search_results(users.clone());
        users
    }

    /// Removes search placeholders from the store.
    pub fn clear_search(&self) {
        self.store.clear_ephemeral();
    }

    /// Announces logout, stops signal dispatch and closes the signal channel.
    pub async fn end(&self) {
        let logout = Signal::Logout(PresenceChange { id: self.user.id });
        if let Err(e) = self.bridge.emit(&logout).await {
            warn!(error = %e, "Failed to announce logout");
        }

        if let Err(e) = self.bridge.close().await {
            warn!(error = %e, "Failed to close signal channel");
        }
        let subscription = lock(&self.subscription).take();
        if let Some(subscription) = subscription {
            subscription.shutdown().await;
        }
        info!(user_id = self.user.id, "Session ended");
    }
}
