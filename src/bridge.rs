//! Event bridge between the signal transport and the conversation store.
//!
//! Each inbound signal maps onto exactly one store operation:
//!
//! | Signal                | Store operation                     |
//! |-----------------------|-------------------------------------|
//! | `add-online-user`     | `set_presence(id, true)`            |
//! | `remove-offline-user` | `set_presence(id, false)`           |
//! | `new-message`         | `add_message(message, sender)`      |
//! | `read-message`        | `record_read_receipt(...)`          |
//!
//! [`EventBridge::subscribe`] starts a single dispatch task that applies
//! frames in delivery order and hands back a [`Subscription`]. Dropping the
//! handle stops the task. A second `subscribe` aborts the first task before
//! the new one can deliver anything twice.

use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::signals::{Signal, SignalTransport};
use crate::store::ConversationStore;

/// What a dispatched signal did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The store published a new snapshot.
    Applied,
    /// The operation matched nothing (unknown conversation, own receipt, ...).
    Unchanged,
    /// The signal has no inbound meaning and was skipped.
    Ignored,
}

/// Applies one signal to the store.
pub fn dispatch(store: &ConversationStore, signal: Signal) -> Dispatch {
    if signal.is_outbound_only() {
        return Dispatch::Ignored;
    }

    let changed = match signal {
        Signal::AddOnlineUser(p) => store.set_presence(p.id, true),
        Signal::RemoveOfflineUser(p) => store.set_presence(p.id, false),
        Signal::NewMessage(p) => store.add_message(p.message, p.sender),
        Signal::ReadMessage(r) => {
            store.record_read_receipt(r.conversation_id, r.last_read_message_id, r.read_user_id)
        }
        Signal::GoOnline(_) | Signal::Logout(_) => false,
    };

    if changed {
        Dispatch::Applied
    } else {
        Dispatch::Unchanged
    }
}

/// Decodes one inbound frame and dispatches it.
///
/// # Errors
///
/// Returns [`crate::error::MurmurError::SignalCodec`] if the frame does not decode.
pub fn process_frame(store: &ConversationStore, frame: &str) -> Result<Dispatch> {
    let signal = Signal::decode(frame)?;
    let event = signal.name();
    let outcome = dispatch(store, signal);
    debug!(event, ?outcome, "Dispatched signal");
    Ok(outcome)
}

/// Handle for a running dispatch task. Dropping it stops the task.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Returns true while the dispatch task is running.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops the dispatch task and waits until it has exited.
    pub async fn shutdown(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Connects a [`SignalTransport`] to a [`ConversationStore`].
#[derive(Debug)]
pub struct EventBridge {
    store: Arc<ConversationStore>,
    transport: Arc<dyn SignalTransport>,
    active: Mutex<Option<AbortHandle>>,
}

impl EventBridge {
    pub fn new(store: Arc<ConversationStore>, transport: Arc<dyn SignalTransport>) -> Self {
        Self {
            store,
            transport,
            active: Mutex::new(None),
        }
    }

    /// Starts dispatching inbound signals, replacing any earlier subscription.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe(&self) -> Subscription {
        let store = Arc::clone(&self.store);
        let transport = Arc::clone(&self.transport);

        let task = tokio::spawn(async move {
            let mut frames = transport.receive();
            while let Some(frame) = frames.next().await {
                if let Err(e) = process_frame(&store, &frame) {
                    warn!(error = %e, "Skipping undecodable signal frame");
                }
            }
            info!("Signal stream ended");
        });

        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = active.replace(task.abort_handle()) {
            previous.abort();
            debug!("Replaced previous signal subscription");
        }

        Subscription { task }
    }

    /// Stops the current subscription and closes the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to close cleanly; dispatch is
    /// stopped either way.
    pub async fn close(&self) -> Result<()> {
        let handle = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            debug!("Signal subscription stopped");
        }
        self.transport.close().await
    }

    /// Encodes and sends an outbound signal.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the transport rejects the frame.
    pub async fn emit(&self, signal: &Signal) -> Result<()> {
        let frame = signal.encode()?;
        self.transport.send(frame).await?;
        debug!(event = signal.name(), "Emitted signal");
        Ok(())
    }
}
