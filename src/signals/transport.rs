//! Signal transport abstraction
//!
//! The [`SignalTransport`] trait is the seam between the event bridge and
//! the wire. Concrete implementations:
//!
//! - [`crate::signals::websocket::WebSocketTransport`] -- text frames over a
//!   WebSocket connection.
//! - `crate::signals::fake::FakeTransport` -- in-process channels used in
//!   tests (cfg(test) only).
//!
//! Callers `send` one encoded signal frame, `receive` a stream of inbound
//! frames in delivery order, and `close` when done. Framing and connection management belong to the
//! implementation.

use std::pin::Pin;

use futures::Stream;

use crate::error::Result;

/// Abstraction over real-time signal transports.
///
/// Used polymorphically as `Arc<dyn SignalTransport>`.
#[async_trait::async_trait]
pub trait SignalTransport: Send + Sync + std::fmt::Debug {
    /// Send one complete signal frame to the server.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MurmurError::Transport`] if the connection is
    /// closed or the write fails.
    async fn send(&self, frame: String) -> Result<()>;

    /// Returns the stream of inbound signal frames.
    ///
    /// Frames arrive in the order the server delivered them. The stream ends
    /// when the connection closes.
    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>>;

    /// Closes the connection. Later `send` calls fail and the inbound
    /// stream ends.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MurmurError::Transport`] if the close cannot
    /// be delivered.
    async fn close(&self) -> Result<()>;
}
