//! In-process fake signal transport for tests
//!
//! [`FakeTransport::new`] returns a `(FakeTransport, FakeTransportHandle)`
//! pair. Wire the transport into the code under test; from the test side:
//!
//! - read what the client emitted: `handle.outbound_rx.recv().await`
//! - deliver a server signal: `handle.inbound_tx.send(frame)` or
//!   [`FakeTransport::deliver`]
//!
//! ```text
//! client send() -----> outbound_tx -----> outbound_rx (handle reads)
//! handle inbound_tx -> inbound channel -> receive()   (client reads)
//! ```

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::Stream;
use tokio::sync::{mpsc, Mutex};

use crate::error::{MurmurError, Result};
use crate::signals::{Signal, SignalTransport};

/// In-process transport backed by unbounded channels.
#[derive(Debug)]
pub struct FakeTransport {
    outbound_tx: mpsc::UnboundedSender<String>,
    inbound_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    inbound_inject_tx: mpsc::UnboundedSender<String>,
    closed: AtomicBool,
}

impl FakeTransport {
    /// Create a new `(FakeTransport, FakeTransportHandle)` pair.
    pub fn new() -> (Self, FakeTransportHandle) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        let transport = Self {
            outbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            inbound_inject_tx: inbound_tx.clone(),
            closed: AtomicBool::new(false),
        };

        let handle = FakeTransportHandle {
            outbound_rx,
            inbound_tx,
        };

        (transport, handle)
    }

    /// Encode `signal` and push it onto the inbound channel.
    ///
    /// # Panics
    ///
    /// Panics if the signal cannot be encoded or the channel is closed.
    pub fn deliver(&self, signal: &Signal) {
        let frame = signal.encode().expect("FakeTransport: failed to encode signal");
        self.inbound_inject_tx
            .send(frame)
            .expect("FakeTransport: inbound channel closed before deliver");
    }

    /// Whether [`SignalTransport::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// The test-side handle for a [`FakeTransport`].
#[derive(Debug)]
pub struct FakeTransportHandle {
    /// Frames the client sent via [`SignalTransport::send`].
    pub outbound_rx: mpsc::UnboundedReceiver<String>,
    /// Frames pushed here appear on [`SignalTransport::receive`].
    pub inbound_tx: mpsc::UnboundedSender<String>,
}

impl FakeTransportHandle {
    /// Waits for the next outbound frame and decodes it.
    ///
    /// # Panics
    ///
    /// Panics on timeout, closed channel, or an undecodable frame.
    pub async fn next_outbound(&mut self) -> Signal {
        let frame = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            self.outbound_rx.recv(),
        )
        .await
        .expect("timed out waiting for outbound frame")
        .expect("outbound channel closed");
        Signal::decode(&frame).expect("outbound frame must decode")
    }
}

#[async_trait::async_trait]
impl SignalTransport for FakeTransport {
    async fn send(&self, frame: String) -> Result<()> {
        if self.is_closed() {
            return Err(MurmurError::Transport("FakeTransport is closed".to_string()).into());
        }
        self.outbound_tx.send(frame).map_err(|e| {
            anyhow::anyhow!(MurmurError::Transport(format!(
                "FakeTransport outbound channel closed: {}",
                e
            )))
        })
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        let rx = Arc::clone(&self.inbound_rx);
        Box::pin(futures::stream::unfold(rx, |rx| async move {
            let mut guard = rx.lock().await;
            let item = guard.recv().await?;
            drop(guard);
            Some((item, rx))
        }))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::PresenceChange;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_send_delivers_to_handle_outbound_rx() {
        let (transport, mut handle) = FakeTransport::new();
        transport.send("frame".to_string()).await.unwrap();
        assert_eq!(handle.outbound_rx.recv().await.unwrap(), "frame");
    }

    #[tokio::test]
    async fn test_deliver_round_trips_through_receive() {
        let (transport, _handle) = FakeTransport::new();
        transport.deliver(&Signal::AddOnlineUser(PresenceChange { id: 3 }));

        let mut stream = transport.receive();
        let frame = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("timed out")
            .expect("stream ended");
        assert_eq!(
            Signal::decode(&frame).unwrap(),
            Signal::AddOnlineUser(PresenceChange { id: 3 })
        );
    }

    #[tokio::test]
    async fn test_send_fails_when_handle_dropped() {
        let (transport, handle) = FakeTransport::new();
        drop(handle);
        assert!(transport.send("x".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn test_send_fails_after_close() {
        let (transport, _handle) = FakeTransport::new();
        transport.close().await.unwrap();
        assert!(transport.is_closed());
        assert!(transport.send("x".to_string()).await.is_err());
    }

    #[test]
    fn test_fake_transport_is_object_safe() {
        let (transport, _handle) = FakeTransport::new();
        let _boxed: Box<dyn SignalTransport> = Box::new(transport);
    }
}
