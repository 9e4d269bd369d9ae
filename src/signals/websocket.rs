//! WebSocket signal transport
//!
//! [`WebSocketTransport`] carries one signal per WebSocket text frame. On
//! connect it splits the socket: a background reader task forwards inbound
//! text frames to an unbounded channel exposed through
//! [`SignalTransport::receive`], and writes go through the sink half behind
//! an async mutex. Ping/pong and binary frames are ignored; a close frame or
//! read error ends the inbound stream.
//!
//! The bearer token, when configured, is sent as an `Authorization` header
//! on the upgrade request.

use std::pin::Pin;
use std::sync::Arc;

use futures::stream::SplitSink;
use futures::{SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{MurmurError, Result};
use crate::signals::SignalTransport;

type FrameSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Frame>;

/// Signal transport over a client WebSocket connection.
pub struct WebSocketTransport {
    url: Url,
    sink: Mutex<FrameSink>,
    inbound_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    reader: JoinHandle<()>,
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("url", &self.url.as_str())
            .field("reader_finished", &self.reader.is_finished())
            .finish()
    }
}

impl WebSocketTransport {
    /// Opens the signal channel at `url`.
    ///
    /// # Arguments
    ///
    /// * `url` - `ws://` or `wss://` endpoint of the signal server
    /// * `token` - Optional bearer token for the upgrade request
    ///
    /// # Errors
    ///
    /// Returns [`MurmurError::WebSocket`] if the handshake fails and
    /// [`MurmurError::Config`] if the token is not a valid header value.
    pub async fn connect(url: &Url, token: Option<&str>) -> Result<Self> {
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(MurmurError::from)?;

        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| MurmurError::Config(format!("Invalid auth token: {}", e)))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (stream, response) = connect_async(request).await.map_err(MurmurError::from)?;
        info!(url = %url, status = %response.status(), "Signal channel connected");

        let (sink, mut source) = stream.split();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        let reader_url = url.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Frame::Text(text)) => {
                        if inbound_tx.send(text).is_err() {
                            break;
                        }
                    }
                    Ok(Frame::Close(reason)) => {
                        debug!(url = %reader_url, ?reason, "Signal channel closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(url = %reader_url, error = %e, "Signal channel read failed");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            url: url.clone(),
            sink: Mutex::new(sink),
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            reader,
        })
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait::async_trait]
impl SignalTransport for WebSocketTransport {
    async fn send(&self, frame: String) -> Result<()> {
        self.sink
            .lock()
            .await
            .send(Frame::Text(frame))
            .await
            .map_err(|e| MurmurError::Transport(format!("send to {} failed: {}", self.url, e)).into())
    }

    async fn close(&self) -> Result<()> {
        let result = self.sink.lock().await.send(Frame::Close(None)).await;
        self.reader.abort();
        debug!(url = %self.url, "Signal channel closed");
        result.map_err(|e| MurmurError::Transport(format!("close failed: {}", e)).into())
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
}
