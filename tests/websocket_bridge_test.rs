//! End-to-end test of the signal path: a local WebSocket server pushes
//! frames through `WebSocketTransport` and the `EventBridge` into a
//! `ConversationStore`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message as Frame;
use url::Url;

use murmur::model::{Conversation, Message, User};
use murmur::signals::websocket::WebSocketTransport;
use murmur::signals::{PresenceChange, Signal, SignalTransport};
use murmur::{ConversationStore, EventBridge};

const ME: i64 = 1;

struct SignalServer {
    url: Url,
    auth_rx: oneshot::Receiver<Option<String>>,
    outbound_tx: mpsc::UnboundedSender<Frame>,
    inbound_rx: mpsc::UnboundedReceiver<String>,
}

/// Accepts one client. Frames sent on `outbound_tx` go to the client;
/// text frames from the client arrive on `inbound_rx`, which closes when the
/// client does.
async fn start_server() -> SignalServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (auth_tx, auth_rx) = oneshot::channel();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Frame>();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let auth = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let _ = auth_tx.send(auth);
            Ok(resp)
        };
        let ws = tokio_tungstenite::accept_hdr_async(stream, callback)
            .await
            .unwrap();
        let (mut sink, mut source) = ws.split();

        loop {
            tokio::select! {
                frame = outbound_rx.recv() => match frame {
                    Some(frame) => {
                        let closing = matches!(frame, Frame::Close(_));
                        if sink.send(frame).await.is_err() || closing {
                            break;
                        }
                    }
                    None => break,
                },
                incoming = source.next() => match incoming {
                    Some(Ok(Frame::Text(text))) => {
                        let _ = inbound_tx.send(text);
                    }
                    Some(Ok(Frame::Close(_))) => break,
                    Some(Ok(_)) => {}
                    _ => break,
                },
            }
        }
    });

    SignalServer {
        url: Url::parse(&format!("ws://{}/signals", addr)).unwrap(),
        auth_rx,
        outbound_tx,
        inbound_rx,
    }
}

fn seeded_store() -> Arc<ConversationStore> {
    let store = Arc::new(ConversationStore::new(ME));
    store.replace(vec![Conversation {
        id: Some(10),
        other_user: User::new(2, "santiago"),
        messages: vec![Message {
            id: 1,
            sender_id: ME,
            text: "hi".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            conversation_id: Some(10),
        }],
        latest_message_text: Some("hi".to_string()),
        unread_messages: 0,
        last_read_message_id: None,
        last_message_id_read_by_recipient: None,
    }]);
    store
}

async fn wait_until<F>(store: &ConversationStore, done: F)
where
    F: Fn(&murmur::Snapshot) -> bool,
{
    let mut rx = store.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if done(&*rx.borrow_and_update()) {
                return;
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("store never reached the expected state");
}

#[tokio::test]
async fn test_signals_flow_from_socket_into_store() {
    let mut server = start_server().await;
    let transport = WebSocketTransport::connect(&server.url, Some("tok-123"))
        .await
        .unwrap();
    assert_eq!(
        (&mut server.auth_rx).await.unwrap().as_deref(),
        Some("Bearer tok-123")
    );

    let store = seeded_store();
    let bridge = EventBridge::new(Arc::clone(&store), Arc::new(transport));
    let _subscription = bridge.subscribe();

    let frames = [
        r#"{"event":"add-online-user","data":{"id":2}}"#,
        r#"{"event":"new-message","data":{"message":{"id":2,"senderId":2,"text":"hello back","createdAt":"2024-03-01T10:05:00Z","conversationId":10},"recipientId":1,"sender":null}}"#,
        "this frame is not json",
        r#"{"event":"read-message","data":{"conversationId":10,"readUserId":2,"lastReadMessageId":1}}"#,
    ];
    for frame in frames {
        server
            .outbound_tx
            .send(Frame::Text(frame.to_string()))
            .unwrap();
    }

    wait_until(&store, |snap| {
        snap.find(10)
            .is_some_and(|c| c.last_message_id_read_by_recipient == Some(1))
    })
    .await;

    let snapshot = store.snapshot();
    let conversation = snapshot.find(10).unwrap();
    assert!(conversation.other_user.online);
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.unread_messages, 1);
    assert_eq!(conversation.latest_message_text.as_deref(), Some("hello back"));
}

#[tokio::test]
async fn test_emit_reaches_server() {
    let mut server = start_server().await;
    let transport = WebSocketTransport::connect(&server.url, None).await.unwrap();
    assert_eq!((&mut server.auth_rx).await.unwrap(), None);

    let bridge = EventBridge::new(seeded_store(), Arc::new(transport));
    bridge
        .emit(&Signal::GoOnline(PresenceChange { id: ME }))
        .await
        .unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(5), server.inbound_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        Signal::decode(&frame).unwrap(),
        Signal::GoOnline(PresenceChange { id: ME })
    );
}

#[tokio::test]
async fn test_server_close_ends_subscription() {
    let server = start_server().await;
    let transport = WebSocketTransport::connect(&server.url, None).await.unwrap();
    let bridge = EventBridge::new(seeded_store(), Arc::new(transport));
    let subscription = bridge.subscribe();
    assert!(subscription.is_active());

    server.outbound_tx.send(Frame::Close(None)).unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while subscription.is_active() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("subscription kept running after the server closed");
}

#[tokio::test]
async fn test_client_close_reaches_server() {
    let mut server = start_server().await;
    let transport = WebSocketTransport::connect(&server.url, None).await.unwrap();

    transport.close().await.unwrap();

    let after_close = tokio::time::timeout(Duration::from_secs(5), server.inbound_rx.recv())
        .await
        .expect("server never saw the close");
    assert!(after_close.is_none());

    let mut frames = transport.receive();
    let ended = tokio::time::timeout(Duration::from_secs(5), frames.next())
        .await
        .expect("inbound stream kept running after close");
    assert!(ended.is_none());
}
