//! End-to-end session against an in-process DDP server.
//!
//! Run with logs: RUST_LOG=ddp_realtime=trace cargo test --test session

use std::sync::Arc;
use std::time::Duration;

use ddp_realtime::{CorrelationId, Frame, MessageKind, RealtimeClient, TransportError};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Helpers
// ============================================================================

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_test_writer()
        .try_init();
}

async fn reply(ws: &mut WebSocketStream<tokio::net::TcpStream>, frame: Frame) {
    let text = frame.to_json().expect("encode");
    ws.send(Message::Text(text.into())).await.expect("server send");
}

/// Serves one connection, answering like a minimal Rocket.Chat server.
///
/// Returns every frame the client sent, in order.
async fn serve(listener: TcpListener) -> Vec<Frame> {
    let (stream, _) = listener.accept().await.expect("accept");
    let mut ws = accept_async(stream).await.expect("handshake");
    let mut received = Vec::new();

    while let Some(Ok(message)) = ws.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let frame = Frame::from_json(&text).expect("client frame");
        received.push(frame.clone());

        match frame {
            Frame::Connect { .. } => {
                ws.send(Message::Text(r#"{"server_id":"0"}"#.into()))
                    .await
                    .expect("server send");
                reply(&mut ws, Frame::Connected { session: Some("session-1".into()) }).await;
                reply(&mut ws, Frame::Ping { id: Some("hb-1".into()) }).await;
            }
            Frame::Method { id, method, .. } if method == "login" => {
                // The session document is pushed before the method result.
                reply(
                    &mut ws,
                    Frame::Added {
                        collection: "users".into(),
                        id: "user-1".into(),
                        fields: json!({"username": "alice"}).as_object().cloned(),
                    },
                )
                .await;
                reply(
                    &mut ws,
                    Frame::Result {
                        id,
                        result: Some(json!({"id": "user-1", "token": "tok"})),
                        error: None,
                    },
                )
                .await;
            }
            Frame::Method { id, .. } => {
                reply(
                    &mut ws,
                    Frame::Result {
                        id,
                        result: Some(json!({"update": ["GENERAL"]})),
                        error: None,
                    },
                )
                .await;
            }
            Frame::Sub { id, name, params } => {
                reply(&mut ws, Frame::Ready { subs: vec![id] }).await;
                reply(
                    &mut ws,
                    Frame::Changed {
                        collection: name,
                        id: "id".into(),
                        fields: json!({"eventName": params[0], "args": [{"msg": "hello"}]})
                            .as_object()
                            .cloned(),
                        cleared: None,
                    },
                )
                .await;
            }
            Frame::Unsub { id } => reply(&mut ws, Frame::Nosub { id, error: None }).await,
            _ => {}
        }
    }

    received
}

async fn start() -> (String, JoinHandle<Vec<Frame>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    (format!("http://127.0.0.1:{port}/websocket"), tokio::spawn(serve(listener)))
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_full_session() {
    init_tracing();
    let (url, server) = start().await;

    let client = RealtimeClient::builder()
        .url(url)
        .connect()
        .await
        .expect("connect");
    assert_eq!(client.url().map(|u| u.scheme()), Some("ws"));

    let keep_alive = client.keep_alive();
    let banners = Arc::new(Mutex::new(Vec::new()));
    let errors = Arc::new(Mutex::new(Vec::new()));
    let hooks = client.subscribe(
        Some(Box::new({
            let banners = banners.clone();
            move |frame: Frame| {
                if frame.kind() == MessageKind::ServerId {
                    banners.lock().push(frame);
                }
            }
        })),
        Some(Box::new({
            let errors = errors.clone();
            move |error: TransportError| errors.lock().push(error)
        })),
        None,
    );

    let session = timeout(STEP_TIMEOUT, client.handshake())
        .await
        .expect("handshake in time")
        .expect("handshake");
    assert_eq!(session.as_deref(), Some("session-1"));

    let login: Vec<Frame> = timeout(
        STEP_TIMEOUT,
        client.login("alice", "secret").expect("login").collect(),
    )
    .await
    .expect("login in time");
    assert_eq!(login.len(), 2);
    assert_eq!(login[0].kind(), MessageKind::Result);
    assert_eq!(login[0].result_id(), Some("user-1"));
    assert_eq!(login[1].kind(), MessageKind::Added);
    assert_eq!(login[1].id(), Some("user-1"));

    let rooms = timeout(STEP_TIMEOUT, client.call("rooms/get", vec![json!({"$date": 0})]))
        .await
        .expect("call in time")
        .expect("rooms");
    assert_eq!(rooms["update"], json!(["GENERAL"]));

    let mut room = client.get_subscription("stream-room-messages", "GENERAL", false);
    let message = timeout(STEP_TIMEOUT, room.next())
        .await
        .expect("message in time")
        .expect("message");
    assert_eq!(message.collection(), Some("stream-room-messages"));
    assert_eq!(message.event_name(), Some("GENERAL"));
    let sub_id = room.id().clone();
    drop(room);

    client.disconnect().await;
    client.disconnect().await;
    keep_alive.await.expect("keep-alive ends with the stream");
    hooks.await.expect("hooks end with the stream");
    assert!(errors.lock().is_empty(), "transport errors: {:?}", errors.lock());
    assert_eq!(
        *banners.lock(),
        vec![Frame::ServerId {
            server_id: "0".into()
        }]
    );

    let received = timeout(STEP_TIMEOUT, server)
        .await
        .expect("server done")
        .expect("server task");

    let kinds: Vec<MessageKind> = received.iter().map(Frame::kind).collect();
    assert_eq!(kinds[0], MessageKind::Connect);
    assert!(received.contains(&Frame::pong(Some("hb-1".into()))));
    assert!(received.contains(&Frame::unsub(CorrelationId::new(sub_id.as_str()))));

    let sub_at = kinds.iter().position(|k| *k == MessageKind::Sub).expect("sub");
    let unsub_at = kinds.iter().position(|k| *k == MessageKind::Unsub).expect("unsub");
    assert!(sub_at < unsub_at);
    assert_eq!(kinds.iter().filter(|k| **k == MessageKind::Unsub).count(), 1);
}

#[tokio::test]
async fn test_connect_refused_is_an_error() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let err = RealtimeClient::connect(&format!("ws://127.0.0.1:{port}"))
        .await
        .unwrap_err();
    assert!(err.is_connection_error() || err.is_timeout());
}
