//! Integration tests for the authentication gate and session lifecycle.
//!
//! Verifies:
//! 1. A valid bearer token is acknowledged and the session admitted.
//! 2. Invalid tokens, unknown users, and wrong first frames are rejected
//!    with an error and a close, never an admission.
//! 3. A silent connection is rejected once the credential deadline passes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;

use pairchat_proto::event::ClientEvent;
use pairchat_proto::user::{UserId, UserRef};
use pairchat_proto::wire::{self, ClientFrame, ServerFrame};
use pairchat_server::auth;
use pairchat_server::directory::InMemoryDirectory;
use pairchat_server::server::{self, AppState};
use pairchat_server::store::InMemoryStore;

const SECRET: &[u8] = b"lifecycle-test-secret";

type WsClient =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Helper: start a server with alice and bob registered.
async fn start_test_server() -> (SocketAddr, Arc<AppState<InMemoryDirectory, InMemoryStore>>) {
    let directory = InMemoryDirectory::new();
    directory.add_user("U-alice", "alice").await;
    directory.add_user("U-bob", "bob").await;

    let state = Arc::new(AppState::new(
        directory,
        InMemoryStore::new(),
        SECRET.to_vec(),
        Duration::from_millis(500),
    ));
    let (addr, _handle) = server::start_server("127.0.0.1:0", Arc::clone(&state))
        .await
        .unwrap();
    (addr, state)
}

/// Helper: open a WebSocket connection without authenticating.
async fn connect(addr: SocketAddr) -> WsClient {
    let url = format!("ws://{addr}/ws");
    let (ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    ws
}

/// Helper: send a client frame.
async fn send_client_frame(ws: &mut WsClient, frame: &ClientFrame) {
    let bytes = wire::encode_client(frame).unwrap();
    ws.send(tungstenite::Message::Binary(bytes.into()))
        .await
        .unwrap();
}

/// Helper: receive a server frame, with a timeout guard.
async fn recv_frame(ws: &mut WsClient) -> ServerFrame {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    wire::decode_server(&msg.into_data()).unwrap()
}

#[tokio::test]
async fn valid_token_is_acknowledged() {
    let (addr, _state) = start_test_server().await;
    let mut ws = connect(addr).await;

    let token = auth::issue_token(SECRET, "U-alice", 60).unwrap();
    send_client_frame(&mut ws, &ClientFrame::Authenticate { token }).await;

    let ack = recv_frame(&mut ws).await;
    assert_eq!(
        ack,
        ServerFrame::Authenticated {
            user: UserRef::new("U-alice", "alice"),
        }
    );
}

#[tokio::test]
async fn invalid_token_is_rejected_and_closed() {
    let (addr, state) = start_test_server().await;
    let mut ws = connect(addr).await;

    send_client_frame(
        &mut ws,
        &ClientFrame::Authenticate {
            token: "not-a-real-token".into(),
        },
    )
    .await;

    let frame = recv_frame(&mut ws).await;
    match frame {
        ServerFrame::Error { reason } => assert!(reason.contains("invalid token"), "got: {reason}"),
        other => panic!("expected Error, got {other:?}"),
    }

    // The connection is closed and the user was never admitted.
    let next = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .unwrap();
    assert!(!matches!(
        next,
        Some(Ok(tungstenite::Message::Binary(_)))
    ));
    assert!(state.registry.lookup(&UserId::new("U-alice")).await.is_none());
}

#[tokio::test]
async fn token_for_unknown_user_is_rejected() {
    let (addr, state) = start_test_server().await;
    let mut ws = connect(addr).await;

    let token = auth::issue_token(SECRET, "U-ghost", 60).unwrap();
    send_client_frame(&mut ws, &ClientFrame::Authenticate { token }).await;

    let frame = recv_frame(&mut ws).await;
    match frame {
        ServerFrame::Error { reason } => assert!(reason.contains("unknown user"), "got: {reason}"),
        other => panic!("expected Error, got {other:?}"),
    }
    assert!(state.registry.lookup(&UserId::new("U-ghost")).await.is_none());
}

#[tokio::test]
async fn event_before_credential_is_rejected() {
    let (addr, state) = start_test_server().await;
    let mut ws = connect(addr).await;

    send_client_frame(
        &mut ws,
        &ClientFrame::Event(ClientEvent::Typing {
            to_user_id: UserId::new("U-bob"),
        }),
    )
    .await;

    let frame = recv_frame(&mut ws).await;
    match frame {
        ServerFrame::Error { reason } => {
            assert!(reason.contains("credential"), "got: {reason}");
        }
        other => panic!("expected Error, got {other:?}"),
    }
    assert!(state.registry.lookup(&UserId::new("U-alice")).await.is_none());
}

#[tokio::test]
async fn silent_connection_is_rejected_after_deadline() {
    let (addr, state) = start_test_server().await;
    let mut ws = connect(addr).await;

    // Send nothing; the 500ms credential deadline should fire.
    let frame = recv_frame(&mut ws).await;
    match frame {
        ServerFrame::Error { reason } => {
            assert!(reason.contains("authentication window"), "got: {reason}");
        }
        other => panic!("expected Error, got {other:?}"),
    }
    assert!(state.registry.lookup(&UserId::new("U-alice")).await.is_none());
}

#[tokio::test]
async fn admitted_session_is_visible_in_registry() {
    let (addr, state) = start_test_server().await;
    let mut ws = connect(addr).await;

    let token = auth::issue_token(SECRET, "U-bob", 60).unwrap();
    send_client_frame(&mut ws, &ClientFrame::Authenticate { token }).await;
    let _ack = recv_frame(&mut ws).await;

    assert!(state.registry.lookup(&UserId::new("U-bob")).await.is_some());

    // Disconnect; the entry is evicted once teardown runs.
    ws.close(None).await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if state.registry.lookup(&UserId::new("U-bob")).await.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}
