//! WebSocket session handling: shared state, the authentication handshake,
//! per-session reader/writer tasks, and the event dispatcher.
//!
//! A connection's lifecycle:
//! 1. Wait for an `Authenticate` frame within the configured deadline.
//! 2. Verify the token and resolve the user; on failure, report and close
//!    without touching the registry.
//! 3. Admit the session (replacing any prior session for the same user),
//!    acknowledge, and announce the user online to live friends.
//! 4. Enter the message loop, dispatching inbound events.
//! 5. On disconnect, evict the session — unless it was superseded — and
//!    announce the user offline.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use pairchat_proto::event::ClientEvent;
use pairchat_proto::message::validate_text;
use pairchat_proto::user::{UserId, UserRef};
use pairchat_proto::wire::{self, ClientFrame, ServerFrame};

use crate::auth::{self, AuthError};
use crate::directory::IdentityDirectory;
use crate::presence;
use crate::registry::{ConnectionRegistry, Session};
use crate::router;
use crate::signals;
use crate::store::MessageStore;

/// Shared server state: the connection registry plus the collaborator
/// seams and authentication parameters.
pub struct AppState<D, S> {
    /// Single source of truth for live sessions.
    pub registry: ConnectionRegistry,
    /// Read-only identity and friendship lookups.
    pub directory: D,
    /// Append-only durable message storage.
    pub store: S,
    jwt_secret: Vec<u8>,
    auth_timeout: Duration,
}

impl<D: IdentityDirectory, S: MessageStore> AppState<D, S> {
    /// Creates server state with a fresh, empty registry.
    #[must_use]
    pub fn new(directory: D, store: S, jwt_secret: Vec<u8>, auth_timeout: Duration) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            directory,
            store,
            jwt_secret,
            auth_timeout,
        }
    }
}

/// Handles an upgraded WebSocket connection for a single user session.
pub async fn handle_session<D, S>(socket: WebSocket, state: Arc<AppState<D, S>>)
where
    D: IdentityDirectory + 'static,
    S: MessageStore + 'static,
{
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Authentication gate: nothing touches the registry until this passes.
    let user = match authenticate(&mut ws_receiver, &state).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "connection rejected before admission");
            let _ = send_frame(
                &mut ws_sender,
                &ServerFrame::Error {
                    reason: e.to_string(),
                },
            )
            .await;
            let _ = ws_sender.close().await;
            return;
        }
    };

    tracing::info!(user_id = %user.user_id, username = %user.username, "session authenticated");

    // Channel feeding this session's writer task.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    let session = Session::new(user.user_id.clone(), tx.clone());
    let session_id = session.session_id;

    // Last-connect-wins: a prior session for the same user is replaced,
    // not duplicated. Its transport is left to wind down on its own.
    if state.registry.admit(session).await.is_some() {
        tracing::info!(user_id = %user.user_id, "superseding existing session");
    }

    if send_frame(
        &mut ws_sender,
        &ServerFrame::Authenticated { user: user.clone() },
    )
    .await
    .is_err()
    {
        tracing::warn!(user_id = %user.user_id, "failed to send authentication ack");
        state.registry.evict(&user.user_id, session_id).await;
        return;
    }

    // The admission is visible to lookups before friends hear "online".
    presence::broadcast_online(&state, &user).await;

    // Writer task: encode queued frames and push them onto the socket.
    let writer_user_id = user.user_id.clone();
    let mut write_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match wire::encode_server(&frame) {
                Ok(bytes) => {
                    if ws_sender.send(Message::Binary(bytes.into())).await.is_err() {
                        tracing::warn!(user_id = %writer_user_id, "WebSocket write failed");
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(user_id = %writer_user_id, error = %e, "failed to encode outbound frame");
                }
            }
        }
    });

    // Reader task: decode inbound frames and dispatch events.
    let reader_user = user.clone();
    let reader_state = Arc::clone(&state);
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Binary(data) => {
                    handle_client_frame(&reader_user, &data, &reader_state, &tx).await;
                }
                Message::Close(_) => {
                    tracing::info!(user_id = %reader_user.user_id, "received close frame");
                    break;
                }
                _ => {
                    // Ignore text, ping, pong frames.
                }
            }
        }
    });

    // Wait for either task to finish, then abort the other.
    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    // A superseded session must not evict its replacement; `evict` matches
    // on the session id, so the no-op case falls through quietly here.
    if state.registry.evict(&user.user_id, session_id).await.is_some() {
        tracing::info!(user_id = %user.user_id, "session disconnected");
        presence::broadcast_offline(&state, &user).await;
    } else {
        tracing::debug!(
            user_id = %user.user_id,
            session_id = %session_id,
            "superseded session closed"
        );
    }
}

/// Runs the authentication gate on a fresh connection.
///
/// The first frame must be a credential and must arrive within the
/// configured deadline; the token is then verified and the subject
/// resolved against the identity directory.
///
/// # Errors
///
/// Returns [`AuthError`] describing why the attempt was rejected.
async fn authenticate<D, S>(
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    state: &AppState<D, S>,
) -> Result<UserRef, AuthError>
where
    D: IdentityDirectory,
    S: MessageStore,
{
    let token = tokio::time::timeout(state.auth_timeout, wait_for_credential(receiver))
        .await
        .map_err(|_| AuthError::DeadlineExpired)??;

    let claims = auth::verify_token(&state.jwt_secret, &token)?;
    let user_id = UserId::new(claims.sub);
    state
        .directory
        .resolve(&user_id)
        .await
        .ok_or(AuthError::UnknownUser(user_id))
}

/// Waits for the first meaningful frame, expecting a credential.
async fn wait_for_credential(
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
) -> Result<String, AuthError> {
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Binary(data) => match wire::decode_client(&data) {
                Ok(ClientFrame::Authenticate { token }) => return Ok(token),
                Ok(other) => {
                    tracing::warn!(frame = ?other, "expected credential, got different frame");
                    return Err(AuthError::CredentialExpected);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to decode handshake frame");
                    return Err(AuthError::CredentialExpected);
                }
            },
            Message::Close(_) => return Err(AuthError::ConnectionClosed),
            _ => {
                // Skip ping/pong frames during the handshake.
            }
        }
    }
    Err(AuthError::ConnectionClosed)
}

/// Handles one binary frame from an authenticated session.
async fn handle_client_frame<D, S>(
    user: &UserRef,
    data: &[u8],
    state: &Arc<AppState<D, S>>,
    reply: &mpsc::UnboundedSender<ServerFrame>,
) where
    D: IdentityDirectory,
    S: MessageStore,
{
    let frame = match wire::decode_client(data) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(user_id = %user.user_id, error = %e, "failed to decode frame");
            return;
        }
    };

    match frame {
        ClientFrame::Authenticate { .. } => {
            // One-shot check at establishment; repeats are ignored.
            tracing::warn!(user_id = %user.user_id, "ignoring duplicate credential");
        }
        ClientFrame::Event(event) => dispatch_event(user, event, state, reply).await,
    }
}

/// Dispatches one inbound event. The match is exhaustive over the closed
/// event set; there is no string-keyed handler table.
async fn dispatch_event<D, S>(
    user: &UserRef,
    event: ClientEvent,
    state: &Arc<AppState<D, S>>,
    reply: &mpsc::UnboundedSender<ServerFrame>,
) where
    D: IdentityDirectory,
    S: MessageStore,
{
    match event {
        ClientEvent::SendMessage { to_user_id, text } => {
            if let Err(e) = validate_text(&text) {
                let _ = reply.send(ServerFrame::Error {
                    reason: e.to_string(),
                });
                return;
            }
            if let Err(e) = router::send_message(state, user, &to_user_id, &text).await {
                tracing::error!(
                    user_id = %user.user_id,
                    to = %to_user_id,
                    error = %e,
                    "send failed"
                );
                let _ = reply.send(ServerFrame::Error {
                    reason: e.to_string(),
                });
            }
        }
        ClientEvent::Typing { to_user_id } => {
            signals::relay_typing(state, user, &to_user_id).await;
        }
        ClientEvent::MessageDelivered { from_user_id } => {
            // The reader acknowledges; the receipt goes back to the sender.
            signals::relay_read_receipt(state, user, &from_user_id).await;
        }
    }
}

/// Encodes and sends a frame directly on a WebSocket sender.
async fn send_frame(
    ws_sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    frame: &ServerFrame,
) -> Result<(), String> {
    let bytes = wire::encode_server(frame).map_err(|e| e.to_string())?;
    ws_sender
        .send(Message::Binary(bytes.into()))
        .await
        .map_err(|e| format!("WebSocket send error: {e}"))
}

/// Starts the server on the given address and returns the bound address
/// and a join handle.
///
/// This is the primary entry point used by both `main.rs` and test code.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server<D, S>(
    addr: &str,
    state: Arc<AppState<D, S>>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
>
where
    D: IdentityDirectory + 'static,
    S: MessageStore + 'static,
{
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler::<D, S>))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "server error");
        }
    });

    Ok((bound_addr, handle))
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler<D, S>(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<AppState<D, S>>>,
) -> impl axum::response::IntoResponse
where
    D: IdentityDirectory + 'static,
    S: MessageStore + 'static,
{
    ws.on_upgrade(move |socket| handle_session(socket, state))
}
