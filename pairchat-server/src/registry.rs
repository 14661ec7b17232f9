//! Connection registry: the single source of truth for which users
//! currently hold a live session.
//!
//! The registry maps each `UserId` to at most one [`Session`]
//! (last-connect-wins). It is the only shared mutable structure in the
//! core; every mutation goes through its write lock, reads proceed
//! concurrently. Instances are injected — there is no process-wide
//! registry — so tests construct a fresh one per case.

use std::collections::{HashMap, HashSet};

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use pairchat_proto::message::Timestamp;
use pairchat_proto::user::UserId;
use pairchat_proto::wire::ServerFrame;

/// Identifies one admitted transport session.
///
/// UUID v7 for time-ordering. A fresh id is assigned per admission so
/// that a superseded session's teardown can be told apart from the
/// current session's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new time-ordered session identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One live, authenticated duplex connection for exactly one user.
///
/// Owned exclusively by the registry; other components obtain a
/// [`LiveHandle`] through [`ConnectionRegistry::lookup`] and never hold
/// a `Session` across calls.
#[derive(Debug)]
pub struct Session {
    /// The user this session belongs to.
    pub user_id: UserId,
    /// Per-admission identity, used to match evictions to admissions.
    pub session_id: SessionId,
    /// Channel feeding the session's WebSocket writer task.
    sender: mpsc::UnboundedSender<ServerFrame>,
    /// When the session was admitted.
    pub connected_at: Timestamp,
}

impl Session {
    /// Creates a session for a freshly authenticated transport.
    #[must_use]
    pub fn new(user_id: UserId, sender: mpsc::UnboundedSender<ServerFrame>) -> Self {
        Self {
            user_id,
            session_id: SessionId::new(),
            sender,
            connected_at: Timestamp::now(),
        }
    }

    /// Returns a push handle for this session.
    #[must_use]
    pub fn handle(&self) -> LiveHandle {
        LiveHandle {
            session_id: self.session_id,
            sender: self.sender.clone(),
        }
    }
}

/// A believed-live push handle returned by [`ConnectionRegistry::lookup`].
///
/// Holding one does not guarantee the underlying transport is still
/// healthy — callers that must not push into a dead channel re-check with
/// [`LiveHandle::is_connected`] at the moment of use.
#[derive(Debug, Clone)]
pub struct LiveHandle {
    /// Identity of the session this handle belongs to.
    pub session_id: SessionId,
    sender: mpsc::UnboundedSender<ServerFrame>,
}

impl LiveHandle {
    /// Reports whether the session's writer task is still running.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queues a frame for the session's writer task.
    ///
    /// # Errors
    ///
    /// Returns the frame back if the writer task has already shut down.
    pub fn push(&self, frame: ServerFrame) -> Result<(), ServerFrame> {
        self.sender.send(frame).map_err(|e| e.0)
    }
}

/// Registry of live sessions, keyed by user.
///
/// Invariants: at most one session per user; a stored session's `user_id`
/// always equals its key; no two entries share a transport channel.
pub struct ConnectionRegistry {
    sessions: RwLock<HashMap<UserId, Session>>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    /// Creates a new, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Installs a session for its user, replacing any prior entry.
    ///
    /// Admission is unconditional — the caller has already passed the
    /// authentication gate. Returns the superseded session if one existed;
    /// the registry never force-closes the old transport, its writer task
    /// winds down on its own once the returned session is dropped.
    pub async fn admit(&self, session: Session) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.user_id.clone(), session)
    }

    /// Removes and returns the user's current session, but only when
    /// `session_id` matches the registered one.
    ///
    /// A mismatch means the caller is tearing down a superseded session;
    /// the newer session must survive, so the eviction is a no-op.
    /// Evicting a user with no registered session is also a safe no-op.
    pub async fn evict(&self, user_id: &UserId, session_id: SessionId) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(user_id) {
            Some(current) if current.session_id == session_id => sessions.remove(user_id),
            _ => None,
        }
    }

    /// Returns a push handle for the user's session, if one is registered.
    ///
    /// Pure read: the handle reports believed-live state only.
    pub async fn lookup(&self, user_id: &UserId) -> Option<LiveHandle> {
        let sessions = self.sessions.read().await;
        sessions.get(user_id).map(Session::handle)
    }

    /// Filters a candidate set down to the users currently registered.
    pub async fn list_live(&self, candidates: &HashSet<UserId>) -> HashSet<UserId> {
        let sessions = self.sessions.read().await;
        candidates
            .iter()
            .filter(|id| sessions.contains_key(*id))
            .cloned()
            .collect()
    }
}
