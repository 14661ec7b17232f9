//! Frame envelopes and postcard codec for the `PairChat` wire format.
//!
//! Every WebSocket binary frame carries exactly one [`ClientFrame`] or
//! [`ServerFrame`], postcard-encoded. The first client frame on a new
//! connection must be [`ClientFrame::Authenticate`]; the server replies
//! with [`ServerFrame::Authenticated`] or an error followed by a close.

use serde::{Deserialize, Serialize};

use crate::event::{ClientEvent, ServerEvent};
use crate::user::UserRef;

/// Error type for wire encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Frames sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientFrame {
    /// Present a bearer token. Must be the first frame on a new connection.
    Authenticate {
        /// Signed bearer token issued at login.
        token: String,
    },
    /// An application event from an authenticated session.
    Event(ClientEvent),
}

/// Frames sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerFrame {
    /// Authentication succeeded; the session is now live.
    Authenticated {
        /// The authenticated user, as resolved by the identity directory.
        user: UserRef,
    },
    /// An application event pushed to this session.
    Event(ServerEvent),
    /// The server reports an error condition.
    Error {
        /// Human-readable error description.
        reason: String,
    },
}

/// Encodes a [`ClientFrame`] into bytes using postcard.
///
/// # Errors
///
/// Returns [`WireError::Serialization`] if the frame cannot be serialized.
pub fn encode_client(frame: &ClientFrame) -> Result<Vec<u8>, WireError> {
    postcard::to_allocvec(frame).map_err(|e| WireError::Serialization(e.to_string()))
}

/// Decodes a [`ClientFrame`] from bytes using postcard.
///
/// # Errors
///
/// Returns [`WireError::Serialization`] if the bytes cannot be deserialized.
pub fn decode_client(bytes: &[u8]) -> Result<ClientFrame, WireError> {
    postcard::from_bytes(bytes).map_err(|e| WireError::Serialization(e.to_string()))
}

/// Encodes a [`ServerFrame`] into bytes using postcard.
///
/// # Errors
///
/// Returns [`WireError::Serialization`] if the frame cannot be serialized.
pub fn encode_server(frame: &ServerFrame) -> Result<Vec<u8>, WireError> {
    postcard::to_allocvec(frame).map_err(|e| WireError::Serialization(e.to_string()))
}

/// Decodes a [`ServerFrame`] from bytes using postcard.
///
/// # Errors
///
/// Returns [`WireError::Serialization`] if the bytes cannot be deserialized.
pub fn decode_server(bytes: &[u8]) -> Result<ServerFrame, WireError> {
    postcard::from_bytes(bytes).map_err(|e| WireError::Serialization(e.to_string()))
}
