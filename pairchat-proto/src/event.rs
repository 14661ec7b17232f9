//! Application event types exchanged between client and server.
//!
//! Both directions are closed, tagged enums so the dispatcher can match
//! exhaustively; there is no string-keyed handler table anywhere.

use serde::{Deserialize, Serialize};

use crate::message::Timestamp;
use crate::presence::PresenceStatus;
use crate::user::{UserId, UserRef};

/// Events a client sends to the server after authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientEvent {
    /// Send a direct message to another user.
    SendMessage {
        /// Recipient's user ID.
        to_user_id: UserId,
        /// Message text.
        text: String,
    },

    /// The client is typing a message to another user.
    Typing {
        /// The user being typed to.
        to_user_id: UserId,
    },

    /// The client has displayed a message; drives a read receipt back to
    /// its original sender.
    MessageDelivered {
        /// The user whose message was displayed.
        from_user_id: UserId,
    },
}

/// Events the server pushes to a client's live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerEvent {
    /// An incoming direct message.
    Message {
        /// Who sent the message.
        from: UserRef,
        /// Message text.
        text: String,
        /// Server-assigned creation time.
        created_at: Timestamp,
    },

    /// A friend's connection status changed.
    Presence {
        /// The user whose status changed.
        user: UserRef,
        /// The new status.
        status: PresenceStatus,
    },

    /// A user is typing a message to the recipient.
    Typing {
        /// Who is typing.
        from: UserRef,
    },

    /// A user has read a message the recipient sent.
    ReadReceipt {
        /// Who read the message.
        by: UserRef,
    },

    /// A message could not be delivered live; it was stored for later.
    /// Sent only to the sender of the undeliverable message, or to live
    /// friends when a chat partner disconnects.
    PartnerOffline {
        /// The absent user.
        user: UserRef,
        /// Human-readable explanation for display.
        message: String,
    },
}
