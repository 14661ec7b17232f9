//! Direct-message record and validation.
//!
//! A [`DirectMessage`] is created by the routing layer at send time, given a
//! server-assigned timestamp when persisted, and never mutated afterwards.
//! Read-state bookkeeping lives with the history collaborator, not here.

use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// Maximum allowed message text size in bytes (16 KB).
pub const MAX_TEXT_SIZE: usize = 16 * 1024;

/// Millisecond-precision UTC timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp for the current instant.
    #[must_use]
    pub fn now() -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Creates a timestamp from milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Error returned when message text fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Message text is empty.
    #[error("message text is empty")]
    Empty,
    /// Message text exceeds the maximum allowed size.
    #[error("message too large ({size} bytes, max {max} bytes)")]
    TooLarge {
        /// Actual size of the text in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },
}

/// Validates message text for sending.
///
/// Checks that the text is non-empty and within the size limit
/// ([`MAX_TEXT_SIZE`] = 16 KB).
///
/// # Errors
///
/// Returns [`ValidationError::Empty`] if the text is empty, or
/// [`ValidationError::TooLarge`] if it exceeds `MAX_TEXT_SIZE`.
pub const fn validate_text(text: &str) -> Result<(), ValidationError> {
    if text.is_empty() {
        return Err(ValidationError::Empty);
    }
    let size = text.len();
    if size > MAX_TEXT_SIZE {
        return Err(ValidationError::TooLarge {
            size,
            max: MAX_TEXT_SIZE,
        });
    }
    Ok(())
}

/// A persisted direct message between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    /// Sender's user ID.
    pub from: UserId,
    /// Recipient's user ID.
    pub to: UserId,
    /// Message text.
    pub text: String,
    /// Server-assigned creation time, set when the message is persisted.
    pub created_at: Timestamp,
}
