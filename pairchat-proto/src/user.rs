//! User identity types shared across the wire protocol.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque stable identifier for a registered user.
///
/// Assigned by the identity directory at signup; the core never inspects
/// its contents, it is only compared and routed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a user identifier from a string representation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the string representation of this user ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user reference carried inside outbound events: identifier plus the
/// display name resolved from the identity directory at event time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Stable external identifier.
    pub user_id: UserId,
    /// Display name as known to the identity directory.
    pub username: String,
}

impl UserRef {
    /// Create a user reference from an id and display name.
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            username: username.into(),
        }
    }
}
