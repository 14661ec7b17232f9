//! Identity directory seam.
//!
//! The directory owns user profiles and the friendship graph; the core
//! only reads from it, never caches, and never copies profile data beyond
//! the lifetime of a single event. [`InMemoryDirectory`] ships with the
//! crate for tests and single-process deployments; a production deployment
//! backs this trait with the account service.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tokio::sync::RwLock;

use pairchat_proto::user::{UserId, UserRef};

/// Read-only view of user profiles and the friendship graph.
pub trait IdentityDirectory: Send + Sync {
    /// Resolve a user ID to its profile, if the user exists.
    fn resolve(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Option<UserRef>> + Send;

    /// Return the set of users befriended with `user_id`.
    ///
    /// Friendship is undirected; an unknown user has an empty friend set.
    fn friends_of(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = HashSet<UserId>> + Send;
}

/// Errors that can occur when loading a roster file.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    /// Failed to read the roster file.
    #[error("failed to read roster file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML roster.
    #[error("failed to parse roster file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// One user entry in a TOML roster file.
#[derive(Debug, serde::Deserialize)]
struct RosterUser {
    id: String,
    username: String,
    #[serde(default)]
    friends: Vec<String>,
}

/// Top-level TOML roster file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RosterFile {
    users: Vec<RosterUser>,
}

/// In-memory implementation of [`IdentityDirectory`].
pub struct InMemoryDirectory {
    usernames: RwLock<HashMap<UserId, String>>,
    friends: RwLock<HashMap<UserId, HashSet<UserId>>>,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            usernames: RwLock::new(HashMap::new()),
            friends: RwLock::new(HashMap::new()),
        }
    }

    /// Loads a directory from a TOML roster file.
    ///
    /// Roster format:
    ///
    /// ```toml
    /// [[users]]
    /// id = "U1"
    /// username = "alice"
    /// friends = ["U2"]
    /// ```
    ///
    /// Friendships listed on either side are installed in both directions.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError`] if the file cannot be read or parsed.
    pub fn from_roster_file(path: &Path) -> Result<Self, RosterError> {
        let contents = std::fs::read_to_string(path).map_err(|e| RosterError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        let roster: RosterFile = toml::from_str(&contents)?;

        let mut usernames = HashMap::new();
        let mut friends: HashMap<UserId, HashSet<UserId>> = HashMap::new();
        for user in &roster.users {
            usernames.insert(UserId::new(&user.id), user.username.clone());
        }
        for user in &roster.users {
            let id = UserId::new(&user.id);
            for friend in &user.friends {
                let friend_id = UserId::new(friend);
                friends.entry(id.clone()).or_default().insert(friend_id.clone());
                friends.entry(friend_id).or_default().insert(id.clone());
            }
        }
        Ok(Self {
            usernames: RwLock::new(usernames),
            friends: RwLock::new(friends),
        })
    }

    /// Registers a user profile.
    pub async fn add_user(&self, user_id: impl Into<String>, username: impl Into<String>) {
        self.usernames
            .write()
            .await
            .insert(UserId::new(user_id), username.into());
    }

    /// Installs an undirected friendship between two users.
    pub async fn add_friendship(&self, a: impl Into<String>, b: impl Into<String>) {
        let a = UserId::new(a);
        let b = UserId::new(b);
        let mut friends = self.friends.write().await;
        friends.entry(a.clone()).or_default().insert(b.clone());
        friends.entry(b).or_default().insert(a);
    }
}

impl IdentityDirectory for InMemoryDirectory {
    async fn resolve(&self, user_id: &UserId) -> Option<UserRef> {
        let usernames = self.usernames.read().await;
        usernames.get(user_id).map(|name| UserRef {
            user_id: user_id.clone(),
            username: name.clone(),
        })
    }

    async fn friends_of(&self, user_id: &UserId) -> HashSet<UserId> {
        let friends = self.friends.read().await;
        friends.get(user_id).cloned().unwrap_or_default()
    }
}
