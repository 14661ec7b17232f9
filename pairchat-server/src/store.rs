//! Durable message store seam.
//!
//! Every outgoing message is appended here before live delivery is
//! attempted, regardless of whether the recipient is connected. The core
//! never reads messages back — history retrieval belongs to the history
//! collaborator. [`InMemoryStore`] ships with the crate for tests and
//! single-process deployments.

use tokio::sync::Mutex;

use pairchat_proto::message::DirectMessage;

/// Errors that can occur during message persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying storage is unavailable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A write operation failed.
    #[error("write failed: {0}")]
    WriteFailed(String),
}

/// Append-only persistence for direct messages.
pub trait MessageStore: Send + Sync {
    /// Append a message record.
    ///
    /// The write either succeeds or the caller is told it failed; there
    /// are no partial outcomes and the core never retries.
    fn append(
        &self,
        msg: &DirectMessage,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

/// In-memory implementation of [`MessageStore`].
///
/// Records are kept in append order. Not persistent — all data is lost
/// when the process exits.
pub struct InMemoryStore {
    messages: Mutex<Vec<DirectMessage>>,
}

impl InMemoryStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all appended records, in append order.
    pub async fn all(&self) -> Vec<DirectMessage> {
        self.messages.lock().await.clone()
    }

    /// Returns the number of appended records.
    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    /// Reports whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.messages.lock().await.is_empty()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore for InMemoryStore {
    async fn append(&self, msg: &DirectMessage) -> Result<(), StoreError> {
        self.messages.lock().await.push(msg.clone());
        Ok(())
    }
}
