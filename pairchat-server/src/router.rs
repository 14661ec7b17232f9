//! Message routing: persist first, then attempt live delivery.
//!
//! Every outgoing message is appended to the durable store before any
//! delivery is attempted. Live push is best-effort: when the recipient
//! has no healthy session, the sender gets an explicit partner-offline
//! notice instead of silent loss. Registry entries that turn out to be
//! dead at the moment of use are evicted here (self-healing) and treated
//! exactly like an absent recipient.

use pairchat_proto::event::ServerEvent;
use pairchat_proto::message::{DirectMessage, Timestamp};
use pairchat_proto::user::{UserId, UserRef};
use pairchat_proto::wire::ServerFrame;

use crate::directory::IdentityDirectory;
use crate::registry::LiveHandle;
use crate::server::AppState;
use crate::store::{MessageStore, StoreError};

/// Outcome of a routed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The message was persisted and pushed to the recipient's live session.
    Delivered,
    /// The message was persisted; the recipient has no healthy session.
    StoredForLater,
    /// The recipient does not exist; nothing was persisted.
    RecipientUnknown,
}

/// Errors surfaced to the caller of [`send_message`].
///
/// An offline recipient is not an error — it is [`Delivery::StoredForLater`].
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The message could not be persisted and is not considered sent.
    #[error("message could not be persisted: {0}")]
    Persistence(#[from] StoreError),
}

/// Routes a direct message from `from` to `to_user_id`.
///
/// Persistence strictly happens-before the live push. The caller may
/// retry a persistence failure; the core never retries on its own.
///
/// # Errors
///
/// Returns [`SendError::Persistence`] if the durable write fails; no
/// delivery is attempted in that case.
pub async fn send_message<D: IdentityDirectory, S: MessageStore>(
    state: &AppState<D, S>,
    from: &UserRef,
    to_user_id: &UserId,
    text: &str,
) -> Result<Delivery, SendError> {
    let Some(recipient) = state.directory.resolve(to_user_id).await else {
        tracing::debug!(to = %to_user_id, "dropping message for unknown recipient");
        return Ok(Delivery::RecipientUnknown);
    };

    let msg = DirectMessage {
        from: from.user_id.clone(),
        to: recipient.user_id.clone(),
        text: text.to_string(),
        created_at: Timestamp::now(),
    };
    state.store.append(&msg).await?;

    let Some(handle) = state.registry.lookup(&recipient.user_id).await else {
        tracing::debug!(to = %recipient.user_id, "recipient offline, message stored");
        notify_sender_offline(state, from, &recipient).await;
        return Ok(Delivery::StoredForLater);
    };

    // The registry's belief can be stale: a session torn down by the
    // network has no synchronous unregister. Re-check before pushing.
    if !handle.is_connected() {
        evict_stale(state, &recipient.user_id, &handle).await;
        notify_sender_offline(state, from, &recipient).await;
        return Ok(Delivery::StoredForLater);
    }

    let event = ServerFrame::Event(ServerEvent::Message {
        from: from.clone(),
        text: msg.text.clone(),
        created_at: msg.created_at,
    });
    if handle.push(event).is_err() {
        evict_stale(state, &recipient.user_id, &handle).await;
        notify_sender_offline(state, from, &recipient).await;
        return Ok(Delivery::StoredForLater);
    }

    tracing::debug!(from = %from.user_id, to = %recipient.user_id, "message delivered live");
    Ok(Delivery::Delivered)
}

/// Removes a registry entry whose channel turned out to be dead.
async fn evict_stale<D: IdentityDirectory, S: MessageStore>(
    state: &AppState<D, S>,
    user_id: &UserId,
    handle: &LiveHandle,
) {
    tracing::warn!(
        user_id = %user_id,
        session_id = %handle.session_id,
        "registry entry is stale, evicting"
    );
    state.registry.evict(user_id, handle.session_id).await;
}

/// Best-effort partner-offline notice to the sender's live session.
///
/// A send from an already-disconnected sender is dropped with no notice.
async fn notify_sender_offline<D: IdentityDirectory, S: MessageStore>(
    state: &AppState<D, S>,
    from: &UserRef,
    absent: &UserRef,
) {
    if let Some(handle) = state.registry.lookup(&from.user_id).await {
        let _ = handle.push(ServerFrame::Event(ServerEvent::PartnerOffline {
            user: absent.clone(),
            message: format!(
                "{} is offline. Your message was saved and will be delivered when they return.",
                absent.username
            ),
        }));
    }
}
