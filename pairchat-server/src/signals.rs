//! Ephemeral signal relay: typing indicators and read receipts.
//!
//! These signals carry no persistence obligation and no offline notice.
//! They are forwarded only when the recipient holds a live session;
//! every absence or failure path is a silent no-op, because losing a
//! typing indicator is inconsequential.

use pairchat_proto::event::ServerEvent;
use pairchat_proto::user::{UserId, UserRef};
use pairchat_proto::wire::ServerFrame;

use crate::directory::IdentityDirectory;
use crate::server::AppState;
use crate::store::MessageStore;

/// Forwards a typing indicator from `from` to `to_user_id`'s live session.
pub async fn relay_typing<D: IdentityDirectory, S: MessageStore>(
    state: &AppState<D, S>,
    from: &UserRef,
    to_user_id: &UserId,
) {
    relay(state, to_user_id, ServerEvent::Typing { from: from.clone() }).await;
}

/// Forwards a read receipt from `by` to `to_user_id`'s live session.
pub async fn relay_read_receipt<D: IdentityDirectory, S: MessageStore>(
    state: &AppState<D, S>,
    by: &UserRef,
    to_user_id: &UserId,
) {
    relay(state, to_user_id, ServerEvent::ReadReceipt { by: by.clone() }).await;
}

async fn relay<D: IdentityDirectory, S: MessageStore>(
    state: &AppState<D, S>,
    to_user_id: &UserId,
    event: ServerEvent,
) {
    let Some(recipient) = state.directory.resolve(to_user_id).await else {
        return;
    };
    if let Some(handle) = state.registry.lookup(&recipient.user_id).await {
        let _ = handle.push(ServerFrame::Event(event));
    }
}
