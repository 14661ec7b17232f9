//! Presence fan-out to the social graph.
//!
//! On a session's admission or eviction, status-change events are pushed
//! to every friend that currently holds a live session. The caller
//! completes the registry mutation first, so a concurrent send that
//! observes "online" finds a route and one that observes "offline" does
//! not find a stale one.

use pairchat_proto::event::ServerEvent;
use pairchat_proto::presence::PresenceStatus;
use pairchat_proto::user::UserRef;
use pairchat_proto::wire::ServerFrame;

use crate::directory::IdentityDirectory;
use crate::server::AppState;
use crate::store::MessageStore;

/// Announces `user` as online to every live friend.
///
/// Runs after the session's admission is visible to lookups.
pub async fn broadcast_online<D: IdentityDirectory, S: MessageStore>(
    state: &AppState<D, S>,
    user: &UserRef,
) {
    let friends = state.directory.friends_of(&user.user_id).await;
    let live = state.registry.list_live(&friends).await;
    tracing::debug!(
        user_id = %user.user_id,
        live_friends = live.len(),
        "announcing online status"
    );

    for friend in &live {
        if let Some(handle) = state.registry.lookup(friend).await {
            let _ = handle.push(ServerFrame::Event(ServerEvent::Presence {
                user: user.clone(),
                status: PresenceStatus::Online,
            }));
        }
    }
}

/// Announces `user` as offline to every live friend.
///
/// Each live friend also receives a partner-offline notice so a friend
/// mid-conversation can react immediately. The notice goes to the whole
/// live friend set, not just active chat partners: any friend can open a
/// chat at will, so every one of them is a potential active partner.
pub async fn broadcast_offline<D: IdentityDirectory, S: MessageStore>(
    state: &AppState<D, S>,
    user: &UserRef,
) {
    let friends = state.directory.friends_of(&user.user_id).await;
    let live = state.registry.list_live(&friends).await;
    tracing::debug!(
        user_id = %user.user_id,
        live_friends = live.len(),
        "announcing offline status"
    );

    for friend in &live {
        if let Some(handle) = state.registry.lookup(friend).await {
            let _ = handle.push(ServerFrame::Event(ServerEvent::Presence {
                user: user.clone(),
                status: PresenceStatus::Offline,
            }));
            let _ = handle.push(ServerFrame::Event(ServerEvent::PartnerOffline {
                user: user.clone(),
                message: format!("{} has gone offline.", user.username),
            }));
        }
    }
}
