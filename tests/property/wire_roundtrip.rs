//! Property-based wire codec tests.
//!
//! Uses proptest to verify:
//! 1. Any valid client or server frame survives encode → decode.
//! 2. Random bytes never cause a panic in the decoders (they return
//!    `Err` gracefully).

use proptest::prelude::*;

use pairchat_proto::event::{ClientEvent, ServerEvent};
use pairchat_proto::message::Timestamp;
use pairchat_proto::presence::PresenceStatus;
use pairchat_proto::user::{UserId, UserRef};
use pairchat_proto::wire::{self, ClientFrame, ServerFrame};

// --- Strategies for protocol types ---

/// Strategy for generating arbitrary `UserId` values.
fn arb_user_id() -> impl Strategy<Value = UserId> {
    "[A-Za-z0-9_-]{1,24}".prop_map(UserId::new)
}

/// Strategy for generating arbitrary `UserRef` values.
fn arb_user_ref() -> impl Strategy<Value = UserRef> {
    (arb_user_id(), "[^\x00]{1,32}").prop_map(|(user_id, username)| UserRef { user_id, username })
}

/// Strategy for generating arbitrary `Timestamp` values.
fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
    any::<u64>().prop_map(Timestamp::from_millis)
}

/// Strategy for generating arbitrary `PresenceStatus` values.
fn arb_status() -> impl Strategy<Value = PresenceStatus> {
    prop_oneof![Just(PresenceStatus::Online), Just(PresenceStatus::Offline)]
}

/// Strategy for generating arbitrary `ClientFrame` values.
fn arb_client_frame() -> impl Strategy<Value = ClientFrame> {
    prop_oneof![
        "[^\x00]{0,128}".prop_map(|token| ClientFrame::Authenticate { token }),
        (arb_user_id(), "[^\x00]{1,256}").prop_map(|(to_user_id, text)| {
            ClientFrame::Event(ClientEvent::SendMessage { to_user_id, text })
        }),
        arb_user_id().prop_map(|to_user_id| ClientFrame::Event(ClientEvent::Typing { to_user_id })),
        arb_user_id().prop_map(|from_user_id| {
            ClientFrame::Event(ClientEvent::MessageDelivered { from_user_id })
        }),
    ]
}

/// Strategy for generating arbitrary `ServerFrame` values.
fn arb_server_frame() -> impl Strategy<Value = ServerFrame> {
    prop_oneof![
        arb_user_ref().prop_map(|user| ServerFrame::Authenticated { user }),
        (arb_user_ref(), "[^\x00]{1,256}", arb_timestamp()).prop_map(
            |(from, text, created_at)| {
                ServerFrame::Event(ServerEvent::Message {
                    from,
                    text,
                    created_at,
                })
            }
        ),
        (arb_user_ref(), arb_status())
            .prop_map(|(user, status)| ServerFrame::Event(ServerEvent::Presence { user, status })),
        arb_user_ref().prop_map(|from| ServerFrame::Event(ServerEvent::Typing { from })),
        arb_user_ref().prop_map(|by| ServerFrame::Event(ServerEvent::ReadReceipt { by })),
        (arb_user_ref(), "[^\x00]{0,128}").prop_map(|(user, message)| {
            ServerFrame::Event(ServerEvent::PartnerOffline { user, message })
        }),
        "[^\x00]{0,128}".prop_map(|reason| ServerFrame::Error { reason }),
    ]
}

proptest! {
    #[test]
    fn client_frames_round_trip(frame in arb_client_frame()) {
        let bytes = wire::encode_client(&frame).unwrap();
        let decoded = wire::decode_client(&bytes).unwrap();
        prop_assert_eq!(frame, decoded);
    }

    #[test]
    fn server_frames_round_trip(frame in arb_server_frame()) {
        let bytes = wire::encode_server(&frame).unwrap();
        let decoded = wire::decode_server(&bytes).unwrap();
        prop_assert_eq!(frame, decoded);
    }

    #[test]
    fn random_bytes_never_panic_the_decoders(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        // Must return Err or Ok, never panic.
        let _ = wire::decode_client(&bytes);
        let _ = wire::decode_server(&bytes);
    }
}
