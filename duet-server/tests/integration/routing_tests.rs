use duet_core::{ClientMessage, IceServerConfig, PartyId, RelayEvent, RoomId, SignalPayload};
use duet_server::attach_local;

use crate::integration::{create_relay, init_tracing};
use crate::utils::{expect_silence, expect_welcome, next_event, wait_for_members};

fn offer(sdp: &str) -> SignalPayload {
    SignalPayload::Offer {
        sdp: sdp.to_owned(),
    }
}

#[tokio::test]
async fn welcome_carries_assigned_id_and_ice_config() {
    init_tracing();

    let relay = create_relay();
    let ice = vec![IceServerConfig {
        urls: vec!["stun:stun.example.org:3478".to_owned()],
        username: None,
        credential: None,
    }];
    let mut link = attach_local(&relay, ice.clone());

    match next_event(&mut link).await {
        RelayEvent::Welcome {
            party_id,
            ice_servers,
        } => {
            assert_eq!(party_id, link.party_id);
            assert_eq!(ice_servers.len(), 1);
            assert_eq!(ice_servers[0].urls, ice[0].urls);
        }
        other => panic!("Expected welcome, got {other:?}"),
    }
}

#[tokio::test]
async fn signal_is_routed_verbatim_with_from_substituted() {
    init_tracing();

    let relay = create_relay();
    let mut a = attach_local(&relay, vec![]);
    let mut b = attach_local(&relay, vec![]);
    let a_id = expect_welcome(&mut a).await;
    let b_id = expect_welcome(&mut b).await;

    a.outbound
        .send(ClientMessage::Signal {
            target: b_id,
            payload: offer("v=0 test-sdp"),
        })
        .unwrap();

    match next_event(&mut b).await {
        RelayEvent::Signal { from, payload } => {
            assert_eq!(from, a_id);
            match payload {
                SignalPayload::Offer { sdp } => assert_eq!(sdp, "v=0 test-sdp"),
                other => panic!("Payload was rewritten: {other:?}"),
            }
        }
        other => panic!("Expected signal, got {other:?}"),
    }
}

#[tokio::test]
async fn signal_to_missing_recipient_is_dropped_without_error() {
    init_tracing();

    let relay = create_relay();
    let mut a = attach_local(&relay, vec![]);
    let mut b = attach_local(&relay, vec![]);
    expect_welcome(&mut a).await;
    let b_id = expect_welcome(&mut b).await;

    // Nobody is subscribed under this id; the relay must swallow it.
    a.outbound
        .send(ClientMessage::Signal {
            target: PartyId::new(),
            payload: offer("lost"),
        })
        .unwrap();
    expect_silence(&mut a).await;

    // The relay is still healthy for real traffic afterwards.
    a.outbound
        .send(ClientMessage::Signal {
            target: b_id,
            payload: offer("delivered"),
        })
        .unwrap();
    assert!(matches!(
        next_event(&mut b).await,
        RelayEvent::Signal { .. }
    ));
}

#[tokio::test]
async fn join_notification_precedes_the_offer_it_provokes() {
    init_tracing();

    let relay = create_relay();
    let mut a = attach_local(&relay, vec![]);
    let b = attach_local(&relay, vec![]);
    let a_id = expect_welcome(&mut a).await;

    let room = RoomId::from("r1");
    a.outbound
        .send(ClientMessage::JoinRoom { room: room.clone() })
        .unwrap();
    wait_for_members(&relay, &room, 1).await;

    // B joins and immediately signals the member it will find there; the
    // serial dispatch per party keeps the causal order intact.
    b.outbound
        .send(ClientMessage::JoinRoom { room: room.clone() })
        .unwrap();
    b.outbound
        .send(ClientMessage::Signal {
            target: a_id,
            payload: offer("after-join"),
        })
        .unwrap();

    assert!(matches!(
        next_event(&mut a).await,
        RelayEvent::UserJoined { .. }
    ));
    assert!(matches!(
        next_event(&mut a).await,
        RelayEvent::Signal { .. }
    ));
}
