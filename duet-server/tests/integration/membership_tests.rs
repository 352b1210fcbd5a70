use duet_core::{ClientMessage, RelayEvent, RoomId};
use duet_server::attach_local;

use crate::integration::{create_relay, init_tracing};
use crate::utils::{expect_silence, expect_welcome, next_event, wait_for_members};

#[tokio::test]
async fn second_join_notifies_existing_member_only() {
    init_tracing();

    let relay = create_relay();
    let mut a = attach_local(&relay, vec![]);
    let mut b = attach_local(&relay, vec![]);
    expect_welcome(&mut a).await;
    let b_id = expect_welcome(&mut b).await;

    let room = RoomId::from("r1");
    a.outbound
        .send(ClientMessage::JoinRoom { room: room.clone() })
        .unwrap();
    wait_for_members(&relay, &room, 1).await;

    b.outbound
        .send(ClientMessage::JoinRoom { room: room.clone() })
        .unwrap();

    match next_event(&mut a).await {
        RelayEvent::UserJoined { party_id } => assert_eq!(party_id, b_id),
        other => panic!("Expected user-joined, got {other:?}"),
    }

    // The joiner itself is not notified of its own arrival.
    expect_silence(&mut b).await;
}

#[tokio::test]
async fn third_join_receives_room_full_and_membership_is_unchanged() {
    init_tracing();

    let relay = create_relay();
    let mut a = attach_local(&relay, vec![]);
    let mut b = attach_local(&relay, vec![]);
    let mut c = attach_local(&relay, vec![]);
    let a_id = expect_welcome(&mut a).await;
    let b_id = expect_welcome(&mut b).await;
    expect_welcome(&mut c).await;

    let room = RoomId::from("r1");
    a.outbound
        .send(ClientMessage::JoinRoom { room: room.clone() })
        .unwrap();
    wait_for_members(&relay, &room, 1).await;
    b.outbound
        .send(ClientMessage::JoinRoom { room: room.clone() })
        .unwrap();
    wait_for_members(&relay, &room, 2).await;

    c.outbound
        .send(ClientMessage::JoinRoom { room: room.clone() })
        .unwrap();

    match next_event(&mut c).await {
        RelayEvent::RoomFull => {}
        other => panic!("Expected room-full, got {other:?}"),
    }

    let members = relay.registry().members_of(&room);
    assert_eq!(members.len(), 2);
    assert!(members.contains(&a_id));
    assert!(members.contains(&b_id));

    // Existing members saw only the admitted join.
    match next_event(&mut a).await {
        RelayEvent::UserJoined { party_id } => assert_eq!(party_id, b_id),
        other => panic!("Expected user-joined, got {other:?}"),
    }
    expect_silence(&mut a).await;
}

#[tokio::test]
async fn explicit_leave_notifies_peer_exactly_once() {
    init_tracing();

    let relay = create_relay();
    let mut a = attach_local(&relay, vec![]);
    let mut b = attach_local(&relay, vec![]);
    expect_welcome(&mut a).await;
    let b_id = expect_welcome(&mut b).await;

    let room = RoomId::from("r1");
    a.outbound
        .send(ClientMessage::JoinRoom { room: room.clone() })
        .unwrap();
    wait_for_members(&relay, &room, 1).await;
    b.outbound
        .send(ClientMessage::JoinRoom { room: room.clone() })
        .unwrap();
    next_event(&mut a).await; // user-joined

    b.outbound.send(ClientMessage::LeaveRoom).unwrap();
    b.outbound.send(ClientMessage::LeaveRoom).unwrap();

    match next_event(&mut a).await {
        RelayEvent::UserLeft { party_id } => assert_eq!(party_id, b_id),
        other => panic!("Expected user-left, got {other:?}"),
    }

    // The duplicate leave is a no-op: no second notification.
    expect_silence(&mut a).await;
    assert_eq!(relay.registry().members_of(&room).len(), 1);
}

#[tokio::test]
async fn dropped_link_is_an_implicit_leave() {
    init_tracing();

    let relay = create_relay();
    let mut a = attach_local(&relay, vec![]);
    let mut b = attach_local(&relay, vec![]);
    expect_welcome(&mut a).await;
    let b_id = expect_welcome(&mut b).await;

    let room = RoomId::from("r1");
    a.outbound
        .send(ClientMessage::JoinRoom { room: room.clone() })
        .unwrap();
    wait_for_members(&relay, &room, 1).await;
    b.outbound
        .send(ClientMessage::JoinRoom { room: room.clone() })
        .unwrap();
    next_event(&mut a).await; // user-joined

    drop(b);

    match next_event(&mut a).await {
        RelayEvent::UserLeft { party_id } => assert_eq!(party_id, b_id),
        other => panic!("Expected user-left, got {other:?}"),
    }
    assert_eq!(relay.registry().rooms_of(&b_id).len(), 0);
}
