use duet_core::{PartyId, RelayEvent};
use duet_server::LocalLink;
use std::time::Duration;

/// Timeout for a single expected relay event (ms).
pub const EVENT_TIMEOUT_MS: u64 = 2000;

/// Window in which an event must NOT arrive (ms).
pub const SILENCE_WINDOW_MS: u64 = 200;

pub async fn next_event(link: &mut LocalLink) -> RelayEvent {
    tokio::time::timeout(
        Duration::from_millis(EVENT_TIMEOUT_MS),
        link.events.recv(),
    )
    .await
    .expect("Timed out waiting for relay event")
    .expect("Relay closed the event channel")
}

/// Consume the welcome that every attachment starts with and return the
/// assigned id.
pub async fn expect_welcome(link: &mut LocalLink) -> PartyId {
    match next_event(link).await {
        RelayEvent::Welcome { party_id, .. } => party_id,
        other => panic!("Expected welcome, got {other:?}"),
    }
}

/// Poll until the room holds `count` members, so joins issued through
/// independent pumps can be sequenced deterministically.
pub async fn wait_for_members(
    relay: &duet_server::SignalRelay,
    room: &duet_core::RoomId,
    count: usize,
) {
    let start = std::time::Instant::now();
    loop {
        if relay.registry().members_of(room).len() == count {
            return;
        }
        if start.elapsed() > Duration::from_millis(EVENT_TIMEOUT_MS) {
            panic!(
                "Room {room} never reached {count} member(s), has {}",
                relay.registry().members_of(room).len()
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Assert that no event arrives within the silence window.
pub async fn expect_silence(link: &mut LocalLink) {
    let outcome = tokio::time::timeout(
        Duration::from_millis(SILENCE_WINDOW_MS),
        link.events.recv(),
    )
    .await;

    if let Ok(Some(event)) = outcome {
        panic!("Expected no event, got {event:?}");
    }
}
