use crate::registry::RoomFull;
use crate::relay::SignalRelay;
use duet_core::{ClientMessage, IceServerConfig, PartyId, RelayEvent, SignalEnvelope};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// An in-process attachment to the relay: the same message path a
/// WebSocket party gets, minus the socket. A RoomController (or a test)
/// plugs straight into the two channels.
pub struct LocalLink {
    pub party_id: PartyId,
    pub outbound: mpsc::UnboundedSender<ClientMessage>,
    pub events: mpsc::UnboundedReceiver<RelayEvent>,
}

/// Attach a new party to the relay. Assigns its id, subscribes a sink,
/// delivers the welcome, and spawns the pump that dispatches its client
/// messages. Dropping the outbound sender is an implicit disconnect.
pub fn attach_local(relay: &Arc<SignalRelay>, ice_servers: Vec<IceServerConfig>) -> LocalLink {
    let party_id = PartyId::new();

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    relay.subscribe(party_id.clone(), event_tx.clone());
    let _ = event_tx.send(RelayEvent::Welcome {
        party_id: party_id.clone(),
        ice_servers,
    });

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ClientMessage>();

    let relay = Arc::clone(relay);
    let pump_id = party_id.clone();
    tokio::spawn(async move {
        info!("Local party attached: {pump_id}");
        while let Some(msg) = outbound_rx.recv().await {
            dispatch(&relay, &pump_id, msg);
        }
        detach(&relay, &pump_id);
        info!("Local party detached: {pump_id}");
    });

    LocalLink {
        party_id,
        outbound: outbound_tx,
        events: event_rx,
    }
}

/// Handle one client message for one party. Shared by the WebSocket
/// handler and local attachments so both surfaces behave identically.
pub fn dispatch(relay: &SignalRelay, party: &PartyId, msg: ClientMessage) {
    match msg {
        ClientMessage::JoinRoom { room } => match relay.registry().join(&room, party.clone()) {
            Ok(outcome) => {
                info!(
                    "Party {party} joined room {room} ({} already present)",
                    outcome.existing.len()
                );
                relay.notify_join(&room, party);
            }
            Err(RoomFull) => {
                debug!("Party {party} rejected from full room {room}");
                relay.push(party, RelayEvent::RoomFull);
            }
        },

        ClientMessage::Signal { target, payload } => {
            relay.route(SignalEnvelope {
                from: party.clone(),
                to: target,
                payload,
            });
        }

        ClientMessage::LeaveRoom => leave_all(relay, party),
    }
}

/// Final cleanup for a party whose connection is gone: implicit leave
/// for every occupied room, then drop the sink.
pub fn detach(relay: &SignalRelay, party: &PartyId) {
    leave_all(relay, party);
    relay.unsubscribe(party);
}

fn leave_all(relay: &SignalRelay, party: &PartyId) {
    for room in relay.registry().rooms_of(party) {
        if relay.registry().leave(&room, party) {
            relay.notify_leave(&room, party);
        }
    }
}
