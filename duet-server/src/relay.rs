use crate::registry::RendezvousRegistry;
use dashmap::DashMap;
use duet_core::{PartyId, RelayEvent, RoomId, SignalEnvelope};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// The channel a party's events are pushed into. For a WebSocket party
/// the other end feeds the socket; for a local party it feeds the
/// RoomController directly.
pub type EventSink = mpsc::UnboundedSender<RelayEvent>;

/// Routes opaque negotiation messages between subscribed parties and
/// broadcasts membership changes to room peers. Delivery is best-effort:
/// a signal for a party that is no longer subscribed is dropped silently,
/// since negotiation state is superseded by fresher messages anyway.
pub struct SignalRelay {
    registry: Arc<RendezvousRegistry>,
    sinks: DashMap<PartyId, EventSink>,
}

impl SignalRelay {
    pub fn new(registry: Arc<RendezvousRegistry>) -> Self {
        Self {
            registry,
            sinks: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &RendezvousRegistry {
        &self.registry
    }

    pub fn subscribe(&self, party: PartyId, sink: EventSink) {
        self.sinks.insert(party, sink);
    }

    pub fn unsubscribe(&self, party: &PartyId) {
        self.sinks.remove(party);
    }

    /// Deliver the envelope to its recipient verbatim, substituting the
    /// sender for the target. The payload is never inspected.
    pub fn route(&self, envelope: SignalEnvelope) {
        let SignalEnvelope { from, to, payload } = envelope;
        self.push(&to, RelayEvent::Signal { from, payload });
    }

    /// Tell every existing member of the room that `new_party` arrived.
    pub fn notify_join(&self, room: &RoomId, new_party: &PartyId) {
        for member in self.registry.members_of(room) {
            if member == *new_party {
                continue;
            }
            self.push(
                &member,
                RelayEvent::UserJoined {
                    party_id: new_party.clone(),
                },
            );
        }
    }

    /// Tell every remaining member of the room that `leaving_party` left.
    pub fn notify_leave(&self, room: &RoomId, leaving_party: &PartyId) {
        for member in self.registry.members_of(room) {
            if member == *leaving_party {
                continue;
            }
            self.push(
                &member,
                RelayEvent::UserLeft {
                    party_id: leaving_party.clone(),
                },
            );
        }
    }

    /// Push one event to one party, dropping it if the party is gone.
    pub fn push(&self, party: &PartyId, event: RelayEvent) {
        let Some(sink) = self.sinks.get(party) else {
            debug!("Dropping event for unsubscribed party {party}");
            return;
        };
        if sink.send(event).is_err() {
            debug!("Sink for {party} is closed, event dropped");
        }
    }
}
