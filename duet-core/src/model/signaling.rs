use crate::model::{PartyId, RoomId};
use serde::{Deserialize, Serialize};

/// One STUN/TURN entry handed to the transport layer. The relay only
/// carries this as configuration data; it never talks to these servers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Negotiation payload relayed verbatim between the two parties. The
/// relay never inspects it; only the remote session does.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalPayload {
    Offer {
        sdp: String,
    },
    Answer {
        sdp: String,
    },
    IceCandidate {
        candidate: String,
        sdp_mid: Option<String>,
        sdp_m_line_index: Option<u16>,
    },
}

/// Client -> relay messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum ClientMessage {
    JoinRoom {
        room: RoomId,
    },
    Signal {
        target: PartyId,
        payload: SignalPayload,
    },
    LeaveRoom,
}

/// Relay -> client events. `Signal` carries `from` where the outbound
/// message carried `target`; the relay substitutes it during routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum RelayEvent {
    Welcome {
        party_id: PartyId,
        ice_servers: Vec<IceServerConfig>,
    },
    RoomFull,
    UserJoined {
        party_id: PartyId,
    },
    UserLeft {
        party_id: PartyId,
    },
    Signal {
        from: PartyId,
        payload: SignalPayload,
    },
}

/// An in-flight negotiation message. Exists only between `route` and the
/// recipient's sink; never stored.
#[derive(Debug, Clone)]
pub struct SignalEnvelope {
    pub from: PartyId,
    pub to: PartyId,
    pub payload: SignalPayload,
}
