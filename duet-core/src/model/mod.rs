mod party;
mod room;
mod signaling;

pub use party::PartyId;
pub use room::RoomId;
pub use signaling::{ClientMessage, IceServerConfig, RelayEvent, SignalEnvelope, SignalPayload};
