mod controller;
mod observer;
mod session;
mod transport;

pub use controller::{RoomController, RoomHandle};
pub use observer::{MessageSource, RoomObserver, Status};
pub use session::{ConnectionSession, NegotiationState, Role, SessionError};
pub use transport::{PeerTransport, TransportEvent};
