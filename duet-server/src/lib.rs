mod config;
mod link;
mod registry;
mod relay;
mod ws;

pub use config::RelayConfig;
pub use link::{LocalLink, attach_local, detach, dispatch};
pub use registry::{JoinOutcome, RendezvousRegistry, RoomFull};
pub use relay::{EventSink, SignalRelay};
pub use ws::{AppState, router, ws_handler};
