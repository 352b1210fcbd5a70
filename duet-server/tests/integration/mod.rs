pub mod membership_tests;
pub mod routing_tests;

use duet_server::{RendezvousRegistry, SignalRelay};
use std::sync::Arc;
use tracing::Level;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_relay() -> Arc<SignalRelay> {
    Arc::new(SignalRelay::new(Arc::new(RendezvousRegistry::new())))
}
