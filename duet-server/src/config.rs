use duet_core::IceServerConfig;
use std::env;

const DEFAULT_STUN: &str = "stun:stun.l.google.com:19302";

/// Relay-side configuration. The ICE list is handed to every party in
/// its welcome; TURN credentials come from the environment so they never
/// live in the client.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl RelayConfig {
    /// Default STUN plus an optional TURN entry from `TURN_URL`,
    /// `TURN_USERNAME` and `TURN_CREDENTIAL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(turn_url) = env::var("TURN_URL") {
            config.ice_servers.push(IceServerConfig {
                urls: vec![turn_url],
                username: env::var("TURN_USERNAME").ok(),
                credential: env::var("TURN_CREDENTIAL").ok(),
            });
        }

        config
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN.to_owned()],
                username: None,
                credential: None,
            }],
        }
    }
}
