//! Runtime configuration for both roles
//!
//! Plain structs with defaults; `cli` fills them from the command line.

use std::net::SocketAddr;

use crate::client::RegistrationPolicy;

/// Default port for client → broker traffic
pub const DEFAULT_INBOUND_PORT: u16 = 5555;

/// Default port for broker → client fan-out
pub const DEFAULT_OUTBOUND_PORT: u16 = 5556;

/// Default broker host for clients
pub const DEFAULT_BROKER_HOST: &str = "127.0.0.1";

/// Buffer size for the broker's inbound queue and fan-out
pub const CHANNEL_BUFFER_SIZE: usize = 256;

/// Broker settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Where clients publish
    pub inbound: SocketAddr,
    /// Where clients subscribe
    pub outbound: SocketAddr,
    /// Inbound queue and fan-out capacity
    pub capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            inbound: SocketAddr::from(([0, 0, 0, 0], DEFAULT_INBOUND_PORT)),
            outbound: SocketAddr::from(([0, 0, 0, 0], DEFAULT_OUTBOUND_PORT)),
            capacity: CHANNEL_BUFFER_SIZE,
        }
    }
}

/// Client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// URL of the broker's inbound listener
    pub inbound_url: String,
    /// URL of the broker's outbound listener
    pub outbound_url: String,
    pub registration: RegistrationPolicy,
}

impl ClientConfig {
    /// Config for a broker on `host` with the given ports
    pub fn new(host: &str, inbound_port: u16, outbound_port: u16) -> Self {
        Self {
            inbound_url: ws_url(host, inbound_port),
            outbound_url: ws_url(host, outbound_port),
            registration: RegistrationPolicy::default(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_BROKER_HOST,
            DEFAULT_INBOUND_PORT,
            DEFAULT_OUTBOUND_PORT,
        )
    }
}

/// WebSocket URL for `host:port`, bracketing IPv6 literals
pub fn ws_url(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("ws://[{}]:{}", host, port)
    } else {
        format!("ws://{}:{}", host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url() {
        assert_eq!(ws_url("127.0.0.1", 5555), "ws://127.0.0.1:5555");
        assert_eq!(ws_url("chat.local", 80), "ws://chat.local:80");
        assert_eq!(ws_url("::1", 5556), "ws://[::1]:5556");
    }

    #[test]
    fn test_client_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.inbound_url, "ws://127.0.0.1:5555");
        assert_eq!(config.outbound_url, "ws://127.0.0.1:5556");
        assert_eq!(config.registration, RegistrationPolicy::default());
    }
}
