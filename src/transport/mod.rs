//! Publish/subscribe transport seam
//!
//! Broker and client only ever talk to the network through [`Publish`]
//! and [`Receive`]. Two implementations are provided:
//! - [`ws`]: WebSocket listeners and connections (tokio-tungstenite)
//! - [`memory`]: in-process channels, used by tests and embedders

use async_trait::async_trait;

use crate::error::TransportError;

pub mod memory;
pub mod ws;

/// Sending half of a transport endpoint
///
/// Best-effort: no delivery acknowledgement. Publishing while nobody is
/// subscribed is not an error.
#[async_trait]
pub trait Publish: Send {
    async fn publish(&mut self, payload: String) -> Result<(), TransportError>;

    /// Release the endpoint
    async fn close(&mut self) {}
}

/// Receiving half of a transport endpoint
///
/// `receive` must be cancel-safe: dropping the future before it resolves
/// must not lose a message. Returns `TransportError::Closed` once the
/// endpoint is gone.
#[async_trait]
pub trait Receive: Send {
    async fn receive(&mut self) -> Result<String, TransportError>;

    /// Release the endpoint
    async fn close(&mut self) {}
}

/// Subscription filter: a message is delivered if it starts with `prefix`
///
/// An empty prefix matches everything.
fn matches_prefix(prefix: &str, payload: &str) -> bool {
    payload.starts_with(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_filter() {
        assert!(matches_prefix("", "alice:all:hi"));
        assert!(matches_prefix("SYSTEM", "SYSTEM:all:bye"));
        assert!(!matches_prefix("SYSTEM", "alice:all:hi"));
    }
}
