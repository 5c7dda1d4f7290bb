//! Broker implementation
//!
//! The single source of truth for username uniqueness and a stateless
//! relay for chat content. One task drains the inbound queue strictly in
//! arrival order, so two REGISTERs for the same name are decided in the
//! order they arrived.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::message::{Command, Envelope, Frame};
use crate::registry::UsernameRegistry;
use crate::shutdown::Shutdown;
use crate::transport::{Publish, Receive};
use crate::types::Username;

/// The broker
///
/// Owns the registry, the inbound queue and the outbound fan-out.
pub struct Broker<I, O> {
    registry: Arc<UsernameRegistry>,
    inbox: I,
    fanout: O,
}

impl<I: Receive, O: Publish> Broker<I, O> {
    /// Create a broker with an empty registry
    pub fn new(inbox: I, fanout: O) -> Self {
        Self {
            registry: Arc::new(UsernameRegistry::new()),
            inbox,
            fanout,
        }
    }

    /// Shared handle to the registry
    pub fn registry(&self) -> Arc<UsernameRegistry> {
        Arc::clone(&self.registry)
    }

    /// Run the receive-and-relay loop
    ///
    /// Ends when shutdown is signalled or the inbound transport closes.
    pub async fn run(mut self, shutdown: Shutdown) {
        info!("Broker started");

        loop {
            if shutdown.is_triggered() {
                break;
            }

            let received = tokio::select! {
                _ = shutdown.wait() => break,
                received = self.inbox.receive() => received,
            };

            match received {
                Ok(raw) => {
                    for outbound in self.handle(&raw) {
                        if let Err(e) = self.fanout.publish(outbound).await {
                            warn!("Failed to publish: {}", e);
                        }
                    }
                }
                Err(e) if e.is_closed() => {
                    if shutdown.is_triggered() {
                        debug!("Inbound transport closed during shutdown");
                    } else {
                        info!("Inbound transport closed");
                    }
                    break;
                }
                Err(e) => warn!("Failed to receive message: {}", e),
            }
        }

        self.inbox.close().await;
        self.fanout.close().await;

        info!(
            "Broker shutting down ({} usernames claimed)",
            self.registry.len()
        );
    }

    /// Process one inbound message
    ///
    /// Returns the wire messages to fan out, in order. Every well-formed
    /// triple other than REGISTER/UNREGISTER is relayed unchanged, reply
    /// tags included; malformed input produces nothing.
    pub fn handle(&self, raw: &str) -> Vec<String> {
        let frame = match Frame::parse(raw) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Dropping malformed message: {}", e);
                return Vec::new();
            }
        };

        match frame.command() {
            Some(Command::Register) => self.handle_register(&frame.target),
            Some(Command::Unregister) => self.handle_unregister(&frame.target),
            _ if frame.body.is_some() => vec![raw.to_string()],
            _ => {
                debug!("Dropping message without body");
                Vec::new()
            }
        }
    }

    /// Handle REGISTER: test-and-set under the registry lock
    fn handle_register(&self, name: &str) -> Vec<String> {
        if let Err(e) = Username::parse(name) {
            info!("Rejected registration of '{}': {}", name, e);
            return vec![Envelope::register_fail(name, "invalid").encode()];
        }

        if self.registry.claim(name) {
            info!("Registered '{}' ({} online)", name, self.registry.len());
            vec![
                Envelope::register_ok(name).encode(),
                Envelope::system(format!("{} has joined the chat", name)).encode(),
            ]
        } else {
            info!("Username '{}' already taken", name);
            vec![Envelope::register_fail(name, "taken").encode()]
        }
    }

    /// Handle UNREGISTER: idempotent release
    fn handle_unregister(&self, name: &str) -> Vec<String> {
        if self.registry.release(name) {
            info!("Released '{}' ({} online)", name, self.registry.len());
        } else {
            debug!("Release of unclaimed '{}'", name);
        }
        vec![Envelope::system(format!("{} has left the chat", name)).encode()]
    }
}
