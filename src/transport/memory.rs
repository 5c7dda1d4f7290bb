//! In-process transport
//!
//! Client publishers feed one `mpsc` queue that the broker drains in
//! arrival order; the broker's fan-out is a `broadcast` channel that every
//! subscriber gets its own receiver from.

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use super::{matches_prefix, Publish, Receive};
use crate::error::TransportError;

/// Create a bus with the given queue and fan-out capacity
///
/// Returns the client-facing handle plus the broker's inbound and
/// outbound endpoints.
pub fn bus(capacity: usize) -> (Bus, MemoryInbox, MemoryFanout) {
    let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
    let (fanout_tx, _) = broadcast::channel(capacity);

    let bus = Bus {
        inbound: inbound_tx,
        fanout: fanout_tx.clone(),
    };
    (
        bus,
        MemoryInbox { queue: inbound_rx },
        MemoryFanout { sender: fanout_tx },
    )
}

/// Client-side handle for creating endpoints
#[derive(Debug, Clone)]
pub struct Bus {
    inbound: mpsc::Sender<String>,
    fanout: broadcast::Sender<String>,
}

impl Bus {
    /// Endpoint that publishes into the broker's inbound queue
    pub fn publisher(&self) -> MemoryPublisher {
        MemoryPublisher {
            inbound: Some(self.inbound.clone()),
        }
    }

    /// Endpoint that receives the broker's fan-out
    ///
    /// Only messages published after this call are seen.
    pub fn subscribe(&self, prefix: &str) -> MemorySubscriber {
        MemorySubscriber {
            fanout: Some(self.fanout.subscribe()),
            prefix: prefix.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct MemoryPublisher {
    inbound: Option<mpsc::Sender<String>>,
}

#[async_trait]
impl Publish for MemoryPublisher {
    async fn publish(&mut self, payload: String) -> Result<(), TransportError> {
        let Some(inbound) = self.inbound.as_ref() else {
            return Err(TransportError::Closed);
        };
        inbound
            .send(payload)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) {
        self.inbound = None;
    }
}

#[derive(Debug)]
pub struct MemorySubscriber {
    fanout: Option<broadcast::Receiver<String>>,
    prefix: String,
}

#[async_trait]
impl Receive for MemorySubscriber {
    async fn receive(&mut self) -> Result<String, TransportError> {
        let Some(fanout) = self.fanout.as_mut() else {
            return Err(TransportError::Closed);
        };

        loop {
            match fanout.recv().await {
                Ok(payload) if matches_prefix(&self.prefix, &payload) => return Ok(payload),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    return Err(TransportError::Lagged(skipped))
                }
                Err(broadcast::error::RecvError::Closed) => return Err(TransportError::Closed),
            }
        }
    }

    async fn close(&mut self) {
        self.fanout = None;
    }
}

/// Broker's inbound queue
#[derive(Debug)]
pub struct MemoryInbox {
    queue: mpsc::Receiver<String>,
}

#[async_trait]
impl Receive for MemoryInbox {
    async fn receive(&mut self) -> Result<String, TransportError> {
        self.queue.recv().await.ok_or(TransportError::Closed)
    }

    async fn close(&mut self) {
        self.queue.close();
    }
}

/// Broker's fan-out
#[derive(Debug)]
pub struct MemoryFanout {
    sender: broadcast::Sender<String>,
}

impl MemoryFanout {
    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl Publish for MemoryFanout {
    async fn publish(&mut self, payload: String) -> Result<(), TransportError> {
        // No subscribers is not a failure for a fan-out.
        let _ = self.sender.send(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publisher_reaches_inbox_in_order() {
        let (bus, mut inbox, _fanout) = bus(8);
        let mut first = bus.publisher();
        let mut second = bus.publisher();

        first.publish("one".to_string()).await.unwrap();
        second.publish("two".to_string()).await.unwrap();
        first.publish("three".to_string()).await.unwrap();

        assert_eq!(inbox.receive().await.unwrap(), "one");
        assert_eq!(inbox.receive().await.unwrap(), "two");
        assert_eq!(inbox.receive().await.unwrap(), "three");
    }

    #[tokio::test]
    async fn test_fanout_reaches_every_subscriber() {
        let (bus, _inbox, mut fanout) = bus(8);
        let mut a = bus.subscribe("");
        let mut b = bus.subscribe("");

        fanout.publish("alice:all:hi".to_string()).await.unwrap();

        assert_eq!(a.receive().await.unwrap(), "alice:all:hi");
        assert_eq!(b.receive().await.unwrap(), "alice:all:hi");
    }

    #[tokio::test]
    async fn test_subscriber_prefix_filter() {
        let (bus, _inbox, mut fanout) = bus(8);
        let mut system_only = bus.subscribe("SYSTEM");

        fanout.publish("alice:all:hi".to_string()).await.unwrap();
        fanout.publish("SYSTEM:all:bye".to_string()).await.unwrap();

        assert_eq!(system_only.receive().await.unwrap(), "SYSTEM:all:bye");
    }

    #[tokio::test]
    async fn test_fanout_without_subscribers_is_ok() {
        let (_bus, _inbox, mut fanout) = bus(8);
        assert!(fanout.publish("x:all:y".to_string()).await.is_ok());
    }

    #[tokio::test]
    async fn test_closed_endpoints() {
        let (bus, _inbox, _fanout) = bus(8);
        let mut publisher = bus.publisher();
        let mut subscriber = bus.subscribe("");

        publisher.close().await;
        subscriber.close().await;

        assert!(matches!(
            publisher.publish("a:all:b".to_string()).await,
            Err(TransportError::Closed)
        ));
        assert!(matches!(
            subscriber.receive().await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_lagged_subscriber_reports_skip() {
        let (bus, _inbox, mut fanout) = bus(2);
        let mut slow = bus.subscribe("");

        for i in 0..4 {
            fanout.publish(format!("a:all:{i}")).await.unwrap();
        }

        assert!(matches!(slow.receive().await, Err(TransportError::Lagged(2))));
        assert_eq!(slow.receive().await.unwrap(), "a:all:2");
    }
}
