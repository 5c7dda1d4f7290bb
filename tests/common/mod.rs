//! Helpers shared by the integration tests

#![allow(dead_code)]

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use pubsub_chat::client::{self, ConsoleEvent, Delivery, RegistrationPolicy, SenderExit};
use pubsub_chat::transport::{Publish, Receive};
use pubsub_chat::{ClientError, Shutdown};

pub const STEP: Duration = Duration::from_secs(2);

/// A client driven by the test instead of a terminal
pub struct TestClient {
    pub lines: mpsc::UnboundedSender<String>,
    pub events: mpsc::UnboundedReceiver<ConsoleEvent>,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<Option<SenderExit>, ClientError>>,
}

impl TestClient {
    pub fn spawn<P, R>(publisher: P, subscriber: R) -> Self
    where
        P: Publish + 'static,
        R: Receive + 'static,
    {
        let (lines, input) = client::InputLines::channel();
        let (console, events) = mpsc::unbounded_channel();
        let shutdown = Shutdown::new();

        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                let policy = RegistrationPolicy::default();
                client::run(publisher, subscriber, input, console, &policy, shutdown).await
            })
        };

        Self {
            lines,
            events,
            shutdown,
            handle,
        }
    }

    pub fn type_line(&self, line: &str) {
        self.lines.send(line.to_string()).expect("client input closed");
    }

    pub async fn next_event(&mut self) -> ConsoleEvent {
        tokio::time::timeout(STEP, self.events.recv())
            .await
            .expect("timed out waiting for console event")
            .expect("console closed")
    }

    /// Type a name and wait for the welcome
    pub async fn register(&mut self, name: &str) {
        self.type_line(name);
        loop {
            match self.next_event().await {
                ConsoleEvent::Welcome(confirmed) => {
                    assert_eq!(confirmed.as_str(), name);
                    return;
                }
                ConsoleEvent::NamePrompt => continue,
                other => panic!("unexpected event while registering {name}: {other:?}"),
            }
        }
    }

    /// Next chat delivery, skipping system notices
    pub async fn next_chat(&mut self) -> (String, String) {
        loop {
            if let ConsoleEvent::Delivery(Delivery::Chat { from, body }) = self.next_event().await
            {
                return (from, body);
            }
        }
    }

    /// Next system notice, skipping chat
    pub async fn next_system(&mut self) -> String {
        loop {
            if let ConsoleEvent::Delivery(Delivery::System(text)) = self.next_event().await {
                return text;
            }
        }
    }

    /// Signal shutdown and wait for the client to return
    pub async fn stop(self) -> Option<SenderExit> {
        self.shutdown.trigger();
        self.finish().await
    }

    /// Wait for the client to return on its own
    pub async fn finish(self) -> Option<SenderExit> {
        tokio::time::timeout(STEP, self.handle)
            .await
            .expect("client did not stop")
            .expect("client task panicked")
            .expect("client failed")
    }
}
