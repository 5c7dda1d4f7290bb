//! Registered client session
//!
//! Owns the confirmed username and the two concurrent units. The
//! sender and receiver each own a distinct transport endpoint; the only
//! things they share are the immutable username and the shutdown signal.

use tokio::task::JoinHandle;
use tracing::debug;

use super::console::Console;
use super::input::InputLines;
use super::receiver::run_receiver;
use super::sender::{run_sender, SenderExit};
use crate::error::ClientError;
use crate::shutdown::Shutdown;
use crate::transport::{Publish, Receive};
use crate::types::Username;

/// A running chat session
#[derive(Debug)]
pub struct ClientSession {
    username: Username,
    shutdown: Shutdown,
    sender: JoinHandle<SenderExit>,
    receiver: JoinHandle<()>,
}

impl ClientSession {
    /// Spawn the sender and receiver units
    pub fn start<P, R, C>(
        username: Username,
        publisher: P,
        subscriber: R,
        input: InputLines,
        console: C,
        shutdown: Shutdown,
    ) -> Self
    where
        P: Publish + 'static,
        R: Receive + 'static,
        C: Console + Clone,
    {
        let sender = tokio::spawn(run_sender(
            username.clone(),
            publisher,
            input,
            console.clone(),
            shutdown.clone(),
        ));
        let receiver = tokio::spawn(run_receiver(
            username.clone(),
            subscriber,
            console,
            shutdown.clone(),
        ));

        Self {
            username,
            shutdown,
            sender,
            receiver,
        }
    }

    /// The confirmed username
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Ask both units to stop
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Wait until both units have returned
    ///
    /// Both handles are always awaited, even if one of them failed.
    pub async fn join(self) -> Result<SenderExit, ClientError> {
        let (sender, receiver) = tokio::join!(self.sender, self.receiver);
        debug!("Session for '{}' ended", self.username);
        receiver?;
        sender.map_err(ClientError::from)
    }
}
