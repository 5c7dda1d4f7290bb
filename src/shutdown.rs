//! Process-wide shutdown signal
//!
//! A cloneable, set-once cancellation signal built on `tokio::sync::watch`.
//! Every long-running unit receives its own clone at creation and selects
//! its blocking operation against [`Shutdown::wait`].

use std::sync::Arc;

use tokio::sync::watch;

/// Set-once shutdown signal shared by all units of a process
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Set the signal. Calling it again is a no-op.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once the signal is set
    ///
    /// Cancel-safe, so it can sit in a `select!` loop.
    pub async fn wait(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any clone of `self`, so this only
        // returns once the flag is set.
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
