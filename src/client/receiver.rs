//! Receiver unit
//!
//! Consumes the broker's fan-out and shows only what is addressed to
//! this user.

use tracing::{debug, trace, warn};

use super::console::{Console, ConsoleEvent, Delivery};
use crate::message::{Command, Envelope};
use crate::shutdown::Shutdown;
use crate::transport::Receive;
use crate::types::{Target, Username};

/// Decide whether `username` should see `envelope`
///
/// - chat addressed to `all` or to this user, not sent by this user
/// - `SYSTEM` notices addressed to `all` or to this user
/// - never registration traffic
pub fn route(username: &Username, envelope: Envelope) -> Option<Delivery> {
    match envelope {
        Envelope::Control {
            command: Command::System,
            subject,
            reason,
        } => Target::from_wire(&subject)
            .includes(username)
            .then_some(Delivery::System(reason)),
        Envelope::Control { .. } => None,
        Envelope::Chat {
            sender,
            target,
            body,
        } => {
            if username == sender.as_str() || !target.includes(username) {
                return None;
            }
            Some(Delivery::Chat { from: sender, body })
        }
    }
}

/// Run the receiver until shutdown or transport closure
///
/// A closed transport means the broker is gone, so it also signals
/// shutdown for the sender.
pub async fn run_receiver<R: Receive, C: Console>(
    username: Username,
    mut subscriber: R,
    mut console: C,
    shutdown: Shutdown,
) {
    loop {
        if shutdown.is_triggered() {
            break;
        }

        let received = tokio::select! {
            _ = shutdown.wait() => break,
            received = subscriber.receive() => received,
        };

        match received {
            Ok(raw) => match Envelope::decode(&raw) {
                Ok(envelope) => {
                    if let Some(delivery) = route(&username, envelope) {
                        console.show(ConsoleEvent::Delivery(delivery));
                        console.show(ConsoleEvent::MessagePrompt);
                    }
                }
                Err(e) => trace!("Dropping malformed message: {}", e),
            },
            Err(e) if e.is_closed() => {
                if !shutdown.is_triggered() {
                    warn!("Lost connection to broker");
                    shutdown.trigger();
                }
                break;
            }
            Err(e) => warn!("Failed to receive message: {}", e),
        }
    }

    debug!("Receiver stopping");
    subscriber.close().await;
}
