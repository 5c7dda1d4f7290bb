//! Sender unit
//!
//! Reads user lines, encodes them and publishes them until the user
//! quits, input ends, or shutdown is signalled. On the way out it always
//! tries to release the username and then signals shutdown so the
//! receiver stops too.

use tracing::{debug, info, warn};

use super::console::{Console, ConsoleEvent};
use super::input::{parse_line, InputLines, OutgoingLine};
use crate::message::Envelope;
use crate::shutdown::Shutdown;
use crate::transport::Publish;
use crate::types::Username;

/// Why the sender stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderExit {
    /// User typed `quit`
    Quit,
    /// Local input reached end of file
    InputClosed,
    /// Shutdown signal observed
    Shutdown,
}

/// Run the sender until it exits
///
/// Prompts before every read and echoes each message once it is
/// published.
pub async fn run_sender<P: Publish, C: Console>(
    username: Username,
    mut publisher: P,
    mut input: InputLines,
    mut console: C,
    shutdown: Shutdown,
) -> SenderExit {
    let exit = loop {
        if shutdown.is_triggered() {
            break SenderExit::Shutdown;
        }

        console.show(ConsoleEvent::MessagePrompt);
        let line = tokio::select! {
            _ = shutdown.wait() => break SenderExit::Shutdown,
            line = input.next_line() => match line {
                Some(line) => line,
                None => break SenderExit::InputClosed,
            },
        };

        match parse_line(&line) {
            OutgoingLine::Skip => continue,
            OutgoingLine::Quit => break SenderExit::Quit,
            OutgoingLine::Send { target, body } => {
                let wire = Envelope::chat(username.as_str(), target.clone(), body.as_str()).encode();
                match publisher.publish(wire).await {
                    Ok(()) => console.show(ConsoleEvent::Sent { target, body }),
                    Err(e) => warn!("Failed to send message: {}", e),
                }
            }
        }
    };

    info!("Sender stopping ({:?})", exit);

    let leaving = Envelope::unregister(username.as_str()).encode();
    if let Err(e) = publisher.publish(leaving).await {
        debug!("Could not release '{}' on the way out: {}", username, e);
    }
    publisher.close().await;
    shutdown.trigger();

    exit
}
