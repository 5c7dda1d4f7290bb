//! Registration handshake
//!
//! Runs once per client process before chat starts:
//!
//! ```text
//! NAMING --valid name--> AWAITING_REPLY --REGISTER_OK--> REGISTERED
//!    ^                        |
//!    +------REGISTER_FAIL-----+
//! ```
//!
//! Each REGISTER waits at most `reply_timeout` for its answer and is
//! re-sent on timeout, up to `max_attempts` sends in total.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::console::{Console, ConsoleEvent};
use super::input::InputLines;
use crate::error::{ClientError, UsernameError};
use crate::message::{Command, Envelope};
use crate::shutdown::Shutdown;
use crate::transport::{Publish, Receive};
use crate::types::Username;

/// Default wait for a broker reply
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(3);

/// Default number of REGISTER sends per candidate name
pub const DEFAULT_REGISTER_ATTEMPTS: u32 = 3;

/// Bounded-wait policy for the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationPolicy {
    pub reply_timeout: Duration,
    pub max_attempts: u32,
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            max_attempts: DEFAULT_REGISTER_ATTEMPTS,
        }
    }
}

/// Handshake states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    /// Waiting for the user to pick a name
    Naming,
    /// REGISTER sent, waiting for the broker
    AwaitingReply { name: Username, attempt: u32 },
    /// Broker confirmed the claim
    Registered(Username),
}

/// Outcome of waiting for one reply
#[derive(Debug)]
enum Reply {
    Accepted,
    Refused(String),
    TimedOut,
}

/// Run the handshake until a username is confirmed
///
/// Returns `Cancelled` on shutdown, `InputClosed` at end of input and
/// `RegistrationTimeout` when the broker never answers.
pub async fn register<P, R, C>(
    publisher: &mut P,
    subscriber: &mut R,
    input: &mut InputLines,
    console: &mut C,
    policy: &RegistrationPolicy,
    shutdown: &Shutdown,
) -> Result<Username, ClientError>
where
    P: Publish,
    R: Receive,
    C: Console,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut state = HandshakeState::Naming;

    loop {
        state = match state {
            HandshakeState::Naming => {
                console.show(ConsoleEvent::NamePrompt);

                let line = tokio::select! {
                    _ = shutdown.wait() => return Err(ClientError::Cancelled),
                    line = input.next_line() => line.ok_or(ClientError::InputClosed)?,
                };

                match Username::parse(line.trim()) {
                    Ok(name) => {
                        send_register(publisher, &name).await;
                        HandshakeState::AwaitingReply { name, attempt: 1 }
                    }
                    Err(UsernameError::Empty) => {
                        console.show(ConsoleEvent::EmptyName);
                        HandshakeState::Naming
                    }
                    Err(e) => {
                        console.show(ConsoleEvent::InvalidName(e));
                        HandshakeState::Naming
                    }
                }
            }
            HandshakeState::AwaitingReply { name, attempt } => {
                match await_reply(subscriber, &name, policy.reply_timeout, shutdown).await? {
                    Reply::Accepted => HandshakeState::Registered(name),
                    Reply::Refused(reason) => {
                        let event = if reason == "taken" && attempt > 1 {
                            // Replies carry no request id, so this may be the
                            // answer to our own re-send after the first
                            // REGISTER claimed the name and its OK was lost.
                            warn!(
                                "'{}' reported taken after {} attempts; an earlier attempt may hold it",
                                name, attempt
                            );
                            ConsoleEvent::NameTakenAfterRetry(name.to_string())
                        } else if reason == "taken" {
                            ConsoleEvent::NameTaken(name.to_string())
                        } else {
                            ConsoleEvent::NameRejected {
                                name: name.to_string(),
                                reason,
                            }
                        };
                        console.show(event);
                        HandshakeState::Naming
                    }
                    Reply::TimedOut if attempt < max_attempts => {
                        warn!(
                            "No registration reply for '{}' (attempt {}/{}), retrying",
                            name, attempt, max_attempts
                        );
                        send_register(publisher, &name).await;
                        HandshakeState::AwaitingReply {
                            name,
                            attempt: attempt + 1,
                        }
                    }
                    Reply::TimedOut => {
                        return Err(ClientError::RegistrationTimeout { attempts: attempt });
                    }
                }
            }
            HandshakeState::Registered(name) => {
                info!("Registered as '{}'", name);
                return Ok(name);
            }
        };
    }
}

async fn send_register<P: Publish>(publisher: &mut P, name: &Username) {
    // A lost REGISTER shows up as a reply timeout and is retried there.
    if let Err(e) = publisher
        .publish(Envelope::register(name.as_str()).encode())
        .await
    {
        warn!("Failed to send registration for '{}': {}", name, e);
    }
}

/// Wait for the REGISTER_OK / REGISTER_FAIL addressed to `name`
///
/// Everything else on the fan-out is skipped.
async fn await_reply<R: Receive>(
    subscriber: &mut R,
    name: &Username,
    wait: Duration,
    shutdown: &Shutdown,
) -> Result<Reply, ClientError> {
    let deadline = Instant::now() + wait;

    loop {
        let received = tokio::select! {
            _ = shutdown.wait() => return Err(ClientError::Cancelled),
            received = tokio::time::timeout_at(deadline, subscriber.receive()) => received,
        };

        let raw = match received {
            Err(_elapsed) => return Ok(Reply::TimedOut),
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) if e.is_closed() => return Err(e.into()),
            Ok(Err(e)) => {
                warn!("Receive failed while awaiting registration: {}", e);
                continue;
            }
        };

        match Envelope::decode(&raw) {
            Ok(Envelope::Control {
                command: Command::RegisterOk,
                subject,
                ..
            }) if name == subject.as_str() => return Ok(Reply::Accepted),
            Ok(Envelope::Control {
                command: Command::RegisterFail,
                subject,
                reason,
            }) if name == subject.as_str() => return Ok(Reply::Refused(reason)),
            Ok(_) => trace!("Skipping message while awaiting registration"),
            Err(e) => debug!("Dropping malformed message: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::transport::memory;

    fn quick_policy() -> RegistrationPolicy {
        RegistrationPolicy {
            reply_timeout: Duration::from_millis(50),
            max_attempts: 2,
        }
    }

    #[tokio::test]
    async fn test_empty_and_invalid_names_stay_local() {
        let (bus, mut inbox, mut fanout) = memory::bus(16);
        let mut publisher = bus.publisher();
        let mut subscriber = bus.subscribe("");
        let (lines, mut input) = InputLines::channel();
        let (mut console, mut events) = mpsc::unbounded_channel();
        let shutdown = Shutdown::new();

        lines.send("".to_string()).unwrap();
        lines.send("all".to_string()).unwrap();
        lines.send("alice".to_string()).unwrap();

        let broker_side = tokio::spawn(async move {
            let request = inbox.receive().await.unwrap();
            fanout
                .publish(Envelope::register_ok("alice").encode())
                .await
                .unwrap();
            request
        });

        let name = register(
            &mut publisher,
            &mut subscriber,
            &mut input,
            &mut console,
            &RegistrationPolicy::default(),
            &shutdown,
        )
        .await
        .unwrap();

        assert_eq!(name.as_str(), "alice");
        // Only the valid name reached the network.
        assert_eq!(broker_side.await.unwrap(), "REGISTER:alice:request");

        assert_eq!(events.recv().await, Some(ConsoleEvent::NamePrompt));
        assert_eq!(events.recv().await, Some(ConsoleEvent::EmptyName));
        assert_eq!(events.recv().await, Some(ConsoleEvent::NamePrompt));
        assert_eq!(
            events.recv().await,
            Some(ConsoleEvent::InvalidName(UsernameError::Reserved(
                "all".to_string()
            )))
        );
        assert_eq!(events.recv().await, Some(ConsoleEvent::NamePrompt));
    }

    #[tokio::test]
    async fn test_taken_name_returns_to_naming() {
        let (bus, mut inbox, mut fanout) = memory::bus(16);
        let mut publisher = bus.publisher();
        let mut subscriber = bus.subscribe("");
        let (lines, mut input) = InputLines::channel();
        let (mut console, mut events) = mpsc::unbounded_channel();
        let shutdown = Shutdown::new();

        lines.send("alice".to_string()).unwrap();
        lines.send("alice2".to_string()).unwrap();

        tokio::spawn(async move {
            inbox.receive().await.unwrap();
            // Noise for someone else first, then the refusal.
            fanout
                .publish(Envelope::register_ok("zoe").encode())
                .await
                .unwrap();
            fanout
                .publish(Envelope::register_fail("alice", "taken").encode())
                .await
                .unwrap();
            inbox.receive().await.unwrap();
            fanout
                .publish(Envelope::register_ok("alice2").encode())
                .await
                .unwrap();
        });

        let name = register(
            &mut publisher,
            &mut subscriber,
            &mut input,
            &mut console,
            &RegistrationPolicy::default(),
            &shutdown,
        )
        .await
        .unwrap();

        assert_eq!(name.as_str(), "alice2");
        assert_eq!(events.recv().await, Some(ConsoleEvent::NamePrompt));
        assert_eq!(
            events.recv().await,
            Some(ConsoleEvent::NameTaken("alice".to_string()))
        );
    }

    #[tokio::test]
    async fn test_silent_broker_times_out_after_retries() {
        let (bus, mut inbox, _fanout) = memory::bus(16);
        let mut publisher = bus.publisher();
        let mut subscriber = bus.subscribe("");
        let (lines, mut input) = InputLines::channel();
        let (mut console, _events) = mpsc::unbounded_channel::<ConsoleEvent>();
        let shutdown = Shutdown::new();

        lines.send("alice".to_string()).unwrap();

        let result = register(
            &mut publisher,
            &mut subscriber,
            &mut input,
            &mut console,
            &quick_policy(),
            &shutdown,
        )
        .await;

        assert!(matches!(
            result,
            Err(ClientError::RegistrationTimeout { attempts: 2 })
        ));
        assert_eq!(inbox.receive().await.unwrap(), "REGISTER:alice:request");
        assert_eq!(inbox.receive().await.unwrap(), "REGISTER:alice:request");
    }

    #[tokio::test]
    async fn test_taken_after_resend_is_reported_as_ambiguous() {
        let (bus, mut inbox, mut fanout) = memory::bus(16);
        let mut publisher = bus.publisher();
        let mut subscriber = bus.subscribe("");
        let (lines, mut input) = InputLines::channel();
        let (mut console, mut events) = mpsc::unbounded_channel();
        let shutdown = Shutdown::new();

        lines.send("alice".to_string()).unwrap();
        lines.send("alice2".to_string()).unwrap();

        tokio::spawn(async move {
            // First REGISTER goes unanswered; the re-send is refused.
            inbox.receive().await.unwrap();
            inbox.receive().await.unwrap();
            fanout
                .publish(Envelope::register_fail("alice", "taken").encode())
                .await
                .unwrap();
            inbox.receive().await.unwrap();
            fanout
                .publish(Envelope::register_ok("alice2").encode())
                .await
                .unwrap();
        });

        let name = register(
            &mut publisher,
            &mut subscriber,
            &mut input,
            &mut console,
            &quick_policy(),
            &shutdown,
        )
        .await
        .unwrap();

        assert_eq!(name.as_str(), "alice2");
        assert_eq!(events.recv().await, Some(ConsoleEvent::NamePrompt));
        assert_eq!(
            events.recv().await,
            Some(ConsoleEvent::NameTakenAfterRetry("alice".to_string()))
        );
    }

    #[tokio::test]
    async fn test_shutdown_cancels_naming() {
        let (bus, _inbox, _fanout) = memory::bus(16);
        let mut publisher = bus.publisher();
        let mut subscriber = bus.subscribe("");
        let (_lines, mut input) = InputLines::channel();
        let (mut console, _events) = mpsc::unbounded_channel::<ConsoleEvent>();
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let result = register(
            &mut publisher,
            &mut subscriber,
            &mut input,
            &mut console,
            &RegistrationPolicy::default(),
            &shutdown,
        )
        .await;

        assert!(matches!(result, Err(ClientError::Cancelled)));
    }

    #[tokio::test]
    async fn test_end_of_input_while_naming() {
        let (bus, _inbox, _fanout) = memory::bus(16);
        let mut publisher = bus.publisher();
        let mut subscriber = bus.subscribe("");
        let (lines, mut input) = InputLines::channel();
        let (mut console, _events) = mpsc::unbounded_channel::<ConsoleEvent>();
        drop(lines);

        let result = register(
            &mut publisher,
            &mut subscriber,
            &mut input,
            &mut console,
            &RegistrationPolicy::default(),
            &Shutdown::new(),
        )
        .await;

        assert!(matches!(result, Err(ClientError::InputClosed)));
    }
}
