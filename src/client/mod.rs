//! Chat client runtime
//!
//! A client first completes the registration [`handshake`], then runs a
//! [`ClientSession`]: a sender unit and a receiver unit that stop together
//! on `quit`, end of input, broker loss, or the process shutdown signal.

pub mod console;
pub mod formatter;
pub mod handshake;
pub mod input;
pub mod receiver;
pub mod sender;
pub mod session;

pub use console::{Console, ConsoleEvent, Delivery, Terminal};
pub use handshake::{HandshakeState, RegistrationPolicy};
pub use input::InputLines;
pub use sender::SenderExit;
pub use session::ClientSession;

use tracing::info;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::shutdown::Shutdown;
use crate::transport::{ws, Publish, Receive};

/// Connect to the broker over WebSocket and chat on stdin/stdout
///
/// Connection failures are returned immediately; they are the client's
/// fatal startup errors.
pub async fn run_client(config: ClientConfig, shutdown: Shutdown) -> Result<(), ClientError> {
    let publisher = ws::connect_publisher(&config.inbound_url).await?;
    let subscriber = ws::connect_subscriber(&config.outbound_url, "").await?;
    info!(
        "Connected to broker ({} / {})",
        config.inbound_url, config.outbound_url
    );

    run(
        publisher,
        subscriber,
        InputLines::stdin(shutdown.clone()),
        Terminal,
        &config.registration,
        shutdown,
    )
    .await?;

    Ok(())
}

/// Register, then chat until the session ends
///
/// Returns `Ok(None)` when the user left before registering (end of
/// input or shutdown during the handshake).
pub async fn run<P, R, C>(
    mut publisher: P,
    mut subscriber: R,
    mut input: InputLines,
    mut console: C,
    policy: &RegistrationPolicy,
    shutdown: Shutdown,
) -> Result<Option<SenderExit>, ClientError>
where
    P: Publish + 'static,
    R: Receive + 'static,
    C: Console + Clone,
{
    let registered = handshake::register(
        &mut publisher,
        &mut subscriber,
        &mut input,
        &mut console,
        policy,
        &shutdown,
    )
    .await;

    let username = match registered {
        Ok(username) => username,
        Err(e) => {
            publisher.close().await;
            subscriber.close().await;
            return match e {
                ClientError::Cancelled | ClientError::InputClosed => Ok(None),
                other => Err(other),
            };
        }
    };

    console.show(ConsoleEvent::Welcome(username.clone()));

    let session = ClientSession::start(
        username,
        publisher,
        subscriber,
        input,
        console.clone(),
        shutdown,
    );
    let exit = session.join().await?;

    console.show(ConsoleEvent::Goodbye);
    Ok(Some(exit))
}
