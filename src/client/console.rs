//! User-facing output
//!
//! Client units report everything the user should see as a
//! [`ConsoleEvent`]. [`Terminal`] prints them; tests collect them
//! through an unbounded channel instead.

use std::io::Write;

use tokio::sync::mpsc;

use super::formatter;
use crate::error::UsernameError;
use crate::types::{Target, Username};

/// A message the receiver decided to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Chat text from another user
    Chat { from: String, body: String },
    /// Broker notice
    System(String),
}

/// Everything a client can show the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    /// Ask for a candidate username
    NamePrompt,
    /// Empty input at the name prompt
    EmptyName,
    /// Candidate failed local validation
    InvalidName(UsernameError),
    /// Broker replied REGISTER_FAIL with reason "taken"
    NameTaken(String),
    /// "taken" arrived after a re-sent REGISTER, so an earlier attempt
    /// of ours may be the holder
    NameTakenAfterRetry(String),
    /// Broker replied REGISTER_FAIL with any other reason
    NameRejected { name: String, reason: String },
    /// Registration complete
    Welcome(Username),
    /// Ask for the next chat line
    MessagePrompt,
    /// Local echo of a published message
    Sent { target: Target, body: String },
    /// Incoming message for this user
    Delivery(Delivery),
    /// Session over
    Goodbye,
}

/// Output sink for client units
pub trait Console: Send + 'static {
    fn show(&mut self, event: ConsoleEvent);
}

/// Prints events to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct Terminal;

impl Console for Terminal {
    fn show(&mut self, event: ConsoleEvent) {
        let text = formatter::format_event(&event);
        let mut stdout = std::io::stdout().lock();
        let written = if formatter::ends_line(&event) {
            writeln!(stdout, "{}", text)
        } else {
            write!(stdout, "{}", text)
        };
        // stdout going away is not something the chat can recover from
        // or report anywhere useful.
        let _ = written.and_then(|_| stdout.flush());
    }
}

impl Console for mpsc::UnboundedSender<ConsoleEvent> {
    fn show(&mut self, event: ConsoleEvent) {
        let _ = self.send(event);
    }
}
