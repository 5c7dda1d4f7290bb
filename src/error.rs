//! Error types for the chat broker and client
//!
//! Defines wire protocol, username, transport and client errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Wire protocol violations
///
/// Never surfaced to the user: the receiving party drops the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Fewer fields than the message shape requires
    #[error("expected {expected} fields, found {found}")]
    MissingField { expected: usize, found: usize },

    /// Backslash followed by something other than `\` or `:`
    #[error("invalid escape sequence at byte {0}")]
    InvalidEscape(usize),
}

/// Reasons a candidate username is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameError {
    #[error("username cannot be empty")]
    Empty,

    #[error("username cannot contain whitespace")]
    Whitespace,

    #[error("username cannot contain ':'")]
    Delimiter,

    #[error("username cannot start with '@'")]
    LeadingAt,

    #[error("'{0}' is reserved")]
    Reserved(String),
}

/// Transport errors
///
/// `Closed` ends the loop that observes it; everything else is treated
/// as transient and logged.
#[derive(Debug, Error)]
pub enum TransportError {
    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// IO error (bind/connect)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The endpoint or its peer is gone
    #[error("transport closed")]
    Closed,

    /// Subscriber fell behind the fan-out and missed messages
    #[error("subscriber lagged, {0} messages skipped")]
    Lagged(u64),
}

impl TransportError {
    /// Whether this error means the endpoint can no longer be used
    pub fn is_closed(&self) -> bool {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match self {
            TransportError::Closed => true,
            TransportError::WebSocket(WsError::ConnectionClosed | WsError::AlreadyClosed) => true,
            _ => false,
        }
    }
}

/// Client runtime errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure the client cannot recover from
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The broker never answered the registration request
    #[error("no reply from broker after {attempts} registration attempts")]
    RegistrationTimeout { attempts: u32 },

    /// Shutdown was signalled before the unit finished
    #[error("cancelled by shutdown")]
    Cancelled,

    /// Local input reached end of file
    #[error("input closed")]
    InputClosed,

    /// A client unit panicked or was aborted
    #[error("client task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_classification() {
        use tokio_tungstenite::tungstenite::Error as WsError;

        assert!(TransportError::Closed.is_closed());
        assert!(TransportError::WebSocket(WsError::ConnectionClosed).is_closed());
        assert!(TransportError::WebSocket(WsError::AlreadyClosed).is_closed());
        assert!(!TransportError::Lagged(3).is_closed());
    }

    #[test]
    fn test_error_messages() {
        let err = ProtocolError::MissingField {
            expected: 3,
            found: 2,
        };
        assert_eq!(err.to_string(), "expected 3 fields, found 2");

        let err = ClientError::RegistrationTimeout { attempts: 3 };
        assert_eq!(
            err.to_string(),
            "no reply from broker after 3 registration attempts"
        );
    }
}
