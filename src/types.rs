//! Basic type definitions for the chat system
//!
//! Provides newtype wrappers for type safety:
//! - `Username`: a validated, claimable chat name
//! - `Target`: broadcast marker or a specific recipient

use std::fmt;

use crate::error::UsernameError;
use crate::message::Command;

/// Literal target that addresses every client
pub const BROADCAST: &str = "all";

/// Validated username (newtype pattern)
///
/// Non-empty, no whitespace, no `:` delimiter, no leading `@`, and not
/// a reserved word (the broadcast marker or a command tag).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// Validate a candidate username
    pub fn parse(raw: &str) -> Result<Self, UsernameError> {
        if raw.is_empty() {
            return Err(UsernameError::Empty);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(UsernameError::Whitespace);
        }
        if raw.contains(':') {
            return Err(UsernameError::Delimiter);
        }
        if raw.starts_with('@') {
            return Err(UsernameError::LeadingAt);
        }
        if raw == BROADCAST || Command::from_tag(raw).is_some() {
            return Err(UsernameError::Reserved(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<str> for Username {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Message recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every connected client
    All,
    /// One named client
    User(String),
}

impl Target {
    /// Interpret a wire target field
    pub fn from_wire(raw: &str) -> Self {
        if raw == BROADCAST {
            Target::All
        } else {
            Target::User(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Target::All => BROADCAST,
            Target::User(name) => name,
        }
    }

    /// Check whether a client with this name should see the message
    pub fn includes(&self, username: &Username) -> bool {
        match self {
            Target::All => true,
            Target::User(name) => username == name.as_str(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
