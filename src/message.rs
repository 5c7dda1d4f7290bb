//! Wire protocol definitions
//!
//! Every message is a colon-delimited triple `head:target:body`.
//! `head` is either a command tag (control message) or the sender's
//! username (chat message).
//!
//! # Split rule
//! The first two *unescaped* `:` characters separate the fields and the
//! body is the rest of the text, verbatim. Inside `head` and `target`,
//! `\` is written `\\` and `:` is written `\:`. The body is never escaped,
//! so it may carry any number of colons. Plain names encode as plain text:
//! `alice:bob:hello`.

use std::fmt;

use crate::error::ProtocolError;
use crate::types::{Target, BROADCAST};

const DELIMITER: char = ':';
const ESCAPE: char = '\\';

/// Control command tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Client asks to claim a username
    Register,
    /// Broker granted the claim
    RegisterOk,
    /// Broker refused the claim
    RegisterFail,
    /// Client releases its username
    Unregister,
    /// Broker notice shown to users
    System,
}

impl Command {
    pub fn tag(self) -> &'static str {
        match self {
            Command::Register => "REGISTER",
            Command::RegisterOk => "REGISTER_OK",
            Command::RegisterFail => "REGISTER_FAIL",
            Command::Unregister => "UNREGISTER",
            Command::System => "SYSTEM",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "REGISTER" => Some(Command::Register),
            "REGISTER_OK" => Some(Command::RegisterOk),
            "REGISTER_FAIL" => Some(Command::RegisterFail),
            "UNREGISTER" => Some(Command::Unregister),
            "SYSTEM" => Some(Command::System),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Raw fields of one wire message
///
/// The body is optional here because control commands are accepted
/// with only two fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub head: String,
    pub target: String,
    pub body: Option<String>,
}

impl Frame {
    /// Split raw wire text into fields
    ///
    /// Fails with `MissingField` when there is no delimiter at all.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let mut fields: Vec<String> = Vec::with_capacity(2);
        let mut current = String::new();
        let mut chars = raw.char_indices();

        while let Some((pos, ch)) = chars.next() {
            match ch {
                ESCAPE => match chars.next() {
                    Some((_, next @ (ESCAPE | DELIMITER))) => current.push(next),
                    _ => return Err(ProtocolError::InvalidEscape(pos)),
                },
                DELIMITER => {
                    fields.push(std::mem::take(&mut current));
                    if fields.len() == 2 {
                        let target = fields.pop().unwrap_or_default();
                        let head = fields.pop().unwrap_or_default();
                        return Ok(Self {
                            head,
                            target,
                            body: Some(raw[pos + DELIMITER.len_utf8()..].to_string()),
                        });
                    }
                }
                _ => current.push(ch),
            }
        }

        match fields.pop() {
            Some(head) => Ok(Self {
                head,
                target: current,
                body: None,
            }),
            None => Err(ProtocolError::MissingField {
                expected: 2,
                found: 1,
            }),
        }
    }

    /// Command tag carried in the head, if any
    pub fn command(&self) -> Option<Command> {
        Command::from_tag(&self.head)
    }
}

/// A decoded wire message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// Command tag, subject username, free-text reason
    Control {
        command: Command,
        subject: String,
        reason: String,
    },
    /// Sender username, recipient, text
    Chat {
        sender: String,
        target: Target,
        body: String,
    },
}

impl Envelope {
    pub fn register(name: &str) -> Self {
        Self::control(Command::Register, name, "request")
    }

    pub fn register_ok(name: &str) -> Self {
        Self::control(Command::RegisterOk, name, "success")
    }

    pub fn register_fail(name: &str, reason: &str) -> Self {
        Self::control(Command::RegisterFail, name, reason)
    }

    pub fn unregister(name: &str) -> Self {
        Self::control(Command::Unregister, name, "leaving")
    }

    /// Notice addressed to every client
    pub fn system(text: impl Into<String>) -> Self {
        Self::control(Command::System, BROADCAST, text)
    }

    pub fn chat(sender: &str, target: Target, body: impl Into<String>) -> Self {
        Envelope::Chat {
            sender: sender.to_string(),
            target,
            body: body.into(),
        }
    }

    fn control(command: Command, subject: &str, reason: impl Into<String>) -> Self {
        Envelope::Control {
            command,
            subject: subject.to_string(),
            reason: reason.into(),
        }
    }

    /// Serialize to wire text
    pub fn encode(&self) -> String {
        let (head, target, body) = match self {
            Envelope::Control {
                command,
                subject,
                reason,
            } => (command.tag(), subject.as_str(), reason.as_str()),
            Envelope::Chat {
                sender,
                target,
                body,
            } => (sender.as_str(), target.as_str(), body.as_str()),
        };

        let mut out = String::with_capacity(head.len() + target.len() + body.len() + 2);
        escape_into(&mut out, head);
        out.push(DELIMITER);
        escape_into(&mut out, target);
        out.push(DELIMITER);
        out.push_str(body);
        out
    }

    /// Parse wire text, requiring all three fields
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        let frame = Frame::parse(raw)?;
        let Some(body) = frame.body else {
            return Err(ProtocolError::MissingField {
                expected: 3,
                found: 2,
            });
        };

        Ok(match Command::from_tag(&frame.head) {
            Some(command) => Envelope::Control {
                command,
                subject: frame.target,
                reason: body,
            },
            None => Envelope::Chat {
                sender: frame.head,
                target: Target::from_wire(&frame.target),
                body,
            },
        })
    }
}

fn escape_into(out: &mut String, field: &str) {
    for ch in field.chars() {
        if ch == ESCAPE || ch == DELIMITER {
            out.push(ESCAPE);
        }
        out.push(ch);
    }
}
