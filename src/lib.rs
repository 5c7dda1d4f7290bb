//! Pub/Sub Chat Library
//!
//! A central broker that hands out unique usernames and relays chat
//! traffic, and a client runtime that registers and then sends and
//! receives concurrently.
//!
//! # Features
//! - Username registration with a uniqueness guarantee
//! - Broadcast (`all`) and private (`@name`) messages
//! - Colon-delimited text wire protocol with an escaping rule
//! - WebSocket and in-memory transports behind one trait pair
//! - Coordinated shutdown of every unit on one signal
//!
//! # Architecture
//! - `Broker` drains one inbound queue in arrival order and publishes
//!   every decision and relayed message on one fan-out
//! - Clients publish to the inbound side and subscribe to the fan-out,
//!   filtering by target locally
//! - `UsernameRegistry` is the only lock in the system and never leaves
//!   the broker
//!
//! # Example
//! ```ignore
//! use pubsub_chat::{transport::memory, Broker, Shutdown};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (bus, inbox, fanout) = memory::bus(256);
//!     let shutdown = Shutdown::new();
//!
//!     tokio::spawn(Broker::new(inbox, fanout).run(shutdown.clone()));
//!
//!     let publisher = bus.publisher();
//!     let subscriber = bus.subscribe("");
//!     // hand them to pubsub_chat::client::run(...)
//! }
//! ```

pub mod broker;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod registry;
pub mod shutdown;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use broker::Broker;
pub use client::{run_client, ClientSession};
pub use error::{ClientError, ProtocolError, TransportError, UsernameError};
pub use message::{Command, Envelope, Frame};
pub use registry::UsernameRegistry;
pub use shutdown::Shutdown;
pub use types::{Target, Username, BROADCAST};
