//! Command line interface for both roles

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::client::RegistrationPolicy;
use crate::config::{BrokerConfig, ClientConfig, CHANNEL_BUFFER_SIZE};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the broker: assign usernames and relay chat traffic.
    Broker(BrokerArgs),
    /// Register with a broker and chat from the terminal.
    Client(ClientArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BrokerArgs {
    /// Address clients publish to.
    #[arg(long, default_value = "0.0.0.0:5555")]
    pub inbound: SocketAddr,

    /// Address clients subscribe to.
    #[arg(long, default_value = "0.0.0.0:5556")]
    pub outbound: SocketAddr,

    /// Inbound queue and fan-out buffer size.
    #[arg(long, default_value_t = CHANNEL_BUFFER_SIZE)]
    pub capacity: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Broker host name or IP address.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Broker port for publishing.
    #[arg(long, default_value_t = 5555)]
    pub inbound_port: u16,

    /// Broker port for subscribing.
    #[arg(long, default_value_t = 5556)]
    pub outbound_port: u16,

    /// How long to wait for each registration reply, in milliseconds.
    #[arg(long, default_value_t = 3000)]
    pub reply_timeout_ms: u64,

    /// How many times to send a registration request before giving up.
    #[arg(long, default_value_t = 3)]
    pub register_attempts: u32,
}

impl From<BrokerArgs> for BrokerConfig {
    fn from(args: BrokerArgs) -> Self {
        Self {
            inbound: args.inbound,
            outbound: args.outbound,
            capacity: args.capacity.max(1),
        }
    }
}

impl From<ClientArgs> for ClientConfig {
    fn from(args: ClientArgs) -> Self {
        let mut config = ClientConfig::new(&args.host, args.inbound_port, args.outbound_port);
        config.registration = RegistrationPolicy {
            reply_timeout: Duration::from_millis(args.reply_timeout_ms),
            max_attempts: args.register_attempts.max(1),
        };
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_defaults() {
        let cli = Cli::parse_from(["pubsub_chat", "broker"]);
        let Command::Broker(args) = cli.command else {
            panic!("expected broker subcommand");
        };
        assert_eq!(BrokerConfig::from(args), BrokerConfig::default());
    }

    #[test]
    fn test_client_args() {
        let cli = Cli::parse_from([
            "pubsub_chat",
            "client",
            "--host",
            "10.0.0.5",
            "--reply-timeout-ms",
            "500",
        ]);
        let Command::Client(args) = cli.command else {
            panic!("expected client subcommand");
        };

        let config = ClientConfig::from(args);
        assert_eq!(config.inbound_url, "ws://10.0.0.5:5555");
        assert_eq!(config.outbound_url, "ws://10.0.0.5:5556");
        assert_eq!(
            config.registration.reply_timeout,
            Duration::from_millis(500)
        );
        assert_eq!(config.registration.max_attempts, 3);
    }
}
