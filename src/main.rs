//! Pub/Sub Chat - Entry Point
//!
//! `broker` binds the inbound and outbound listeners and runs the relay
//! loop; `client` registers a username and chats from the terminal.
//! Both stop cleanly on Ctrl+C.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pubsub_chat::cli::{Cli, Command};
use pubsub_chat::config::{BrokerConfig, ClientConfig};
use pubsub_chat::transport::ws;
use pubsub_chat::{run_client, Broker, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=pubsub_chat=trace
    // Logs go to stderr so they never interleave with chat output.
    let default_filter = match cli.command {
        Command::Broker(_) => "pubsub_chat=info",
        Command::Client(_) => "pubsub_chat=warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let shutdown = Shutdown::new();
    spawn_interrupt_handler(shutdown.clone());

    match cli.command {
        Command::Broker(args) => {
            let config = BrokerConfig::from(args);
            let endpoints = ws::bind(config.inbound, config.outbound, config.capacity).await?;
            info!(
                "Broker listening: inbound {}, outbound {}",
                endpoints.inbound_addr, endpoints.outbound_addr
            );

            Broker::new(endpoints.inbox, endpoints.fanout)
                .run(shutdown)
                .await;
        }
        Command::Client(args) => {
            run_client(ClientConfig::from(args), shutdown).await?;
        }
    }

    Ok(())
}

/// Set the shutdown signal on the first Ctrl+C
fn spawn_interrupt_handler(shutdown: Shutdown) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                shutdown.trigger();
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });
}
