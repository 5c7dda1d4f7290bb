//! WebSocket transport
//!
//! The broker binds two listeners: an inbound one where clients connect
//! a publisher, and an outbound one where clients connect a subscriber.
//! Every text frame from any publisher lands in one bounded queue that
//! the broker drains in arrival order. Every broker publish is fanned
//! out to all connected subscribers through a `broadcast` channel.

use std::net::SocketAddr;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use super::{matches_prefix, Publish, Receive};
use crate::error::TransportError;

type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Bound broker endpoints plus the addresses actually bound
#[derive(Debug)]
pub struct BrokerEndpoints {
    pub inbox: WsInbox,
    pub fanout: WsFanout,
    pub inbound_addr: SocketAddr,
    pub outbound_addr: SocketAddr,
}

/// Bind the broker's inbound and outbound listeners
///
/// Failures here are fatal startup errors.
pub async fn bind(
    inbound: SocketAddr,
    outbound: SocketAddr,
    capacity: usize,
) -> Result<BrokerEndpoints, TransportError> {
    let inbound_listener = TcpListener::bind(inbound).await?;
    let outbound_listener = TcpListener::bind(outbound).await?;
    let inbound_addr = inbound_listener.local_addr()?;
    let outbound_addr = outbound_listener.local_addr()?;

    let (queue_tx, queue_rx) = mpsc::channel(capacity);
    let (fanout_tx, _) = broadcast::channel(capacity);

    let inbound_task = tokio::spawn(accept_publishers(inbound_listener, queue_tx));
    let outbound_task = tokio::spawn(accept_subscribers(outbound_listener, fanout_tx.clone()));

    info!(
        "Listening for publishers on {}, subscribers on {}",
        inbound_addr, outbound_addr
    );

    Ok(BrokerEndpoints {
        inbox: WsInbox {
            queue: queue_rx,
            accept_task: inbound_task,
        },
        fanout: WsFanout {
            sender: fanout_tx,
            accept_task: outbound_task,
        },
        inbound_addr,
        outbound_addr,
    })
}

/// Accept loop for client publishers
///
/// Connection tasks live in a `JoinSet`, so aborting this loop tears
/// them all down.
async fn accept_publishers(listener: TcpListener, queue: mpsc::Sender<String>) {
    let mut connections = JoinSet::new();

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("Publisher connection from {}", peer);
                let queue = queue.clone();
                connections.spawn(async move {
                    if let Err(e) = forward_inbound(stream, queue).await {
                        warn!("Publisher {} closed with error: {}", peer, e);
                    }
                    debug!("Publisher {} disconnected", peer);
                });
            }
            Err(e) => {
                error!("Failed to accept publisher connection: {}", e);
            }
        }
        while connections.try_join_next().is_some() {}
    }
}

/// Pump text frames from one publisher into the broker queue
async fn forward_inbound(
    stream: TcpStream,
    queue: mpsc::Sender<String>,
) -> Result<(), TransportError> {
    let mut ws = tokio_tungstenite::accept_async(stream).await?;

    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if queue.send(text).await.is_err() {
                    debug!("Broker inbox closed, dropping publisher");
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {
                // Ping/Pong/Binary - ignore
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Accept loop for client subscribers
async fn accept_subscribers(listener: TcpListener, fanout: broadcast::Sender<String>) {
    let mut connections = JoinSet::new();

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("Subscriber connection from {}", peer);
                // Subscribe before the handshake completes so the client
                // never observes an open socket that can still miss messages.
                let feed = fanout.subscribe();
                connections.spawn(async move {
                    if let Err(e) = forward_outbound(stream, feed).await {
                        warn!("Subscriber {} closed with error: {}", peer, e);
                    }
                    debug!("Subscriber {} disconnected", peer);
                });
            }
            Err(e) => {
                error!("Failed to accept subscriber connection: {}", e);
            }
        }
        while connections.try_join_next().is_some() {}
    }
}

/// Push fan-out messages to one subscriber until either side closes
async fn forward_outbound(
    stream: TcpStream,
    mut feed: broadcast::Receiver<String>,
) -> Result<(), TransportError> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut source) = ws.split();

    loop {
        tokio::select! {
            message = feed.recv() => match message {
                Ok(text) => sink.send(Message::Text(text)).await?,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Subscriber lagged, {} messages skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = source.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
        }
    }

    let _ = sink.close().await;
    Ok(())
}

/// Broker's inbound queue over WebSocket
#[derive(Debug)]
pub struct WsInbox {
    queue: mpsc::Receiver<String>,
    accept_task: JoinHandle<()>,
}

#[async_trait]
impl Receive for WsInbox {
    async fn receive(&mut self) -> Result<String, TransportError> {
        self.queue.recv().await.ok_or(TransportError::Closed)
    }

    async fn close(&mut self) {
        self.accept_task.abort();
        self.queue.close();
    }
}

impl Drop for WsInbox {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

/// Broker's fan-out over WebSocket
#[derive(Debug)]
pub struct WsFanout {
    sender: broadcast::Sender<String>,
    accept_task: JoinHandle<()>,
}

#[async_trait]
impl Publish for WsFanout {
    async fn publish(&mut self, payload: String) -> Result<(), TransportError> {
        if self.sender.send(payload).is_err() {
            trace!("No subscribers connected");
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.accept_task.abort();
    }
}

impl Drop for WsFanout {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

/// Connect a publisher to the broker's inbound listener
pub async fn connect_publisher(url: &str) -> Result<WsPublisher, TransportError> {
    let (stream, _response) = connect_async(url).await?;
    debug!("Publisher connected to {}", url);
    Ok(WsPublisher {
        stream: Some(stream),
    })
}

/// Connect a subscriber to the broker's outbound listener
///
/// Only messages starting with `prefix` are returned; empty means all.
pub async fn connect_subscriber(url: &str, prefix: &str) -> Result<WsSubscriber, TransportError> {
    let (stream, _response) = connect_async(url).await?;
    debug!("Subscriber connected to {}", url);
    Ok(WsSubscriber {
        stream: Some(stream),
        prefix: prefix.to_string(),
    })
}

/// Client publisher endpoint
pub struct WsPublisher {
    stream: Option<ClientStream>,
}

#[async_trait]
impl Publish for WsPublisher {
    async fn publish(&mut self, payload: String) -> Result<(), TransportError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::Closed);
        };
        stream.send(Message::Text(payload)).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close(None).await {
                debug!("Publisher close: {}", e);
            }
        }
    }
}

/// Client subscriber endpoint
pub struct WsSubscriber {
    stream: Option<ClientStream>,
    prefix: String,
}

#[async_trait]
impl Receive for WsSubscriber {
    async fn receive(&mut self) -> Result<String, TransportError> {
        loop {
            let Some(stream) = self.stream.as_mut() else {
                return Err(TransportError::Closed);
            };

            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    if matches_prefix(&self.prefix, &text) {
                        return Ok(text);
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    self.stream = None;
                    return Err(TransportError::Closed);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    // The stream is unusable after a protocol or I/O error.
                    self.stream = None;
                    return Err(e.into());
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close(None).await {
                debug!("Subscriber close: {}", e);
            }
        }
    }
}
