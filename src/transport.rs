//! Transport Adapter
//!
//! Delivers connection lifecycle signals and decoded server events. It owns
//! reconnection but never interprets payloads beyond decoding them, and it
//! does not buffer or replay anything lost while disconnected.

use crate::error::DisplayError;
use crate::protocol::ServerEvent;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Debug, Clone, PartialEq)]
pub enum TransportSignal {
    Connected,
    Disconnected { reason: String },
    Event(ServerEvent),
    /// A frame arrived but could not be decoded
    Rejected(DisplayError),
}

impl TransportSignal {
    /// Decode a text frame into an event or a rejection
    pub fn from_text(text: &str) -> Self {
        match ServerEvent::decode(text) {
            Ok(event) => TransportSignal::Event(event),
            Err(e) => TransportSignal::Rejected(e),
        }
    }
}

#[async_trait]
pub trait Transport: Send {
    /// `None` once the transport has shut down for good
    async fn next_signal(&mut self) -> Option<TransportSignal>;
}

/// In-process transport fed through a `TransportFeed`
pub struct ChannelTransport {
    rx: mpsc::Receiver<TransportSignal>,
}

#[derive(Clone)]
pub struct TransportFeed {
    tx: mpsc::Sender<TransportSignal>,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> (TransportFeed, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (TransportFeed { tx }, Self { rx })
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn next_signal(&mut self) -> Option<TransportSignal> {
        self.rx.recv().await
    }
}

impl TransportFeed {
    pub async fn send(&self, signal: TransportSignal) -> Result<(), DisplayError> {
        self.tx
            .send(signal)
            .await
            .map_err(|_| DisplayError::TransportDisruption("display has shut down".to_string()))
    }

    pub async fn connected(&self) -> Result<(), DisplayError> {
        self.send(TransportSignal::Connected).await
    }

    pub async fn disconnected(&self, reason: &str) -> Result<(), DisplayError> {
        self.send(TransportSignal::Disconnected {
            reason: reason.to_string(),
        })
        .await
    }

    pub async fn text(&self, text: &str) -> Result<(), DisplayError> {
        self.send(TransportSignal::from_text(text)).await
    }
}

/// Exponential backoff between reconnect attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl ReconnectPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.min_delay
            .saturating_mul(factor)
            .min(self.max_delay)
            .max(self.min_delay)
    }
}

/// WebSocket transport with automatic reconnect
pub struct WsTransport {
    rx: mpsc::Receiver<TransportSignal>,
    worker: JoinHandle<()>,
}

impl WsTransport {
    pub fn spawn(url: String, policy: ReconnectPolicy) -> Self {
        let (tx, rx) = mpsc::channel(256);
        let worker = tokio::spawn(run_ws(url, policy, tx));
        Self { rx, worker }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn next_signal(&mut self) -> Option<TransportSignal> {
        self.rx.recv().await
    }
}

async fn run_ws(url: String, policy: ReconnectPolicy, tx: mpsc::Sender<TransportSignal>) {
    let mut attempt = 0u32;
    loop {
        tracing::info!("Connecting to game server at {}", url);
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                attempt = 0;
                if tx.send(TransportSignal::Connected).await.is_err() {
                    return;
                }

                let (mut writer, mut reader) = stream.split();
                let reason = loop {
                    match reader.next().await {
                        Some(Ok(Message::Text(text))) => {
                            tracing::debug!("Received frame: {}", text);
                            if tx.send(TransportSignal::from_text(&text)).await.is_err() {
                                return;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = writer.send(Message::Pong(data)).await {
                                break e.to_string();
                            }
                        }
                        Some(Ok(Message::Close(_))) => break "closed by server".to_string(),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => break e.to_string(),
                        None => break "stream ended".to_string(),
                    }
                };

                tracing::warn!("Disconnected from game server: {}", reason);
                if tx
                    .send(TransportSignal::Disconnected { reason })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!("Failed to connect to {}: {}", url, e);
            }
        }

        let delay = policy.delay(attempt);
        attempt = attempt.saturating_add(1);
        tracing::debug!("Reconnecting in {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}
