//! In-process broadcast bus
//!
//! One tokio broadcast channel per name, created lazily on first use. Matches
//! the bus contract of a networked pub/sub transport: subscribers get a
//! control envelope when their subscription becomes active, publishes with no
//! subscriber present vanish, and a dropped channel surfaces as a read error.

use super::envelope::{Envelope, SUBSCRIBE_KIND};
use super::{BusError, Publisher, Subscriber, Subscription};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::timeout;

const DEFAULT_CAPACITY: usize = 256;

/// Broadcast bus backed by per-channel tokio broadcast senders
pub struct MemoryBus {
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
    capacity: usize,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Bus whose channels buffer up to `capacity` undelivered messages per
    /// subscriber before the oldest are dropped
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Drop a channel, ending every open subscription on it with an error.
    /// Simulates losing the bus connection for that channel.
    pub async fn close_channel(&self, channel: &str) {
        self.channels.write().await.remove(channel);
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for MemoryBus {
    async fn publish(&self, channel: &str, envelope: &Envelope) -> Result<(), BusError> {
        let raw = envelope
            .to_json()
            .map_err(|e| BusError::Unavailable(e.to_string()))?;
        let channels = self.channels.read().await;
        if let Some(sender) = channels.get(channel) {
            // A send error just means nobody is listening right now
            let _ = sender.send(raw);
        }
        Ok(())
    }
}

#[async_trait]
impl Subscriber for MemoryBus {
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>, BusError> {
        let mut channels = self.channels.write().await;
        let sender = channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        let receiver = sender.subscribe();
        let greeting = Envelope::control(SUBSCRIBE_KIND)
            .to_json()
            .map_err(|e| BusError::Unavailable(e.to_string()))?;
        Ok(Box::new(MemorySubscription {
            channel: channel.to_string(),
            greeting: Some(greeting),
            receiver,
        }))
    }
}

struct MemorySubscription {
    channel: String,
    greeting: Option<String>,
    receiver: broadcast::Receiver<String>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next(&mut self, wait: Duration) -> Result<Option<String>, BusError> {
        if let Some(greeting) = self.greeting.take() {
            return Ok(Some(greeting));
        }
        loop {
            match timeout(wait, self.receiver.recv()).await {
                Err(_elapsed) => return Ok(None),
                Ok(Ok(raw)) => return Ok(Some(raw)),
                Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    tracing::warn!(channel = %self.channel, skipped, "subscription lagged, messages dropped");
                    continue;
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    return Err(BusError::ChannelClosed(self.channel.clone()));
                }
            }
        }
    }
}
