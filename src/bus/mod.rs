//! Broadcast bus over named channels
//!
//! The publish/subscribe relation is modeled as a capability pair: a
//! [`Publisher`] that fires envelopes at a channel with no acknowledgment and
//! no persistence, and a [`Subscriber`] that opens per-channel subscriptions.
//! Channel names are ticker names. Messages published while nobody is
//! subscribed are lost by design.

pub mod envelope;
mod memory;

pub use envelope::{Decoded, Envelope, EnvelopeError, PriceUpdate};
pub use memory::MemoryBus;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Broadcast bus errors
#[derive(Debug, Error)]
pub enum BusError {
    /// The channel ended underneath an open subscription
    #[error("channel closed: {0}")]
    ChannelClosed(String),
    /// The bus could not be reached
    #[error("bus unavailable: {0}")]
    Unavailable(String),
}

/// Capability to publish envelopes onto named channels
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Serialize `envelope` and send it on `channel`. Best effort: no retry,
    /// no record of missed deliveries.
    async fn publish(&self, channel: &str, envelope: &Envelope) -> Result<(), BusError>;
}

/// Capability to open subscriptions on named channels
#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>, BusError>;
}

/// One open subscription on one channel
#[async_trait]
pub trait Subscription: Send {
    /// Wait up to `wait` for the next raw message. `Ok(None)` means the wait
    /// elapsed with nothing to read; an error means the bus is gone.
    async fn next(&mut self, wait: Duration) -> Result<Option<String>, BusError>;
}
