//! Periodic price generation
//!
//! Once per tick, advances every tracked ticker by one step of its walk,
//! durably appends the new point, and fires a best-effort notification on the
//! ticker's channel. Price durability and notification delivery are
//! decoupled: a publish failure never rolls back or blocks the write.

mod step;

pub use step::{FixedStep, RandomWalk, ScriptedSteps, Step};

use crate::bus::{Envelope, PriceUpdate, Publisher};
use crate::store::{PriceStore, StoreError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Price a ticker starts from when it has no history
pub const BASELINE_PRICE: Decimal = Decimal::ZERO;

/// Advances every ticker's price by one step per tick
pub struct PriceGenerator {
    store: PriceStore,
    publisher: Arc<dyn Publisher>,
    step: Box<dyn Step>,
}

impl PriceGenerator {
    pub fn new(store: PriceStore, publisher: Arc<dyn Publisher>, step: Box<dyn Step>) -> Self {
        Self {
            store,
            publisher,
            step,
        }
    }

    /// Run one generation pass over all tickers
    ///
    /// Each ticker is advanced independently; a failure on one is logged and
    /// does not abort the others. Returns the number of tickers advanced.
    /// Fails only when the ticker listing itself cannot be read.
    pub async fn run_once(&mut self) -> Result<usize, StoreError> {
        let names = self.store.list_tickers().await?;
        let now = Utc::now();
        let mut advanced = 0;

        for name in &names {
            match self.advance(name, now).await {
                Ok(update) => {
                    advanced += 1;
                    self.announce(name, &update).await;
                }
                Err(e) => {
                    tracing::error!(ticker = %name, error = %e, "failed to advance ticker");
                }
            }
        }

        Ok(advanced)
    }

    /// Run generation passes forever at the given nominal interval
    ///
    /// Sleeps only the remainder of the interval after each pass. A pass that
    /// overruns the interval starts the next one immediately; missed ticks
    /// are never replayed.
    pub async fn run(mut self, interval: Duration) {
        loop {
            let started = Instant::now();
            match self.run_once().await {
                Ok(advanced) => {
                    tracing::info!(tickers = advanced, "prices generated");
                }
                Err(e) => {
                    tracing::error!(error = %e, "generation pass failed");
                }
            }
            if let Some(remaining) = interval.checked_sub(started.elapsed()) {
                sleep(remaining).await;
            }
        }
    }

    /// Compute and durably append the next price for one ticker
    async fn advance(
        &mut self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<PriceUpdate, StoreError> {
        let current = self
            .store
            .latest_price(name)
            .await?
            .map(|point| point.price)
            .unwrap_or(BASELINE_PRICE);
        let next = current + self.step.delta();
        let point = self.store.append_price(name, next, Some(now)).await?;
        Ok(PriceUpdate {
            name: name.to_string(),
            price: point.price,
            created_at: point.created_at,
        })
    }

    /// Best-effort notification; the price is already durable
    async fn announce(&self, channel: &str, update: &PriceUpdate) {
        let envelope = match Envelope::data(update) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(ticker = %channel, error = %e, "failed to encode price update");
                return;
            }
        };
        if let Err(e) = self.publisher.publish(channel, &envelope).await {
            tracing::warn!(ticker = %channel, error = %e, "failed to publish price update");
        }
    }
}
