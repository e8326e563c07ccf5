//! Price store types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// A tracked ticker. Identity is the unique name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticker {
    pub id: i64,
    pub name: String,
}

/// One observed price for one ticker at one instant.
///
/// Points are append-only; the current price of a ticker is the point with
/// the maximum id among its points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricePoint {
    pub id: i64,
    pub ticker_id: i64,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Price store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connectivity or constraint failure on a durable read/write
    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
    /// Operation named a ticker that does not exist
    #[error("unknown ticker: {0}")]
    UnknownTicker(String),
    /// A persisted price failed to decode as a decimal
    #[error("stored price is not a valid decimal: {0}")]
    BadPrice(String),
}
