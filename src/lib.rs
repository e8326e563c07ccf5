//! tickertape: random-walk ticker prices with live WebSocket updates
//!
//! This library provides the core components for:
//! - Durable ticker + price-history storage with bounded history queries
//! - A periodic generator advancing every ticker by one step per tick
//! - Best-effort publication of new prices onto per-ticker channels
//! - Per-client relays bridging channel subscriptions to WebSocket clients

pub mod bus;
pub mod cli;
pub mod config;
pub mod generator;
pub mod relay;
pub mod server;
pub mod store;
pub mod telemetry;
