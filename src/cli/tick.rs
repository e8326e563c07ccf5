//! Tick command implementation

use crate::bus::MemoryBus;
use crate::config::Config;
use crate::generator::{PriceGenerator, RandomWalk};
use crate::store::PriceStore;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct TickArgs {}

impl TickArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = PriceStore::open(&config.store.url).await?;
        let bus = Arc::new(MemoryBus::new());
        let mut generator = PriceGenerator::new(store, bus, Box::new(RandomWalk));

        let advanced = generator.run_once().await?;
        tracing::info!(tickers = advanced, "prices have been generated");
        Ok(())
    }
}
