//! Generate command implementation

use crate::bus::MemoryBus;
use crate::config::Config;
use crate::generator::{PriceGenerator, RandomWalk};
use crate::store::PriceStore;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Interval between passes in milliseconds; defaults to the configured interval
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

impl GenerateArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = PriceStore::open(&config.store.url).await?;
        let bus = Arc::new(MemoryBus::new());
        let generator = PriceGenerator::new(store, bus, Box::new(RandomWalk));

        let interval = Duration::from_millis(self.interval_ms.unwrap_or(config.generator.interval_ms));
        tracing::info!(?interval, "starting generation loop");
        generator.run(interval).await;
        Ok(())
    }
}
