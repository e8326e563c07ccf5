//! Fill command implementation

use crate::config::Config;
use crate::generator::BASELINE_PRICE;
use crate::store::PriceStore;
use clap::Args;

#[derive(Args, Debug)]
pub struct FillArgs {
    /// Number of tickers to seed; defaults to the configured count
    #[arg(long)]
    pub count: Option<u32>,
}

impl FillArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = PriceStore::open(&config.store.url).await?;
        let count = self.count.unwrap_or(config.generator.seed_count);

        let mut created = 0;
        for i in 0..count {
            let name = format!("ticker_{:02}", i);
            if store.get_ticker(&name).await?.is_some() {
                tracing::debug!(ticker = %name, "already exists, skipping");
                continue;
            }
            store.seed_ticker(&name, BASELINE_PRICE).await?;
            created += 1;
        }

        tracing::info!(created, requested = count, "tickers seeded");
        Ok(())
    }
}
