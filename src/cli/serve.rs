//! Serve command implementation

use crate::bus::MemoryBus;
use crate::config::Config;
use crate::generator::{PriceGenerator, RandomWalk};
use crate::server::Server;
use crate::store::PriceStore;
use clap::{ArgAction, Args};
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Also run the generation loop in this process
    ///
    /// The bus is in-process, so subscribers only see updates generated here.
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub with_generator: bool,
}

impl ServeArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = PriceStore::open(&config.store.url).await?;
        let bus = Arc::new(MemoryBus::new());

        if self.with_generator {
            let generator =
                PriceGenerator::new(store.clone(), bus.clone(), Box::new(RandomWalk));
            let interval = Duration::from_millis(config.generator.interval_ms);
            tokio::spawn(generator.run(interval));
        }

        let server = Server::new(
            &config.server.bind,
            store,
            bus,
            Duration::from_millis(config.server.poll_interval_ms),
            config.server.history_page_size,
        );
        server.run().await
    }
}
