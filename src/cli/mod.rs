//! CLI interface for tickertape
//!
//! Provides subcommands for:
//! - `fill`: seed tickers with an initial zero price point
//! - `tick`: run one generation pass
//! - `generate`: run the generation loop forever
//! - `serve`: run the live-update WebSocket endpoint

mod fill;
mod generate;
mod serve;
mod tick;

pub use fill::FillArgs;
pub use generate::GenerateArgs;
pub use serve::ServeArgs;
pub use tick::TickArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tickertape")]
#[command(about = "Random-walk ticker prices with live WebSocket updates")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Seed tickers, each with an initial zero price point
    Fill(FillArgs),
    /// Run one generation pass over every ticker
    Tick(TickArgs),
    /// Run the generation loop forever
    Generate(GenerateArgs),
    /// Serve live price updates over WebSocket
    Serve(ServeArgs),
}
