use clap::Parser;
use tickertape::cli::{Cli, Commands};
use tickertape::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    tickertape::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Fill(args) => args.execute(&config).await?,
        Commands::Tick(args) => args.execute(&config).await?,
        Commands::Generate(args) => args.execute(&config).await?,
        Commands::Serve(args) => args.execute(&config).await?,
    }

    Ok(())
}
