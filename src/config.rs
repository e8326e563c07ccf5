//! Configuration types for tickertape

use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Price store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Database URL; the file is created if missing
    #[serde(default = "default_store_url")]
    pub url: String,
}

/// Price generator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    /// Nominal interval between generation passes (milliseconds)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Number of tickers the fill command seeds
    #[serde(default = "default_seed_count")]
    pub seed_count: u32,
}

/// Live-update server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address for subscriber connections
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Bounded wait on each relay subscription poll (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Page size for gap-fill history responses
    #[serde(default = "default_history_page_size")]
    pub history_page_size: u32,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_store_url() -> String {
    "sqlite://tickertape.db".to_string()
}
fn default_interval_ms() -> u64 {
    1000
}
fn default_seed_count() -> u32 {
    100
}
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_history_page_size() -> u32 {
    15
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            seed_count: default_seed_count(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            poll_interval_ms: default_poll_interval_ms(),
            history_page_size: default_history_page_size(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            [store]
            url = "sqlite://prices.db"

            [generator]
            interval_ms = 250
            seed_count = 10

            [server]
            bind = "0.0.0.0:9000"
            poll_interval_ms = 50
            history_page_size = 30

            [telemetry]
            log_level = "debug"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.store.url, "sqlite://prices.db");
        assert_eq!(config.generator.interval_ms, 250);
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.store.url, "sqlite://tickertape.db");
        assert_eq!(config.generator.interval_ms, 1000);
        assert_eq!(config.generator.seed_count, 100);
        assert_eq!(config.server.poll_interval_ms, 100);
        assert_eq!(config.server.history_page_size, 15);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_partial_section_fills_in_defaults() {
        let toml = r#"
            [generator]
            interval_ms = 50
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.generator.interval_ms, 50);
        assert_eq!(config.generator.seed_count, 100);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }
}
