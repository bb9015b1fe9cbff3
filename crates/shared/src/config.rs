//! Application configuration management.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Currency conversion configuration.
    #[serde(default)]
    pub currency: CurrencyConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Static exchange rates used to resolve `amount_in_company_currency`.
///
/// Keys are `"FROM:TO"` pairs of ISO 4217 codes, values are the rate such
/// that `amount_from * rate = amount_to`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrencyConfig {
    /// Rate table keyed by `"FROM:TO"`.
    #[serde(default)]
    pub rates: HashMap<String, Decimal>,
}

impl CurrencyConfig {
    /// Returns the rate entries as `(from, to, rate)` triples.
    ///
    /// Keys that are not of the form `FROM:TO` are skipped.
    pub fn pairs(&self) -> impl Iterator<Item = (String, String, Decimal)> + '_ {
        self.rates.iter().filter_map(|(key, rate)| {
            let (from, to) = key.split_once(':')?;
            let (from, to) = (from.trim(), to.trim());
            if from.is_empty() || to.is_empty() {
                return None;
            }
            Some((from.to_uppercase(), to.to_uppercase(), *rate))
        })
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("EXPENSA").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("EXPENSA__DATABASE__URL", Some("postgres://localhost/expensa_test")),
                ("EXPENSA__SERVER__PORT", Some("9090")),
                ("RUN_MODE", Some("does-not-exist")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/expensa_test");
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.server.host, "0.0.0.0");
                assert_eq!(config.database.max_connections, 10);
                assert!(config.currency.rates.is_empty());
            },
        );
    }

    #[test]
    fn test_currency_pairs_skip_malformed_keys() {
        let mut rates = HashMap::new();
        rates.insert("usd:eur".to_string(), dec!(0.92));
        rates.insert("broken".to_string(), dec!(1));
        rates.insert(":EUR".to_string(), dec!(1));
        let config = CurrencyConfig { rates };

        let pairs: Vec<_> = config.pairs().collect();
        assert_eq!(pairs, vec![("USD".to_string(), "EUR".to_string(), dec!(0.92))]);
    }
}
