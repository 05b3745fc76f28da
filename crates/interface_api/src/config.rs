//! API configuration
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! TOML file named by `LEDGER_CONFIG_FILE`, and `LEDGER_*` environment
//! variables. Nested keys use a double underscore, e.g.
//! `LEDGER_LEDGER__TIMEZONE=Asia/Dhaka`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use domain_ledger::LedgerConfig;
use infra_db::DatabaseConfig;

/// Where the ledger keeps its rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Postgres,
    /// Process-local store, lost on restart
    Memory,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    pub storage: StorageBackend,
    /// Database URL
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_connect_timeout_secs: u64,
    /// Log level or filter directive
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Seconds between background reconciliation runs; 0 disables them
    pub reconciliation_interval_secs: u64,
    /// Opening bases, category taxonomy and business timezone
    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            storage: StorageBackend::Postgres,
            database_url: "postgres://localhost/clinic_ledger".to_string(),
            db_max_connections: 10,
            db_min_connections: 2,
            db_connect_timeout_secs: 30,
            log_level: "info".to_string(),
            log_json: false,
            reconciliation_interval_secs: 300,
            ledger: LedgerConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `LEDGER_CONFIG_FILE` and the environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let file = std::env::var("LEDGER_CONFIG_FILE").ok();
        let mut builder = Self::defaults()?;
        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(&path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix("LEDGER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Defaults overlaid with a single extra source
    pub fn from_source<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        Self::defaults()?.add_source(source).build()?.try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        let defaults = config::Config::try_from(&ApiConfig::default())?;
        Ok(config::Config::builder().add_source(defaults))
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database_url.clone(),
            max_connections: self.db_max_connections,
            min_connections: self.db_min_connections,
            acquire_timeout: Duration::from_secs(self.db_connect_timeout_secs),
        }
    }

    pub fn reconciliation_interval(&self) -> Option<Duration> {
        match self.reconciliation_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};
    use domain_ledger::Domain;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_round_trip_through_config() {
        let config = ApiConfig::from_source(File::from_str("", FileFormat::Toml)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.reconciliation_interval(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let toml = r#"
            port = 9090
            storage = "memory"
            reconciliation_interval_secs = 0

            [ledger.opening_balances]
            hospital = "1500.00"
        "#;
        let config = ApiConfig::from_source(File::from_str(toml, FileFormat::Toml)).unwrap();
        assert_eq!(config.server_addr(), "0.0.0.0:9090");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.reconciliation_interval(), None);
        assert_eq!(config.ledger.opening_balance(Domain::Hospital), dec!(1500.00));
        assert_eq!(config.ledger.opening_balance(Domain::Optics), dec!(0));
    }

    #[test]
    fn test_database_settings() {
        let config = ApiConfig {
            db_max_connections: 4,
            ..ApiConfig::default()
        };
        let db = config.database();
        assert_eq!(db.max_connections, 4);
        assert_eq!(db.acquire_timeout, Duration::from_secs(30));
    }
}
