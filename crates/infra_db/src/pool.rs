//! Ledger connection pool and schema
//!
//! A unit of work holds one connection from `begin` until commit and
//! snapshot reads take their own, so a ledger pool keeps at least two.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::error::DatabaseError;

pub type DatabasePool = PgPool;

/// Fewest connections a ledger pool is opened with
pub const MIN_LEDGER_CONNECTIONS: u32 = 2;

/// Pool settings the API exposes under `LEDGER_DB_*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// How long a unit of work waits for a free connection
    pub acquire_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/clinic_ledger".to_string(),
            max_connections: 10,
            min_connections: MIN_LEDGER_CONNECTIONS,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl DatabaseConfig {
    /// Pool options with the size clamped to what the ledger needs
    pub fn pool_options(&self) -> PgPoolOptions {
        let max = self.max_connections.max(MIN_LEDGER_CONNECTIONS);
        PgPoolOptions::new()
            .max_connections(max)
            .min_connections(self.min_connections.min(max))
            .acquire_timeout(self.acquire_timeout)
    }
}

/// Opens the ledger pool
///
/// # Errors
///
/// `DatabaseError::ConnectionFailed` when PostgreSQL cannot be reached
pub async fn create_pool(config: &DatabaseConfig) -> Result<DatabasePool, DatabaseError> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "opening ledger pool"
    );
    config
        .pool_options()
        .connect(&config.url)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))
}

/// Applies the migrations under the workspace `migrations/` directory
///
/// # Errors
///
/// Returns `DatabaseError::MigrationFailed` if any migration fails
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!("ledger schema up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_never_shrinks_below_ledger_minimum() {
        let config = DatabaseConfig {
            max_connections: 1,
            min_connections: 5,
            ..DatabaseConfig::default()
        };
        let options = config.pool_options();
        assert_eq!(options.get_max_connections(), MIN_LEDGER_CONNECTIONS);
        assert_eq!(options.get_min_connections(), MIN_LEDGER_CONNECTIONS);
    }

    #[test]
    fn test_pool_options_carry_settings() {
        let config = DatabaseConfig {
            max_connections: 16,
            acquire_timeout: Duration::from_secs(5),
            ..DatabaseConfig::default()
        };
        let options = config.pool_options();
        assert_eq!(options.get_max_connections(), 16);
        assert_eq!(options.get_min_connections(), 2);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(5));
    }
}
