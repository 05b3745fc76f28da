//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the clinic ledger using SQLx.
//!
//! # Architecture
//!
//! - `pool`: connection pool settings and schema migrations
//! - `repositories`: row types and SQL per table
//! - `adapters`: the `LedgerStore` port implementation
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresLedgerAdapter};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresLedgerAdapter::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, run_migrations, DatabaseConfig, MIN_LEDGER_CONNECTIONS};
pub use error::DatabaseError;
pub use adapters::PostgresLedgerAdapter;
