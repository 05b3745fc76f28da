//! Domain Adapters
//!
//! Adapter implementations of domain ports on the PostgreSQL layer. Each
//! adapter implements the port trait, uses the repository functions for SQL
//! and translates database errors into `PortError`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresLedgerAdapter;
//! use domain_ledger::{LedgerEngine, LedgerConfig};
//!
//! let store = Arc::new(PostgresLedgerAdapter::new(pool));
//! let engine = LedgerEngine::new(store, LedgerConfig::default())?;
//! ```

pub mod ledger;

pub use ledger::{PostgresLedgerAdapter, PostgresUnitOfWork};
