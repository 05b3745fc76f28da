//! Test Utilities Crate
//!
//! Shared test infrastructure for the clinic ledger workspace.
//!
//! # Modules
//!
//! - `fixtures`: fixed dates, amounts and ready-made engines
//! - `builders`: builders for postings and multi-step ledger scenarios
//! - `database`: PostgreSQL test containers with the ledger schema
//! - `assertions`: balance and statement assertions
//! - `generators`: proptest strategies and fake data

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
