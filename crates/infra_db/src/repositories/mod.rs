//! Row types and SQL for the ledger tables
//!
//! Repositories map between database rows and domain types. They take a
//! connection rather than a pool so the same queries serve units of work and
//! read snapshots.

pub mod ledger;
