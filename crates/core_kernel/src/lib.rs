//! Core Kernel - Foundational types and utilities for the clinic ledger
//!
//! This crate provides the building blocks used across the workspace:
//! - Decimal money helpers (no floating point anywhere near a balance)
//! - Business-date ranges and the local "today"
//! - Strongly typed identifiers
//! - Port error types shared by storage adapters

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Direction, MoneyError, PositiveAmount, checked_sum, checked_total, round_money, MONEY_SCALE};
pub use temporal::{DateRange, TemporalError, Timezone};
pub use identifiers::{
    TransactionId, FundTransactionId, VoucherId, VendorId, VendorTransactionId,
};
pub use error::CoreError;
pub use ports::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};
