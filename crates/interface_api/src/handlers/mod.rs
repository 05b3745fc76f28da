//! Request handlers, one module per resource

pub mod accounts;
pub mod health;
pub mod reconciliation;
pub mod statements;
pub mod transactions;
pub mod vendors;
pub mod vouchers;
