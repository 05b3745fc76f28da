//! Ledger domain errors

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{MoneyError, PortError, TemporalError};

use crate::account::Domain;

/// Errors that can occur in the ledger domain
///
/// Validation and business-rule failures are raised before anything is
/// written; storage failures abort the surrounding unit of work.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Input rejected before any mutation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Domain name that is not one of the known ledgers
    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Voucher not found: {0}")]
    VoucherNotFound(String),

    #[error("Vendor not found: {0}")]
    VendorNotFound(String),

    #[error("Purchase not found: {0}")]
    PurchaseNotFound(String),

    /// Payout larger than the account holds
    #[error("Insufficient balance in {domain}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        domain: Domain,
        balance: Decimal,
        requested: Decimal,
    },

    /// Vendor payment larger than what is owed
    #[error("Payment of {requested} exceeds outstanding due {due}")]
    InsufficientDue {
        due: Decimal,
        requested: Decimal,
    },

    #[error("Credit limit exceeded: limit {limit}, current due {current}, new due {requested}")]
    CreditLimitExceeded {
        limit: Decimal,
        current: Decimal,
        requested: Decimal,
    },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(#[from] TemporalError),

    #[error("Arithmetic overflow while computing {0}")]
    Overflow(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Storage error: {0}")]
    Storage(#[from] PortError),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        LedgerError::InvalidOperation(message.into())
    }

    /// Rejected input (bad amount, empty category, bad range)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::Validation(_) | LedgerError::UnknownDomain(_) | LedgerError::InvalidDateRange(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            LedgerError::TransactionNotFound(_)
            | LedgerError::VoucherNotFound(_)
            | LedgerError::VendorNotFound(_)
            | LedgerError::PurchaseNotFound(_) => true,
            LedgerError::Storage(err) => err.is_not_found(),
            _ => false,
        }
    }

    /// Business-rule failures reported to the caller, nothing posted
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            LedgerError::InsufficientBalance { .. }
                | LedgerError::InsufficientDue { .. }
                | LedgerError::CreditLimitExceeded { .. }
                | LedgerError::InvalidOperation(_)
        )
    }
}

impl From<MoneyError> for LedgerError {
    fn from(error: MoneyError) -> Self {
        match error {
            MoneyError::Overflow => LedgerError::Overflow("balance".to_string()),
            other => LedgerError::Validation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_errors_map_to_validation() {
        let err: LedgerError = MoneyError::NonPositive(dec!(0)).into();
        assert!(err.is_validation());
        let overflow: LedgerError = MoneyError::Overflow.into();
        assert!(matches!(overflow, LedgerError::Overflow(_)));
    }

    #[test]
    fn test_storage_not_found_is_not_found() {
        let err: LedgerError = PortError::not_found("Voucher", "VCH-1").into();
        assert!(err.is_not_found());
        assert!(!err.is_business_rule());
    }
}
