//! Financial domains and their balance-holding accounts
//!
//! There is exactly one account per domain. Accounts are created lazily the
//! first time a unit of work locks them, seeded with the configured opening
//! base, and are never deleted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::balance::BalanceCell;
use crate::error::LedgerError;

/// The independent business areas that keep their own ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Consolidating ledger fed by vouchers
    Main,
    Hospital,
    Medicine,
    Optics,
    Operation,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Main,
        Domain::Hospital,
        Domain::Medicine,
        Domain::Optics,
        Domain::Operation,
    ];

    /// Human-readable label used in narrations and reports
    pub fn label(&self) -> &'static str {
        match self {
            Domain::Main => "Main",
            Domain::Hospital => "Hospital",
            Domain::Medicine => "Medicine",
            Domain::Optics => "Optics",
            Domain::Operation => "Operation",
        }
    }

    /// Short code used in transaction and fund voucher numbers
    pub fn code(&self) -> &'static str {
        match self {
            Domain::Main => "MAN",
            Domain::Hospital => "HSP",
            Domain::Medicine => "MED",
            Domain::Optics => "OPT",
            Domain::Operation => "OPR",
        }
    }

    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Main => "main",
            Domain::Hospital => "hospital",
            Domain::Medicine => "medicine",
            Domain::Optics => "optics",
            Domain::Operation => "operation",
        }
    }

    pub fn is_main(&self) -> bool {
        matches!(self, Domain::Main)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" => Ok(Domain::Main),
            "hospital" => Ok(Domain::Hospital),
            "medicine" => Ok(Domain::Medicine),
            "optics" => Ok(Domain::Optics),
            "operation" => Ok(Domain::Operation),
            _ => Err(LedgerError::UnknownDomain(s.to_string())),
        }
    }
}

/// The singleton balance holder of a domain
///
/// The balance is not settable from outside the crate; it moves only through
/// the posting service inside a unit of work. The per-domain counters are
/// advanced under the same account lock, which keeps transaction numbers
/// gap-free and unique without a separate sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    domain: Domain,
    balance: Decimal,
    transaction_seq: u64,
    fund_voucher_seq: u64,
    updated_at: DateTime<Utc>,
}

impl Account {
    /// A freshly created account holding the opening base
    pub fn open(domain: Domain, opening_base: Decimal) -> Self {
        Self {
            domain,
            balance: opening_base,
            transaction_seq: 0,
            fund_voucher_seq: 0,
            updated_at: Utc::now(),
        }
    }

    /// Rebuilds an account from persisted state
    ///
    /// Intended for storage adapters only.
    pub fn restore(
        domain: Domain,
        balance: Decimal,
        transaction_seq: u64,
        fund_voucher_seq: u64,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            domain,
            balance,
            transaction_seq,
            fund_voucher_seq,
            updated_at,
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Current live balance
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn transaction_seq(&self) -> u64 {
        self.transaction_seq
    }

    pub fn fund_voucher_seq(&self) -> u64 {
        self.fund_voucher_seq
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Allocates the next `{CODE}-{seq:06}` transaction number
    pub(crate) fn next_transaction_no(&mut self) -> String {
        self.transaction_seq += 1;
        format!("{}-{:06}", self.domain.code(), self.transaction_seq)
    }

    /// Allocates the next `FV-{CODE}-{seq:04}` fund voucher number
    pub(crate) fn next_fund_voucher_no(&mut self) -> String {
        self.fund_voucher_seq += 1;
        format!("FV-{}-{:04}", self.domain.code(), self.fund_voucher_seq)
    }
}

impl BalanceCell for Account {
    fn balance_slot(&mut self) -> &mut Decimal {
        &mut self.balance
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn owner(&self) -> String {
        self.domain.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_domain_parse_is_case_insensitive() {
        assert_eq!("Hospital".parse::<Domain>().unwrap(), Domain::Hospital);
        assert_eq!(" optics ".parse::<Domain>().unwrap(), Domain::Optics);
        assert!(matches!("pharmacy".parse::<Domain>(), Err(LedgerError::UnknownDomain(_))));
    }

    #[test]
    fn test_transaction_numbers_are_sequential() {
        let mut account = Account::open(Domain::Medicine, dec!(0));
        assert_eq!(account.next_transaction_no(), "MED-000001");
        assert_eq!(account.next_transaction_no(), "MED-000002");
        assert_eq!(account.next_fund_voucher_no(), "FV-MED-0001");
        assert_eq!(account.transaction_seq(), 2);
    }

    #[test]
    fn test_open_seeds_opening_base() {
        let account = Account::open(Domain::Hospital, dec!(1500.00));
        assert_eq!(account.balance(), dec!(1500.00));
    }
}
