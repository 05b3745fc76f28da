//! Capital movements into and out of a domain account

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use core_kernel::{Direction, FundTransactionId, PositiveAmount};

use crate::account::Domain;
use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundType {
    FundIn,
    FundOut,
}

impl FundType {
    pub fn direction(&self) -> Direction {
        match self {
            FundType::FundIn => Direction::Inflow,
            FundType::FundOut => Direction::Outflow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FundType::FundIn => "fund_in",
            FundType::FundOut => "fund_out",
        }
    }
}

impl FromStr for FundType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fund_in" => Ok(FundType::FundIn),
            "fund_out" => Ok(FundType::FundOut),
            other => Err(LedgerError::validation(format!("unknown fund type '{}'", other))),
        }
    }
}

/// A manual capital injection or withdrawal
///
/// Append-only. Counted in opening balances and statements but never merged
/// into Main vouchers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundTransaction {
    pub id: FundTransactionId,
    pub domain: Domain,
    pub fund_type: FundType,
    pub amount: Decimal,
    pub purpose: String,
    pub voucher_no: String,
    pub date: NaiveDate,
    pub added_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub posting_seq: i64,
}

impl FundTransaction {
    pub fn net(&self) -> Decimal {
        self.fund_type.direction().signed(self.amount)
    }
}

/// Input for `add_fund` / `withdraw_fund`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundMovement {
    pub amount: Decimal,
    pub purpose: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub added_by: Option<String>,
}

impl FundMovement {
    pub fn new(amount: Decimal, purpose: impl Into<String>) -> Self {
        Self {
            amount,
            purpose: purpose.into(),
            date: None,
            added_by: None,
        }
    }

    pub fn dated(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn added_by(mut self, user: impl Into<String>) -> Self {
        self.added_by = Some(user.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<PositiveAmount, LedgerError> {
        Ok(PositiveAmount::new(self.amount)?)
    }
}
