//! Income and expense transactions of a domain ledger

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{Direction, PositiveAmount, TransactionId};

use crate::account::Domain;
use crate::error::LedgerError;

/// Reference type stamped on offsetting reversal postings
pub const REVERSAL_REFERENCE: &str = "reversal";

/// Income adds to the domain balance, expense takes from it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn direction(&self) -> Direction {
        match self {
            TransactionType::Income => Direction::Inflow,
            TransactionType::Expense => Direction::Outflow,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            TransactionType::Income => TransactionType::Expense,
            TransactionType::Expense => TransactionType::Income,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(LedgerError::validation(format!("unknown transaction type '{}'", other))),
        }
    }
}

/// A posted income/expense row
///
/// Amount, category and description change only through an explicit update;
/// rows are never deleted. `posting_seq` is the global insertion order used to
/// break ties between rows sharing a business date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub domain: Domain,
    pub transaction_type: TransactionType,
    pub category: String,
    pub category_id: Option<i64>,
    pub amount: Decimal,
    pub description: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub transaction_date: NaiveDate,
    pub transaction_no: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub posting_seq: i64,
    /// Offsetting transaction, once this one has been reversed
    pub reversed_by: Option<TransactionId>,
}

impl Transaction {
    /// Signed effect on the owning account
    pub fn net(&self) -> Decimal {
        self.transaction_type.direction().signed(self.amount)
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed_by.is_some()
    }

    pub fn is_reversal(&self) -> bool {
        self.reference_type.as_deref() == Some(REVERSAL_REFERENCE)
    }
}

/// Input for `add_income` / `add_expense`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPosting {
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub reference_type: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
    /// Business date; today when absent
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl NewPosting {
    pub fn new(amount: Decimal, category: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            amount,
            category: category.into(),
            description: description.into(),
            reference_type: None,
            reference_id: None,
            date: None,
            category_id: None,
            created_by: None,
        }
    }

    /// Points the posting at the business record that caused it
    pub fn with_reference(mut self, reference_type: impl Into<String>, reference_id: impl Into<String>) -> Self {
        self.reference_type = Some(reference_type.into());
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn dated(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_category_id(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = Some(user.into());
        self
    }

    /// Checks a caller's posting before anything is locked or written
    ///
    /// The `reversal` reference type is reserved for offsets created by
    /// `reverse_transaction`.
    pub(crate) fn validate(&self) -> Result<PositiveAmount, LedgerError> {
        if self
            .reference_type
            .as_deref()
            .is_some_and(|r| r.trim().eq_ignore_ascii_case(REVERSAL_REFERENCE))
        {
            return Err(LedgerError::validation(format!(
                "reference type '{}' is reserved",
                REVERSAL_REFERENCE
            )));
        }
        self.checked_amount()
    }

    pub(crate) fn checked_amount(&self) -> Result<PositiveAmount, LedgerError> {
        let amount = PositiveAmount::new(self.amount)?;
        if self.category.trim().is_empty() {
            return Err(LedgerError::validation("category must not be empty"));
        }
        Ok(amount)
    }
}

/// Input for `update_income` / `update_expense`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionUpdate {
    pub amount: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
}

impl TransactionUpdate {
    pub fn amount(amount: Decimal) -> Self {
        Self {
            amount,
            category: None,
            description: None,
            category_id: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category_id(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub(crate) fn validate(&self) -> Result<PositiveAmount, LedgerError> {
        let amount = PositiveAmount::new(self.amount)?;
        if matches!(&self.category, Some(c) if c.trim().is_empty()) {
            return Err(LedgerError::validation("category must not be empty"));
        }
        Ok(amount)
    }

    /// Overwrites the mutable fields and returns the amount delta
    pub(crate) fn apply_to(&self, transaction: &mut Transaction) -> Decimal {
        let delta = self.amount - transaction.amount;
        transaction.amount = self.amount;
        if let Some(category) = &self.category {
            transaction.category = category.clone();
        }
        if let Some(description) = &self.description {
            transaction.description = description.clone();
        }
        if self.category_id.is_some() {
            transaction.category_id = self.category_id;
        }
        transaction.updated_at = Utc::now();
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Transaction {
        let now = Utc::now();
        Transaction {
            id: TransactionId::new(),
            domain: Domain::Hospital,
            transaction_type: TransactionType::Expense,
            category: "Salary".to_string(),
            category_id: None,
            amount: dec!(250),
            description: "March salary".to_string(),
            reference_type: None,
            reference_id: None,
            transaction_date: now.date_naive(),
            transaction_no: "HSP-000001".to_string(),
            created_by: None,
            created_at: now,
            updated_at: now,
            posting_seq: 1,
            reversed_by: None,
        }
    }

    #[test]
    fn test_expense_net_is_negative() {
        assert_eq!(sample().net(), dec!(-250));
    }

    #[test]
    fn test_posting_validation() {
        assert!(NewPosting::new(dec!(0), "OPD", "x").validate().is_err());
        assert!(NewPosting::new(dec!(-5), "OPD", "x").validate().is_err());
        assert!(NewPosting::new(dec!(5), "  ", "x").validate().is_err());
        assert_eq!(NewPosting::new(dec!(5), "OPD", "x").validate().unwrap().value(), dec!(5));
        let reserved = NewPosting::new(dec!(5), "OPD", "x").with_reference(" Reversal ", "TXN-1");
        assert!(reserved.validate().unwrap_err().is_validation());
        assert!(reserved.checked_amount().is_ok());
    }

    #[test]
    fn test_update_returns_delta_and_keeps_unset_fields() {
        let mut tx = sample();
        let delta = TransactionUpdate::amount(dec!(200)).apply_to(&mut tx);
        assert_eq!(delta, dec!(-50));
        assert_eq!(tx.category, "Salary");
        assert_eq!(tx.amount, dec!(200));
    }
}
