//! Main-ledger consolidation vouchers
//!
//! A voucher summarises every same-day, same-source, same-direction posting
//! of a domain ledger in one Main-ledger row. The tuple
//! `(date, source_account, source_transaction_type, voucher_type)` is the
//! merge key; at most one voucher exists per key.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{checked_sum, Direction, PositiveAmount, TransactionId, VoucherId};

use crate::account::Domain;
use crate::error::LedgerError;

/// Credit vouchers add to the Main balance, debit vouchers subtract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherType {
    Credit,
    Debit,
}

impl VoucherType {
    pub fn direction(&self) -> Direction {
        match self {
            VoucherType::Credit => Direction::Inflow,
            VoucherType::Debit => Direction::Outflow,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            VoucherType::Credit => VoucherType::Debit,
            VoucherType::Debit => VoucherType::Credit,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherType::Credit => "Credit",
            VoucherType::Debit => "Debit",
        }
    }
}

impl fmt::Display for VoucherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoucherType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "credit" => Ok(VoucherType::Credit),
            "debit" => Ok(VoucherType::Debit),
            _ => Err(LedgerError::validation(format!("unknown voucher type '{}'", s))),
        }
    }
}

/// Identity of a consolidation row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergeKey {
    pub date: NaiveDate,
    pub source_account: Domain,
    pub source_transaction_type: String,
    pub voucher_type: VoucherType,
}

impl MergeKey {
    /// Stable text form, used as the lock name by storage adapters
    pub fn lock_name(&self) -> String {
        format!(
            "voucher:{}:{}:{}:{}",
            self.date, self.source_account, self.source_transaction_type, self.voucher_type
        )
    }
}

/// A Main-ledger voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherId,
    pub sl_no: i64,
    pub voucher_no: String,
    pub voucher_type: VoucherType,
    pub date: NaiveDate,
    pub narration: String,
    pub amount: Decimal,
    pub source_account: Domain,
    pub source_transaction_type: String,
    pub source_voucher_no: Option<String>,
    pub source_reference_id: Option<TransactionId>,
    /// Every domain transaction merged into this voucher
    pub linked_transactions: Vec<TransactionId>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub posting_seq: i64,
}

impl Voucher {
    pub fn key(&self) -> MergeKey {
        MergeKey {
            date: self.date,
            source_account: self.source_account,
            source_transaction_type: self.source_transaction_type.clone(),
            voucher_type: self.voucher_type,
        }
    }

    /// Signed effect on the Main account
    pub fn net(&self) -> Decimal {
        self.voucher_type.direction().signed(self.amount)
    }

    pub fn links(&self, transaction_id: TransactionId) -> bool {
        self.linked_transactions.contains(&transaction_id)
    }

    /// Folds another posting with the same key into this row
    ///
    /// Nothing changes when the summed amount does not fit a decimal.
    pub(crate) fn merge(
        &mut self,
        amount: Decimal,
        description: &str,
        source: Option<TransactionId>,
    ) -> Result<(), LedgerError> {
        self.amount = checked_sum(self.amount, amount).map_err(|_| self.overflow())?;
        self.narration.push_str(" + ");
        self.narration.push_str(description);
        if let Some(id) = source {
            self.link(id);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Applies a correction delta coming from an updated source transaction
    pub(crate) fn adjust(&mut self, delta: Decimal) -> Result<(), LedgerError> {
        self.amount = checked_sum(self.amount, delta).map_err(|_| self.overflow())?;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn overflow(&self) -> LedgerError {
        LedgerError::Overflow(format!("amount of voucher {}", self.voucher_no))
    }

    fn link(&mut self, id: TransactionId) {
        if !self.links(id) {
            self.linked_transactions.push(id);
        }
    }
}

/// Input for the merge routine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherPosting {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub voucher_type: VoucherType,
    pub source_account: Domain,
    pub source_transaction_type: String,
    pub description: String,
    #[serde(default)]
    pub source_voucher_no: Option<String>,
    #[serde(default)]
    pub source_reference_id: Option<TransactionId>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl VoucherPosting {
    pub fn new(
        date: NaiveDate,
        amount: Decimal,
        voucher_type: VoucherType,
        source_account: Domain,
        source_transaction_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            date,
            amount,
            voucher_type,
            source_account,
            source_transaction_type: source_transaction_type.into(),
            description: description.into(),
            source_voucher_no: None,
            source_reference_id: None,
            created_by: None,
        }
    }

    /// Links the voucher back to the domain transaction that produced it
    pub fn with_source(mut self, voucher_no: impl Into<String>, reference_id: TransactionId) -> Self {
        self.source_voucher_no = Some(voucher_no.into());
        self.source_reference_id = Some(reference_id);
        self
    }

    pub fn created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = Some(user.into());
        self
    }

    pub fn key(&self) -> MergeKey {
        MergeKey {
            date: self.date,
            source_account: self.source_account,
            source_transaction_type: self.source_transaction_type.clone(),
            voucher_type: self.voucher_type,
        }
    }

    pub(crate) fn validate(&self) -> Result<PositiveAmount, LedgerError> {
        let amount = PositiveAmount::new(self.amount)?;
        if self.source_transaction_type.trim().is_empty() {
            return Err(LedgerError::validation("source transaction type must not be empty"));
        }
        if self.source_account.is_main() {
            return Err(LedgerError::validation("the Main ledger cannot be the source of its own voucher"));
        }
        Ok(amount)
    }

    /// Narration of a newly created voucher
    pub(crate) fn opening_narration(&self) -> String {
        format!(
            "{} - {}: {}",
            self.source_account.label(),
            type_label(&self.source_transaction_type),
            self.description
        )
    }

    pub(crate) fn into_voucher(self, id: VoucherId, sl_no: i64, voucher_seq: u64, posting_seq: i64) -> Voucher {
        let now = Utc::now();
        let narration = self.opening_narration();
        Voucher {
            id,
            sl_no,
            voucher_no: format_voucher_no(voucher_seq),
            voucher_type: self.voucher_type,
            date: self.date,
            narration,
            amount: self.amount,
            source_account: self.source_account,
            source_transaction_type: self.source_transaction_type,
            source_voucher_no: self.source_voucher_no,
            source_reference_id: self.source_reference_id,
            linked_transactions: self.source_reference_id.into_iter().collect(),
            created_by: self.created_by,
            created_at: now,
            updated_at: now,
            posting_seq,
        }
    }
}

/// Two-digit zero padded voucher number; grows past two digits unbounded
pub fn format_voucher_no(seq: u64) -> String {
    format!("{:02}", seq)
}

/// Parses a stored voucher number back into its sequence
pub fn parse_voucher_no(voucher_no: &str) -> Option<u64> {
    voucher_no.trim().parse().ok()
}

/// "medical_test" -> "Medical Test"
pub fn type_label(source_transaction_type: &str) -> String {
    source_transaction_type
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn posting(description: &str) -> VoucherPosting {
        VoucherPosting::new(
            NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
            dec!(500),
            VoucherType::Credit,
            Domain::Hospital,
            "medical_test",
            description,
        )
    }

    #[test]
    fn test_voucher_numbers() {
        assert_eq!(format_voucher_no(1), "01");
        assert_eq!(format_voucher_no(99), "99");
        assert_eq!(format_voucher_no(100), "100");
        assert_eq!(parse_voucher_no("07"), Some(7));
        assert_eq!(parse_voucher_no("x"), None);
    }

    #[test]
    fn test_type_label() {
        assert_eq!(type_label("medical_test"), "Medical Test");
        assert_eq!(type_label("income"), "Income");
        assert_eq!(type_label("opd-income"), "Opd Income");
    }

    #[test]
    fn test_new_voucher_narration_and_links() {
        let source = TransactionId::new();
        let voucher = posting("Group G1")
            .with_source("HSP-000001", source)
            .into_voucher(VoucherId::new(), 1, 3, 10);
        assert_eq!(voucher.narration, "Hospital - Medical Test: Group G1");
        assert_eq!(voucher.voucher_no, "03");
        assert!(voucher.links(source));
    }

    #[test]
    fn test_merge_appends_narration_and_sums() {
        let mut voucher = posting("Group G1").into_voucher(VoucherId::new(), 1, 1, 1);
        let second = TransactionId::new();
        voucher.merge(dec!(300), "Group G2", Some(second)).unwrap();
        voucher.merge(dec!(1), "again", Some(second)).unwrap();
        assert_eq!(voucher.amount, dec!(801));
        assert_eq!(voucher.narration, "Hospital - Medical Test: Group G1 + Group G2 + again");
        assert_eq!(voucher.linked_transactions, vec![second]);
    }

    #[test]
    fn test_merge_overflow_leaves_voucher_untouched() {
        let mut voucher = posting("Group G1").into_voucher(VoucherId::new(), 1, 1, 1);
        voucher.amount = Decimal::MAX - dec!(1);
        let err = voucher.merge(dec!(2), "Group G2", Some(TransactionId::new())).unwrap_err();
        assert!(matches!(err, LedgerError::Overflow(_)));
        assert_eq!(voucher.amount, Decimal::MAX - dec!(1));
        assert_eq!(voucher.narration, "Hospital - Medical Test: Group G1");
        assert!(voucher.linked_transactions.is_empty());
        assert!(matches!(voucher.adjust(dec!(5)), Err(LedgerError::Overflow(_))));
    }

    #[test]
    fn test_merge_key_lock_name() {
        let key = posting("x").key();
        assert_eq!(key.lock_name(), "voucher:2024-04-10:hospital:medical_test:Credit");
    }
}
