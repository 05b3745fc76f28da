//! Replayable history of one domain ledger
//!
//! Transactions, fund movements and (for Main) vouchers are flattened into a
//! single sequence of signed entries ordered by business date, then by the
//! global posting sequence.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::checked_total;

use crate::account::Domain;
use crate::category::Side;
use crate::error::LedgerError;
use crate::fund::{FundTransaction, FundType};
use crate::transaction::{Transaction, TransactionType};
use crate::voucher::{Voucher, VoucherType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "type", rename_all = "snake_case")]
pub enum EntryKind {
    Transaction(TransactionType),
    Fund(FundType),
    Voucher(VoucherType),
}

impl EntryKind {
    pub fn side(&self) -> Side {
        match self {
            EntryKind::Transaction(t) => Side::from(*t),
            EntryKind::Voucher(v) => Side::from(*v),
            EntryKind::Fund(FundType::FundIn) => Side::Credit,
            EntryKind::Fund(FundType::FundOut) => Side::Debit,
        }
    }

    pub fn is_fund(&self) -> bool {
        matches!(self, EntryKind::Fund(_))
    }
}

/// One row of replayable history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub posting_seq: i64,
    pub kind: EntryKind,
    /// Transaction, fund voucher or Main voucher number
    pub number: String,
    /// Category for transactions, source type for vouchers, none for funds
    pub category: Option<String>,
    pub description: String,
    /// Always positive
    pub amount: Decimal,
}

impl LedgerEntry {
    pub fn signed(&self) -> Decimal {
        match self.kind.side() {
            Side::Credit => self.amount,
            Side::Debit => -self.amount,
        }
    }
}

impl From<&Transaction> for LedgerEntry {
    fn from(tx: &Transaction) -> Self {
        Self {
            date: tx.transaction_date,
            posting_seq: tx.posting_seq,
            kind: EntryKind::Transaction(tx.transaction_type),
            number: tx.transaction_no.clone(),
            category: Some(tx.category.clone()),
            description: tx.description.clone(),
            amount: tx.amount,
        }
    }
}

impl From<&FundTransaction> for LedgerEntry {
    fn from(fund: &FundTransaction) -> Self {
        Self {
            date: fund.date,
            posting_seq: fund.posting_seq,
            kind: EntryKind::Fund(fund.fund_type),
            number: fund.voucher_no.clone(),
            category: None,
            description: fund.purpose.clone(),
            amount: fund.amount,
        }
    }
}

impl From<&Voucher> for LedgerEntry {
    fn from(voucher: &Voucher) -> Self {
        Self {
            date: voucher.date,
            posting_seq: voucher.posting_seq,
            kind: EntryKind::Voucher(voucher.voucher_type),
            number: voucher.voucher_no.clone(),
            category: Some(voucher.source_transaction_type.clone()),
            description: voucher.narration.clone(),
            amount: voucher.amount,
        }
    }
}

/// Everything posted to one domain up to some date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerHistory {
    pub transactions: Vec<Transaction>,
    pub fund_transactions: Vec<FundTransaction>,
    /// Only populated for Main
    pub vouchers: Vec<Voucher>,
}

impl LedgerHistory {
    /// Restricts the history to what belongs to `domain`
    ///
    /// Adapters may hand over broader row sets; vouchers only count for Main.
    pub fn scoped(mut self, domain: Domain) -> Self {
        self.transactions.retain(|t| t.domain == domain);
        self.fund_transactions.retain(|f| f.domain == domain);
        if !domain.is_main() {
            self.vouchers.clear();
        }
        self
    }

    /// Flattened entries in replay order
    pub fn entries(&self) -> Vec<LedgerEntry> {
        let mut entries: Vec<LedgerEntry> = self
            .transactions
            .iter()
            .map(LedgerEntry::from)
            .chain(self.fund_transactions.iter().map(LedgerEntry::from))
            .chain(self.vouchers.iter().map(LedgerEntry::from))
            .collect();
        entries.sort_by(|a, b| a.date.cmp(&b.date).then(a.posting_seq.cmp(&b.posting_seq)));
        entries
    }

    /// Net of every entry dated strictly before `date`
    pub fn net_before(&self, date: NaiveDate) -> Result<Decimal, LedgerError> {
        Ok(checked_total(
            self.entries().iter().filter(|e| e.date < date).map(LedgerEntry::signed),
        )?)
    }

    /// Net of the whole history
    pub fn net(&self) -> Result<Decimal, LedgerError> {
        Ok(checked_total(self.entries().iter().map(LedgerEntry::signed))?)
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty() && self.fund_transactions.is_empty() && self.vouchers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_kernel::{FundTransactionId, TransactionId};
    use rust_decimal_macros::dec;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn tx(day: u32, seq: i64, kind: TransactionType, amount: Decimal) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: TransactionId::new(),
            domain: Domain::Optics,
            transaction_type: kind,
            category: "Optics Income".to_string(),
            category_id: None,
            amount,
            description: String::new(),
            reference_type: None,
            reference_id: None,
            transaction_date: date(day),
            transaction_no: format!("OPT-{:06}", seq),
            created_by: None,
            created_at: now,
            updated_at: now,
            posting_seq: seq,
            reversed_by: None,
        }
    }

    fn fund(day: u32, seq: i64, amount: Decimal) -> FundTransaction {
        FundTransaction {
            id: FundTransactionId::new(),
            domain: Domain::Optics,
            fund_type: FundType::FundIn,
            amount,
            purpose: "capital".to_string(),
            voucher_no: "FV-OPT-0001".to_string(),
            date: date(day),
            added_by: None,
            created_at: Utc::now(),
            posting_seq: seq,
        }
    }

    #[test]
    fn test_entries_sorted_by_date_then_posting_seq() {
        let history = LedgerHistory {
            transactions: vec![
                tx(3, 5, TransactionType::Expense, dec!(20)),
                tx(2, 9, TransactionType::Income, dec!(50)),
            ],
            fund_transactions: vec![fund(2, 4, dec!(100))],
            vouchers: vec![],
        };
        let seqs: Vec<i64> = history.entries().iter().map(|e| e.posting_seq).collect();
        assert_eq!(seqs, vec![4, 9, 5]);
    }

    #[test]
    fn test_net_before_excludes_the_day_itself() {
        let history = LedgerHistory {
            transactions: vec![
                tx(1, 1, TransactionType::Income, dec!(50)),
                tx(3, 2, TransactionType::Expense, dec!(20)),
            ],
            fund_transactions: vec![fund(2, 3, dec!(100))],
            vouchers: vec![],
        };
        assert_eq!(history.net_before(date(3)).unwrap(), dec!(150));
        assert_eq!(history.net().unwrap(), dec!(130));
    }

    #[test]
    fn test_scoped_drops_vouchers_outside_main() {
        let history = LedgerHistory {
            transactions: vec![tx(1, 1, TransactionType::Income, dec!(5))],
            ..Default::default()
        };
        assert!(history.clone().scoped(Domain::Hospital).is_empty());
        assert!(!history.scoped(Domain::Optics).is_empty());
    }
}
