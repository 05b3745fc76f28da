//! Vendor payables
//!
//! A vendor carries one signed running figure, `net_due`: positive while the
//! clinic owes the vendor, negative once it has paid ahead. Purchases raise
//! it, payments and advances lower it.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use core_kernel::{checked_sum, checked_total, PositiveAmount, TransactionId, VendorId, VendorTransactionId};

use crate::account::Domain;
use crate::balance::BalanceCell;
use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceType {
    Due,
    Advance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
    net_due: Decimal,
    pub credit_limit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vendor {
    pub fn register(name: impl Into<String>, credit_limit: Option<Decimal>) -> Result<Self, LedgerError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LedgerError::validation("vendor name must not be empty"));
        }
        if matches!(credit_limit, Some(limit) if limit.is_sign_negative()) {
            return Err(LedgerError::validation("credit limit must not be negative"));
        }
        let now = Utc::now();
        Ok(Self {
            id: VendorId::new(),
            name,
            net_due: Decimal::ZERO,
            credit_limit,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds a vendor from persisted state
    pub fn restore(
        id: VendorId,
        name: String,
        net_due: Decimal,
        credit_limit: Option<Decimal>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            net_due,
            credit_limit,
            created_at,
            updated_at,
        }
    }

    /// Signed figure; negative means advance
    pub fn net_due(&self) -> Decimal {
        self.net_due
    }

    pub fn current_balance(&self) -> Decimal {
        self.net_due.abs()
    }

    pub fn balance_type(&self) -> BalanceType {
        if self.net_due.is_sign_negative() && !self.net_due.is_zero() {
            BalanceType::Advance
        } else {
            BalanceType::Due
        }
    }

    /// Amount actually owed, zero while in advance
    pub fn outstanding_due(&self) -> Decimal {
        self.net_due.max(Decimal::ZERO)
    }

    /// A due too large to represent is past any limit
    pub(crate) fn check_credit_limit(&self, new_due: Decimal) -> Result<(), LedgerError> {
        let Some(limit) = self.credit_limit else {
            return Ok(());
        };
        match checked_sum(self.net_due, new_due) {
            Ok(total) if total <= limit => Ok(()),
            _ => Err(LedgerError::CreditLimitExceeded {
                limit,
                current: self.net_due,
                requested: new_due,
            }),
        }
    }
}

impl BalanceCell for Vendor {
    fn balance_slot(&mut self) -> &mut Decimal {
        &mut self.net_due
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn owner(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorTransactionKind {
    Purchase,
    Payment,
    Advance,
}

impl VendorTransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VendorTransactionKind::Purchase => "purchase",
            VendorTransactionKind::Payment => "payment",
            VendorTransactionKind::Advance => "advance",
        }
    }
}

impl FromStr for VendorTransactionKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(VendorTransactionKind::Purchase),
            "payment" => Ok(VendorTransactionKind::Payment),
            "advance" => Ok(VendorTransactionKind::Advance),
            other => Err(LedgerError::validation(format!("unknown vendor transaction kind '{}'", other))),
        }
    }
}

/// Part of a payment applied to one purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub purchase_id: VendorTransactionId,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorTransaction {
    pub id: VendorTransactionId,
    pub vendor_id: VendorId,
    pub kind: VendorTransactionKind,
    pub amount: Decimal,
    /// Unpaid part of a purchase; zero for other kinds
    pub outstanding: Decimal,
    pub description: String,
    pub date: NaiveDate,
    pub reference_no: Option<String>,
    #[serde(default)]
    pub allocations: Vec<Allocation>,
    /// Domain expense posted together with this row
    pub ledger_transaction_id: Option<TransactionId>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub posting_seq: i64,
}

impl VendorTransaction {
    pub fn is_open_purchase(&self) -> bool {
        self.kind == VendorTransactionKind::Purchase && self.outstanding > Decimal::ZERO
    }

    pub(crate) fn settle(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if self.kind != VendorTransactionKind::Purchase {
            return Err(LedgerError::invalid_operation(format!("{} is not a purchase", self.id)));
        }
        if amount > self.outstanding {
            return Err(LedgerError::InsufficientDue {
                due: self.outstanding,
                requested: amount,
            });
        }
        self.outstanding -= amount;
        Ok(())
    }
}

/// Input for `record_purchase`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub amount: Decimal,
    #[serde(default)]
    pub paid_now: Decimal,
    pub description: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub reference_no: Option<String>,
    /// Domain whose cash pays `paid_now`
    #[serde(default)]
    pub pay_from: Option<Domain>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl Purchase {
    pub fn new(amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            amount,
            paid_now: Decimal::ZERO,
            description: description.into(),
            date: None,
            reference_no: None,
            pay_from: None,
            created_by: None,
        }
    }

    pub fn paid_now(mut self, paid: Decimal, pay_from: Domain) -> Self {
        self.paid_now = paid;
        self.pay_from = Some(pay_from);
        self
    }

    pub fn dated(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_reference_no(mut self, reference_no: impl Into<String>) -> Self {
        self.reference_no = Some(reference_no.into());
        self
    }

    /// Returns the part left on credit
    pub(crate) fn validate(&self) -> Result<Decimal, LedgerError> {
        let amount = PositiveAmount::new(self.amount)?;
        if self.paid_now.is_sign_negative() || self.paid_now > amount.value() {
            return Err(LedgerError::validation(format!(
                "paid amount {} must be between 0 and {}",
                self.paid_now, amount
            )));
        }
        Ok(amount.value() - self.paid_now)
    }
}

/// Input for `record_payment` and `record_advance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorPayment {
    pub amount: Decimal,
    #[serde(default)]
    pub allocations: Vec<Allocation>,
    pub description: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub reference_no: Option<String>,
    #[serde(default)]
    pub pay_from: Option<Domain>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl VendorPayment {
    pub fn new(amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            amount,
            allocations: Vec::new(),
            description: description.into(),
            date: None,
            reference_no: None,
            pay_from: None,
            created_by: None,
        }
    }

    pub fn allocate(mut self, purchase_id: VendorTransactionId, amount: Decimal) -> Self {
        self.allocations.push(Allocation { purchase_id, amount });
        self
    }

    pub fn pay_from(mut self, domain: Domain) -> Self {
        self.pay_from = Some(domain);
        self
    }

    pub fn dated(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub(crate) fn validate(&self) -> Result<PositiveAmount, LedgerError> {
        let amount = PositiveAmount::new(self.amount)?;
        if self.allocations.iter().any(|a| a.amount <= Decimal::ZERO) {
            return Err(LedgerError::validation("allocation amounts must be positive"));
        }
        let allocated = checked_total(self.allocations.iter().map(|a| a.amount))
            .map_err(|_| LedgerError::validation("allocations total is out of range"))?;
        if allocated > amount.value() {
            return Err(LedgerError::validation(format!(
                "allocations total {} exceeds payment {}",
                allocated, amount
            )));
        }
        Ok(amount)
    }
}

/// Outstanding purchase totals by age
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgingReport {
    pub vendor_id: Option<VendorId>,
    pub as_of: Option<NaiveDate>,
    pub days_0_30: Decimal,
    pub days_31_60: Decimal,
    pub days_61_90: Decimal,
    pub over_90: Decimal,
    pub total: Decimal,
}

impl AgingReport {
    pub fn build<'a>(
        vendor_id: VendorId,
        as_of: NaiveDate,
        purchases: impl IntoIterator<Item = &'a VendorTransaction>,
    ) -> Result<Self, LedgerError> {
        let mut report = AgingReport {
            vendor_id: Some(vendor_id),
            as_of: Some(as_of),
            ..Default::default()
        };
        for purchase in purchases.into_iter().filter(|p| p.is_open_purchase()) {
            let age = (as_of - purchase.date).num_days();
            let bucket = match age {
                i64::MIN..=30 => &mut report.days_0_30,
                31..=60 => &mut report.days_31_60,
                61..=90 => &mut report.days_61_90,
                _ => &mut report.over_90,
            };
            *bucket = checked_sum(*bucket, purchase.outstanding)?;
            report.total = checked_sum(report.total, purchase.outstanding)?;
        }
        Ok(report)
    }
}
