//! Vendor ledger service
//!
//! Vendor rows are locked before any domain account, so a purchase paid in
//! part from a domain drawer records the payable and the expense in one unit
//! of work: both land or neither does.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::{VendorId, VendorTransactionId};

use crate::account::Domain;
use crate::balance::BalanceCell;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::ports::{LedgerStore, LedgerUnitOfWork};
use crate::posting::{self, business_date};
use crate::service::finish;
use crate::transaction::{NewPosting, Transaction, TransactionType};
use crate::voucher::type_label;
use crate::vendor::{AgingReport, Purchase, Vendor, VendorPayment, VendorTransaction, VendorTransactionKind};

/// Category of the domain expense posted for vendor cash outflows
pub const VENDOR_PAYMENT_CATEGORY: &str = "Vendor Payment";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOutcome {
    pub vendor: Vendor,
    pub purchase: VendorTransaction,
    /// Expense for the part paid on the spot
    pub expense: Option<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub vendor: Vendor,
    pub payment: VendorTransaction,
    pub expense: Option<Transaction>,
}

#[derive(Clone)]
pub struct VendorLedger {
    store: Arc<dyn LedgerStore>,
    config: Arc<LedgerConfig>,
}

impl VendorLedger {
    pub fn new(store: Arc<dyn LedgerStore>, config: Arc<LedgerConfig>) -> Self {
        Self { store, config }
    }

    #[instrument(skip(self))]
    pub async fn register_vendor(&self, name: &str, credit_limit: Option<Decimal>) -> Result<Vendor, LedgerError> {
        let vendor = Vendor::register(name, credit_limit)?;
        let mut uow = self.store.begin().await?;
        let result = uow.insert_vendor(&vendor).await.map_err(LedgerError::from);
        finish(uow, result).await?;
        info!(vendor_id = %vendor.id, "registered vendor");
        Ok(vendor)
    }

    /// Records goods received from a vendor
    ///
    /// The unpaid part raises the vendor due. With `pay_from` set, the part
    /// paid on the spot is posted as an expense of that domain.
    ///
    /// # Errors
    ///
    /// * `VendorNotFound` for an unknown vendor
    /// * `CreditLimitExceeded` when the new due would pass the vendor's limit
    #[instrument(skip(self, purchase), fields(vendor_id = %vendor_id, amount = %purchase.amount))]
    pub async fn record_purchase(&self, vendor_id: VendorId, purchase: Purchase) -> Result<PurchaseOutcome, LedgerError> {
        let new_due = purchase.validate()?;
        let mut uow = self.store.begin().await?;
        let result = async {
            let mut vendor = lock_vendor(uow.as_mut(), vendor_id).await?;
            vendor.check_credit_limit(new_due)?;

            let purchase_id = VendorTransactionId::new_v7();
            if !new_due.is_zero() {
                vendor.increment(new_due, &purchase_id.to_string())?;
            }
            uow.save_vendor(&vendor).await?;

            let date = business_date(&self.config, purchase.date);
            let expense = match purchase.pay_from {
                Some(domain) if purchase.paid_now > Decimal::ZERO => Some(
                    self.post_vendor_expense(
                        uow.as_mut(),
                        domain,
                        purchase.paid_now,
                        format!("Purchase from {}: {}", vendor.name, purchase.description),
                        "vendor_purchase",
                        purchase_id,
                        date,
                        purchase.created_by.clone(),
                    )
                    .await?,
                ),
                _ => None,
            };

            let row = VendorTransaction {
                id: purchase_id,
                vendor_id,
                kind: VendorTransactionKind::Purchase,
                amount: purchase.amount,
                outstanding: new_due,
                description: purchase.description,
                date,
                reference_no: purchase.reference_no,
                allocations: Vec::new(),
                ledger_transaction_id: expense.as_ref().map(|e| e.id),
                created_by: purchase.created_by,
                created_at: Utc::now(),
                posting_seq: uow.next_posting_seq().await?,
            };
            uow.insert_vendor_transaction(&row).await?;
            Ok::<_, LedgerError>(PurchaseOutcome {
                vendor,
                purchase: row,
                expense,
            })
        }
        .await;
        let outcome = finish(uow, result).await?;
        info!(
            purchase_id = %outcome.purchase.id,
            due = %outcome.vendor.net_due(),
            "recorded purchase"
        );
        Ok(outcome)
    }

    /// Pays down what is owed to a vendor
    ///
    /// Allocations are applied in the order given; each must target an
    /// outstanding purchase of this vendor.
    #[instrument(skip(self, payment), fields(vendor_id = %vendor_id, amount = %payment.amount))]
    pub async fn record_payment(&self, vendor_id: VendorId, payment: VendorPayment) -> Result<PaymentOutcome, LedgerError> {
        payment.validate()?;
        self.pay(vendor_id, payment, VendorTransactionKind::Payment).await
    }

    /// Pays a vendor ahead of purchases; the balance may turn into an advance
    #[instrument(skip(self, payment), fields(vendor_id = %vendor_id, amount = %payment.amount))]
    pub async fn record_advance(&self, vendor_id: VendorId, payment: VendorPayment) -> Result<PaymentOutcome, LedgerError> {
        payment.validate()?;
        if !payment.allocations.is_empty() {
            return Err(LedgerError::validation("advances cannot be allocated to purchases"));
        }
        self.pay(vendor_id, payment, VendorTransactionKind::Advance).await
    }

    async fn pay(
        &self,
        vendor_id: VendorId,
        payment: VendorPayment,
        kind: VendorTransactionKind,
    ) -> Result<PaymentOutcome, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = async {
            let mut vendor = lock_vendor(uow.as_mut(), vendor_id).await?;
            if kind == VendorTransactionKind::Payment && payment.amount > vendor.outstanding_due() {
                return Err(LedgerError::InsufficientDue {
                    due: vendor.outstanding_due(),
                    requested: payment.amount,
                });
            }

            for allocation in &payment.allocations {
                let mut purchase = uow
                    .lock_vendor_transaction(allocation.purchase_id)
                    .await?
                    .filter(|row| row.vendor_id == vendor_id)
                    .ok_or_else(|| LedgerError::PurchaseNotFound(allocation.purchase_id.to_string()))?;
                purchase.settle(allocation.amount)?;
                uow.save_vendor_transaction(&purchase).await?;
            }

            let payment_id = VendorTransactionId::new_v7();
            vendor.decrement(payment.amount, &payment_id.to_string())?;
            uow.save_vendor(&vendor).await?;

            let date = business_date(&self.config, payment.date);
            let expense = match payment.pay_from {
                Some(domain) => Some(
                    self.post_vendor_expense(
                        uow.as_mut(),
                        domain,
                        payment.amount,
                        format!("{} to {}: {}", type_label(kind.as_str()), vendor.name, payment.description),
                        "vendor_payment",
                        payment_id,
                        date,
                        payment.created_by.clone(),
                    )
                    .await?,
                ),
                None => None,
            };

            let row = VendorTransaction {
                id: payment_id,
                vendor_id,
                kind,
                amount: payment.amount,
                outstanding: Decimal::ZERO,
                description: payment.description,
                date,
                reference_no: payment.reference_no,
                allocations: payment.allocations,
                ledger_transaction_id: expense.as_ref().map(|e| e.id),
                created_by: payment.created_by,
                created_at: Utc::now(),
                posting_seq: uow.next_posting_seq().await?,
            };
            uow.insert_vendor_transaction(&row).await?;
            Ok(PaymentOutcome {
                vendor,
                payment: row,
                expense,
            })
        }
        .await;
        let outcome = finish(uow, result).await?;
        info!(
            payment_id = %outcome.payment.id,
            kind = kind.as_str(),
            due = %outcome.vendor.net_due(),
            "recorded vendor payment"
        );
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    async fn post_vendor_expense(
        &self,
        uow: &mut dyn LedgerUnitOfWork,
        domain: Domain,
        amount: Decimal,
        description: String,
        reference_type: &str,
        reference_id: VendorTransactionId,
        date: NaiveDate,
        created_by: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        let mut expense = NewPosting::new(amount, VENDOR_PAYMENT_CATEGORY, description)
            .with_reference(reference_type, reference_id.to_string())
            .dated(date);
        expense.created_by = created_by;
        posting::post_transaction(uow, &self.config, domain, TransactionType::Expense, expense).await
    }

    /// Outstanding purchases of a vendor grouped by age on `as_of`
    pub async fn aging_report(&self, vendor_id: VendorId, as_of: NaiveDate) -> Result<AgingReport, LedgerError> {
        self.vendor(vendor_id).await?;
        let rows = self.store.vendor_transactions(vendor_id).await?;
        AgingReport::build(vendor_id, as_of, &rows)
    }

    pub async fn vendor(&self, vendor_id: VendorId) -> Result<Vendor, LedgerError> {
        self.store
            .vendor(vendor_id)
            .await?
            .ok_or_else(|| LedgerError::VendorNotFound(vendor_id.to_string()))
    }

    pub async fn vendor_transactions(&self, vendor_id: VendorId) -> Result<Vec<VendorTransaction>, LedgerError> {
        self.vendor(vendor_id).await?;
        Ok(self.store.vendor_transactions(vendor_id).await?)
    }
}

async fn lock_vendor(uow: &mut dyn LedgerUnitOfWork, vendor_id: VendorId) -> Result<Vendor, LedgerError> {
    uow.lock_vendor(vendor_id)
        .await?
        .ok_or_else(|| LedgerError::VendorNotFound(vendor_id.to_string()))
}
