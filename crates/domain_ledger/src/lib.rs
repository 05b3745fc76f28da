//! Ledger Domain - Multi-ledger accounting for the clinic
//!
//! Each business area (Hospital, Medicine, Optics, Operation) keeps its own
//! account and transaction history. The Main account consolidates them
//! through vouchers: same-day, same-source, same-direction postings merge
//! into one Main row.
//!
//! # Consistency
//!
//! For every domain, at all times:
//!
//! ```text
//! balance == opening base + Σ transactions + Σ fund movements (+ Σ vouchers for Main)
//! ```
//!
//! Balances only move through [`PostingService`] and [`VendorLedger`], one
//! storage unit of work per operation. [`StatementBuilder`] and
//! [`Reconciler`] replay history without looking at the live balance.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{Domain, LedgerConfig, LedgerEngine, InMemoryLedgerStore, NewPosting};
//!
//! let engine = LedgerEngine::new(Arc::new(InMemoryLedgerStore::new()), LedgerConfig::default())?;
//! let (tx, voucher) = engine
//!     .postings
//!     .post_income_with_voucher(Domain::Hospital, NewPosting::new(dec!(500), "Medical Test", "Group G1"), "medical_test")
//!     .await?;
//! ```

pub mod account;
pub mod balance;
pub mod category;
pub mod config;
pub mod error;
pub mod fund;
pub mod history;
pub mod memory;
pub mod payables;
pub mod ports;
mod posting;
pub mod reconciliation;
pub mod service;
pub mod statement;
pub mod transaction;
pub mod vendor;
pub mod voucher;

use std::sync::Arc;

pub use account::{Account, Domain};
pub use balance::BalanceMovement;
pub use category::{CategoryBucket, CategoryTaxonomy, Side};
pub use config::LedgerConfig;
pub use error::LedgerError;
pub use fund::{FundMovement, FundTransaction, FundType};
pub use history::{EntryKind, LedgerEntry, LedgerHistory};
pub use memory::InMemoryLedgerStore;
pub use payables::{PaymentOutcome, PurchaseOutcome, VendorLedger, VENDOR_PAYMENT_CATEGORY};
pub use ports::{LedgerStore, LedgerUnitOfWork, VoucherSerials};
pub use reconciliation::{ReconciliationReport, Reconciler};
pub use service::{PostingService, Reversal, REVERSAL_SOURCE_TYPE};
pub use statement::{
    AccountStatement, AccountStatementRow, BucketAmount, BucketTotals, DailyRow, DailyStatement, PeriodSummary,
    StatementBuilder,
};
pub use transaction::{NewPosting, Transaction, TransactionType, TransactionUpdate, REVERSAL_REFERENCE};
pub use vendor::{
    Allocation, AgingReport, BalanceType, Purchase, Vendor, VendorPayment, VendorTransaction, VendorTransactionKind,
};
pub use voucher::{format_voucher_no, type_label, MergeKey, Voucher, VoucherPosting, VoucherType};

/// The ledger services wired to one store and one configuration
#[derive(Clone)]
pub struct LedgerEngine {
    pub postings: PostingService,
    pub statements: StatementBuilder,
    pub vendors: VendorLedger,
    pub reconciler: Reconciler,
    store: Arc<dyn LedgerStore>,
}

impl LedgerEngine {
    /// # Errors
    ///
    /// Returns `Validation` when the category taxonomy is inconsistent.
    pub fn new(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        let config = Arc::new(config);
        Ok(Self {
            postings: PostingService::new(store.clone(), config.clone()),
            statements: StatementBuilder::new(store.clone(), config.clone()),
            vendors: VendorLedger::new(store.clone(), config.clone()),
            reconciler: Reconciler::new(store.clone(), config),
            store,
        })
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        self.postings.config()
    }
}
