//! Storage port of the ledger
//!
//! Every mutation happens inside a [`LedgerUnitOfWork`]. Methods named
//! `lock_*` take the row (or key) lock the adapter provides and hold it until
//! the unit commits or is dropped; `save_*` write back a row previously
//! locked in the same unit. Dropping a unit without calling `commit`
//! discards all of its writes.
//!
//! Lock order used by the posting service, which adapters may rely on:
//! domain account, then voucher (by key or by linked transaction), then the
//! Main account. Vendor rows are locked before any account.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use core_kernel::{DomainPort, PortError, TransactionId, VendorId, VendorTransactionId, VoucherId};

use crate::account::{Account, Domain};
use crate::fund::FundTransaction;
use crate::history::LedgerHistory;
use crate::transaction::Transaction;
use crate::vendor::{Vendor, VendorTransaction};
use crate::voucher::{MergeKey, Voucher};

/// Serial numbers allocated to a new voucher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoucherSerials {
    pub sl_no: i64,
    pub voucher_seq: u64,
}

/// Read side plus the entry point for units of work
#[async_trait]
pub trait LedgerStore: DomainPort {
    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, PortError>;

    async fn account(&self, domain: Domain) -> Result<Option<Account>, PortError>;

    async fn accounts(&self) -> Result<Vec<Account>, PortError>;

    async fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>, PortError>;

    async fn voucher(&self, id: VoucherId) -> Result<Option<Voucher>, PortError>;

    /// Everything of `domain` dated on or before `until` (all of it when `None`)
    async fn history(&self, domain: Domain, until: Option<NaiveDate>) -> Result<LedgerHistory, PortError>;

    async fn vendor(&self, id: VendorId) -> Result<Option<Vendor>, PortError>;

    /// Vendor rows ordered by date, then posting order
    async fn vendor_transactions(&self, id: VendorId) -> Result<Vec<VendorTransaction>, PortError>;
}

/// One atomic, isolated set of ledger writes
#[async_trait]
pub trait LedgerUnitOfWork: Send {
    /// Get-or-create the account and lock it for the rest of the unit
    async fn lock_account(&mut self, domain: Domain, opening_base: Decimal) -> Result<Account, PortError>;

    async fn save_account(&mut self, account: &Account) -> Result<(), PortError>;

    /// Global insertion order shared by every posted row
    async fn next_posting_seq(&mut self) -> Result<i64, PortError>;

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), PortError>;

    async fn lock_transaction(&mut self, id: TransactionId) -> Result<Option<Transaction>, PortError>;

    async fn save_transaction(&mut self, transaction: &Transaction) -> Result<(), PortError>;

    async fn insert_fund_transaction(&mut self, fund: &FundTransaction) -> Result<(), PortError>;

    /// Locks the merge key itself, so the "not found" answer stays valid
    /// until the unit ends
    async fn lock_voucher_by_key(&mut self, key: &MergeKey) -> Result<Option<Voucher>, PortError>;

    /// The voucher whose source reference or links contain `id`
    async fn lock_voucher_for_transaction(&mut self, id: TransactionId) -> Result<Option<Voucher>, PortError>;

    async fn next_voucher_serials(&mut self) -> Result<VoucherSerials, PortError>;

    async fn insert_voucher(&mut self, voucher: &Voucher) -> Result<(), PortError>;

    async fn save_voucher(&mut self, voucher: &Voucher) -> Result<(), PortError>;

    async fn insert_vendor(&mut self, vendor: &Vendor) -> Result<(), PortError>;

    async fn lock_vendor(&mut self, id: VendorId) -> Result<Option<Vendor>, PortError>;

    async fn save_vendor(&mut self, vendor: &Vendor) -> Result<(), PortError>;

    async fn insert_vendor_transaction(&mut self, row: &VendorTransaction) -> Result<(), PortError>;

    async fn lock_vendor_transaction(
        &mut self,
        id: VendorTransactionId,
    ) -> Result<Option<VendorTransaction>, PortError>;

    async fn save_vendor_transaction(&mut self, row: &VendorTransaction) -> Result<(), PortError>;

    async fn commit(self: Box<Self>) -> Result<(), PortError>;

    async fn rollback(self: Box<Self>) -> Result<(), PortError>;
}
