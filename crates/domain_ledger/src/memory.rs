//! In-memory storage adapter
//!
//! Units of work are serialised by one writer lock held from `begin` until
//! commit or drop. A unit reads the committed state through a shared guard
//! and keeps its own copy of only the rows it locks or writes; `commit`
//! folds those rows in, dropping the unit discards them. Readers never wait
//! for writers: they see the last committed state.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, OwnedRwLockReadGuard, RwLock};
use tracing::debug;

use core_kernel::{
    DomainPort, HealthCheckResult, HealthCheckable, PortError, TransactionId, VendorId, VendorTransactionId,
    VoucherId,
};

use crate::account::{Account, Domain};
use crate::fund::FundTransaction;
use crate::history::LedgerHistory;
use crate::ports::{LedgerStore, LedgerUnitOfWork, VoucherSerials};
use crate::transaction::Transaction;
use crate::vendor::{Vendor, VendorTransaction};
use crate::voucher::{parse_voucher_no, MergeKey, Voucher};

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<Domain, Account>,
    transactions: HashMap<TransactionId, Transaction>,
    fund_transactions: Vec<FundTransaction>,
    vouchers: HashMap<VoucherId, Voucher>,
    voucher_keys: HashMap<MergeKey, VoucherId>,
    /// First voucher that linked each transaction
    voucher_links: HashMap<TransactionId, VoucherId>,
    max_voucher_seq: u64,
    vendors: HashMap<VendorId, Vendor>,
    vendor_transactions: HashMap<VendorTransactionId, VendorTransaction>,
    posting_seq: i64,
}

impl LedgerState {
    fn put_voucher(&mut self, voucher: Voucher) {
        self.voucher_keys.insert(voucher.key(), voucher.id);
        for linked in voucher.source_reference_id.iter().chain(voucher.linked_transactions.iter()) {
            self.voucher_links.entry(*linked).or_insert(voucher.id);
        }
        if let Some(seq) = parse_voucher_no(&voucher.voucher_no) {
            self.max_voucher_seq = self.max_voucher_seq.max(seq);
        }
        self.vouchers.insert(voucher.id, voucher);
    }
}

/// Rows a unit of work has locked or written
#[derive(Debug, Default)]
struct Staged {
    accounts: HashMap<Domain, Account>,
    transactions: HashMap<TransactionId, Transaction>,
    fund_transactions: Vec<FundTransaction>,
    vouchers: HashMap<VoucherId, Voucher>,
    vendors: HashMap<VendorId, Vendor>,
    vendor_transactions: HashMap<VendorTransactionId, VendorTransaction>,
    posting_seq: i64,
}

/// Process-local ledger store for tests and local runs
///
/// All state lives in this process and is lost on restart.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    writer: Arc<Mutex<()>>,
    committed: Arc<RwLock<LedgerState>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next commit fail with a connection error, for exercising
    /// rollback paths
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

impl DomainPort for InMemoryLedgerStore {}

#[async_trait]
impl HealthCheckable for InMemoryLedgerStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("in-memory-ledger", 0)
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, PortError> {
        let guard = self.writer.clone().lock_owned().await;
        let base = self.committed.clone().read_owned().await;
        let staged = Staged {
            posting_seq: base.posting_seq,
            ..Staged::default()
        };
        Ok(Box::new(InMemoryUnitOfWork {
            _guard: guard,
            committed: self.committed.clone(),
            fail_commit: self.fail_next_commit.clone(),
            base,
            staged,
        }))
    }

    async fn account(&self, domain: Domain) -> Result<Option<Account>, PortError> {
        Ok(self.committed.read().await.accounts.get(&domain).cloned())
    }

    async fn accounts(&self) -> Result<Vec<Account>, PortError> {
        let state = self.committed.read().await;
        let mut accounts: Vec<Account> = state.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| a.domain());
        Ok(accounts)
    }

    async fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>, PortError> {
        Ok(self.committed.read().await.transactions.get(&id).cloned())
    }

    async fn voucher(&self, id: VoucherId) -> Result<Option<Voucher>, PortError> {
        Ok(self.committed.read().await.vouchers.get(&id).cloned())
    }

    async fn history(&self, domain: Domain, until: Option<NaiveDate>) -> Result<LedgerHistory, PortError> {
        let state = self.committed.read().await;
        let within = |date: NaiveDate| until.map_or(true, |limit| date <= limit);
        let history = LedgerHistory {
            transactions: state
                .transactions
                .values()
                .filter(|t| t.domain == domain && within(t.transaction_date))
                .cloned()
                .collect(),
            fund_transactions: state
                .fund_transactions
                .iter()
                .filter(|f| f.domain == domain && within(f.date))
                .cloned()
                .collect(),
            vouchers: if domain.is_main() {
                state.vouchers.values().filter(|v| within(v.date)).cloned().collect()
            } else {
                Vec::new()
            },
        };
        Ok(history)
    }

    async fn vendor(&self, id: VendorId) -> Result<Option<Vendor>, PortError> {
        Ok(self.committed.read().await.vendors.get(&id).cloned())
    }

    async fn vendor_transactions(&self, id: VendorId) -> Result<Vec<VendorTransaction>, PortError> {
        let state = self.committed.read().await;
        let mut rows: Vec<VendorTransaction> = state
            .vendor_transactions
            .values()
            .filter(|row| row.vendor_id == id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.date.cmp(&b.date).then(a.posting_seq.cmp(&b.posting_seq)));
        Ok(rows)
    }
}

pub struct InMemoryUnitOfWork {
    _guard: OwnedMutexGuard<()>,
    committed: Arc<RwLock<LedgerState>>,
    fail_commit: Arc<AtomicBool>,
    base: OwnedRwLockReadGuard<LedgerState>,
    staged: Staged,
}

impl InMemoryUnitOfWork {
    fn missing(entity: &str, id: impl std::fmt::Display) -> PortError {
        PortError::not_found(entity, id)
    }

    /// Staged copy of a voucher, falling back to the committed row
    fn voucher_view(&self, id: VoucherId) -> Option<&Voucher> {
        self.staged.vouchers.get(&id).or_else(|| self.base.vouchers.get(&id))
    }

    fn voucher_by_key(&self, key: &MergeKey) -> Option<&Voucher> {
        self.staged
            .vouchers
            .values()
            .find(|v| &v.key() == key)
            .or_else(|| self.base.voucher_keys.get(key).and_then(|id| self.voucher_view(*id)))
    }
}

#[async_trait]
impl LedgerUnitOfWork for InMemoryUnitOfWork {
    async fn lock_account(&mut self, domain: Domain, opening_base: Decimal) -> Result<Account, PortError> {
        if let Some(account) = self.staged.accounts.get(&domain) {
            return Ok(account.clone());
        }
        let account = match self.base.accounts.get(&domain) {
            Some(account) => account.clone(),
            None => {
                debug!(%domain, %opening_base, "creating account");
                Account::open(domain, opening_base)
            }
        };
        self.staged.accounts.insert(domain, account.clone());
        Ok(account)
    }

    async fn save_account(&mut self, account: &Account) -> Result<(), PortError> {
        match self.staged.accounts.get_mut(&account.domain()) {
            Some(slot) => {
                *slot = account.clone();
                Ok(())
            }
            None => Err(Self::missing("Account", account.domain())),
        }
    }

    async fn next_posting_seq(&mut self) -> Result<i64, PortError> {
        self.staged.posting_seq += 1;
        Ok(self.staged.posting_seq)
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), PortError> {
        if self.staged.transactions.contains_key(&transaction.id) || self.base.transactions.contains_key(&transaction.id)
        {
            return Err(PortError::conflict(format!("transaction {} already exists", transaction.id)));
        }
        self.staged.transactions.insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn lock_transaction(&mut self, id: TransactionId) -> Result<Option<Transaction>, PortError> {
        Ok(self
            .staged
            .transactions
            .get(&id)
            .or_else(|| self.base.transactions.get(&id))
            .cloned())
    }

    async fn save_transaction(&mut self, transaction: &Transaction) -> Result<(), PortError> {
        if !self.staged.transactions.contains_key(&transaction.id) && !self.base.transactions.contains_key(&transaction.id)
        {
            return Err(Self::missing("Transaction", transaction.id));
        }
        self.staged.transactions.insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn insert_fund_transaction(&mut self, fund: &FundTransaction) -> Result<(), PortError> {
        self.staged.fund_transactions.push(fund.clone());
        Ok(())
    }

    async fn lock_voucher_by_key(&mut self, key: &MergeKey) -> Result<Option<Voucher>, PortError> {
        Ok(self.voucher_by_key(key).cloned())
    }

    async fn lock_voucher_for_transaction(&mut self, id: TransactionId) -> Result<Option<Voucher>, PortError> {
        let committed = self.base.voucher_links.get(&id).and_then(|vid| self.voucher_view(*vid));
        Ok(self
            .staged
            .vouchers
            .values()
            .filter(|v| v.source_reference_id == Some(id) || v.links(id))
            .chain(committed)
            .min_by_key(|v| v.posting_seq)
            .cloned())
    }

    async fn next_voucher_serials(&mut self) -> Result<VoucherSerials, PortError> {
        let created = self
            .staged
            .vouchers
            .keys()
            .filter(|id| !self.base.vouchers.contains_key(id))
            .count();
        let max_seq = self
            .staged
            .vouchers
            .values()
            .filter_map(|v| parse_voucher_no(&v.voucher_no))
            .fold(self.base.max_voucher_seq, u64::max);
        Ok(VoucherSerials {
            sl_no: (self.base.vouchers.len() + created) as i64 + 1,
            voucher_seq: max_seq + 1,
        })
    }

    async fn insert_voucher(&mut self, voucher: &Voucher) -> Result<(), PortError> {
        if self.voucher_by_key(&voucher.key()).is_some() {
            return Err(PortError::conflict(format!(
                "voucher for {} already exists",
                voucher.key().lock_name()
            )));
        }
        self.staged.vouchers.insert(voucher.id, voucher.clone());
        Ok(())
    }

    async fn save_voucher(&mut self, voucher: &Voucher) -> Result<(), PortError> {
        if self.voucher_view(voucher.id).is_none() {
            return Err(Self::missing("Voucher", voucher.id));
        }
        self.staged.vouchers.insert(voucher.id, voucher.clone());
        Ok(())
    }

    async fn insert_vendor(&mut self, vendor: &Vendor) -> Result<(), PortError> {
        self.staged.vendors.insert(vendor.id, vendor.clone());
        Ok(())
    }

    async fn lock_vendor(&mut self, id: VendorId) -> Result<Option<Vendor>, PortError> {
        Ok(self.staged.vendors.get(&id).or_else(|| self.base.vendors.get(&id)).cloned())
    }

    async fn save_vendor(&mut self, vendor: &Vendor) -> Result<(), PortError> {
        if !self.staged.vendors.contains_key(&vendor.id) && !self.base.vendors.contains_key(&vendor.id) {
            return Err(Self::missing("Vendor", vendor.id));
        }
        self.staged.vendors.insert(vendor.id, vendor.clone());
        Ok(())
    }

    async fn insert_vendor_transaction(&mut self, row: &VendorTransaction) -> Result<(), PortError> {
        self.staged.vendor_transactions.insert(row.id, row.clone());
        Ok(())
    }

    async fn lock_vendor_transaction(
        &mut self,
        id: VendorTransactionId,
    ) -> Result<Option<VendorTransaction>, PortError> {
        Ok(self
            .staged
            .vendor_transactions
            .get(&id)
            .or_else(|| self.base.vendor_transactions.get(&id))
            .cloned())
    }

    async fn save_vendor_transaction(&mut self, row: &VendorTransaction) -> Result<(), PortError> {
        if !self.staged.vendor_transactions.contains_key(&row.id) && !self.base.vendor_transactions.contains_key(&row.id)
        {
            return Err(Self::missing("VendorTransaction", row.id));
        }
        self.staged.vendor_transactions.insert(row.id, row.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        if self.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(PortError::connection("commit failed"));
        }
        let InMemoryUnitOfWork {
            _guard,
            committed,
            base,
            staged,
            ..
        } = *self;
        // the writer lock stays held, so nothing commits in between
        drop(base);
        let mut state = committed.write().await;
        state.accounts.extend(staged.accounts);
        state.transactions.extend(staged.transactions);
        state.fund_transactions.extend(staged.fund_transactions);
        for voucher in staged.vouchers.into_values() {
            state.put_voucher(voucher);
        }
        state.vendors.extend(staged.vendors);
        state.vendor_transactions.extend(staged.vendor_transactions);
        state.posting_seq = staged.posting_seq;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), PortError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_uncommitted_unit_is_discarded() {
        let store = InMemoryLedgerStore::new();
        {
            let mut uow = store.begin().await.unwrap();
            uow.lock_account(Domain::Hospital, dec!(10)).await.unwrap();
        }
        assert!(store.account(Domain::Hospital).await.unwrap().is_none());

        let mut uow = store.begin().await.unwrap();
        uow.lock_account(Domain::Hospital, dec!(10)).await.unwrap();
        uow.commit().await.unwrap();
        assert_eq!(store.account(Domain::Hospital).await.unwrap().unwrap().balance(), dec!(10));
    }

    #[tokio::test]
    async fn test_failed_commit_publishes_nothing() {
        let store = InMemoryLedgerStore::new();
        store.fail_next_commit();
        let mut uow = store.begin().await.unwrap();
        uow.lock_account(Domain::Optics, dec!(1)).await.unwrap();
        assert!(uow.commit().await.is_err());
        assert!(store.accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_voucher_serials_follow_max_number() {
        let store = InMemoryLedgerStore::new();
        let mut uow = store.begin().await.unwrap();
        let serials = uow.next_voucher_serials().await.unwrap();
        assert_eq!(serials, VoucherSerials { sl_no: 1, voucher_seq: 1 });
    }

    fn voucher(day: u32, voucher_seq: u64, source: TransactionId) -> Voucher {
        crate::voucher::VoucherPosting::new(
            NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            dec!(10),
            crate::voucher::VoucherType::Credit,
            Domain::Hospital,
            "income",
            "daily",
        )
        .with_source("HSP-000001", source)
        .into_voucher(VoucherId::new(), voucher_seq as i64, voucher_seq, voucher_seq as i64)
    }

    #[tokio::test]
    async fn test_unit_sees_committed_rows_and_its_own_writes() {
        let store = InMemoryLedgerStore::new();
        let first_source = TransactionId::new();
        let first = voucher(1, 1, first_source);
        let mut uow = store.begin().await.unwrap();
        uow.insert_voucher(&first).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        assert_eq!(uow.lock_voucher_by_key(&first.key()).await.unwrap().unwrap().id, first.id);
        assert_eq!(uow.lock_voucher_for_transaction(first_source).await.unwrap().unwrap().id, first.id);
        assert!(uow.insert_voucher(&voucher(1, 9, TransactionId::new())).await.is_err());

        let second = voucher(2, 2, TransactionId::new());
        uow.insert_voucher(&second).await.unwrap();
        assert_eq!(uow.next_voucher_serials().await.unwrap(), VoucherSerials { sl_no: 3, voucher_seq: 3 });
        drop(uow);

        // dropped unit left the committed voucher alone
        let mut uow = store.begin().await.unwrap();
        assert!(uow.lock_voucher_by_key(&second.key()).await.unwrap().is_none());
        assert_eq!(uow.next_voucher_serials().await.unwrap(), VoucherSerials { sl_no: 2, voucher_seq: 2 });
    }
}
