//! PostgreSQL Ledger Adapter
//!
//! Implements [`LedgerStore`] on top of the tables in
//! `repositories::ledger`.
//!
//! # Isolation
//!
//! A unit of work is one database transaction at READ COMMITTED:
//!
//! - accounts, transactions, vendor rows: `SELECT ... FOR UPDATE`
//! - voucher merge keys: a transaction-scoped advisory lock on
//!   [`MergeKey::lock_name`] taken before the lookup, so two postings that
//!   both find no voucher cannot both create one; the unique index on the
//!   key backs this up
//! - voucher numbering: one advisory lock around the serial read
//!
//! Reads outside a unit of work run in a REPEATABLE READ, READ ONLY
//! transaction so a history is one consistent snapshot.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, Transaction as DbTransaction};
use std::time::Instant;
use tracing::{debug, instrument};

use core_kernel::{
    DomainPort, HealthCheckResult, HealthCheckable, PortError, TransactionId, VendorId, VendorTransactionId,
    VoucherId,
};
use domain_ledger::{
    Account, Domain, FundTransaction, LedgerHistory, LedgerStore, LedgerUnitOfWork, MergeKey, Transaction, Vendor,
    VendorTransaction, Voucher, VoucherSerials,
};

use crate::error::{port_error, DatabaseError};
use crate::repositories::ledger as repo;

const ADAPTER_ID: &str = "postgres-ledger-adapter";
const VOUCHER_SERIAL_LOCK: &str = "main_vouchers:serials";

/// PostgreSQL-backed implementation of the ledger storage port
#[derive(Debug, Clone)]
pub struct PostgresLedgerAdapter {
    pool: PgPool,
}

impl PostgresLedgerAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn snapshot(&self) -> Result<DbTransaction<'static, Postgres>, PortError> {
        let mut tx = self.pool.begin().await.map_err(port_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(port_error)?;
        Ok(tx)
    }
}

impl DomainPort for PostgresLedgerAdapter {}

#[async_trait]
impl HealthCheckable for PostgresLedgerAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool).await;
        match result {
            Ok(_) => HealthCheckResult::healthy(ADAPTER_ID, start.elapsed().as_millis() as u64),
            Err(e) => HealthCheckResult::unhealthy(ADAPTER_ID, format!("Database error: {}", e)),
        }
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerAdapter {
    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, PortError> {
        let tx = self.pool.begin().await.map_err(port_error)?;
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }

    async fn account(&self, domain: Domain) -> Result<Option<Account>, PortError> {
        let mut conn = self.pool.acquire().await.map_err(port_error)?;
        Ok(repo::fetch_account(&mut conn, domain).await?)
    }

    async fn accounts(&self) -> Result<Vec<Account>, PortError> {
        let mut conn = self.pool.acquire().await.map_err(port_error)?;
        Ok(repo::fetch_accounts(&mut conn).await?)
    }

    async fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>, PortError> {
        let mut conn = self.pool.acquire().await.map_err(port_error)?;
        Ok(repo::fetch_transaction(&mut conn, id, false).await?)
    }

    async fn voucher(&self, id: VoucherId) -> Result<Option<Voucher>, PortError> {
        let mut tx = self.snapshot().await?;
        let voucher = repo::fetch_voucher(&mut tx, id).await?;
        tx.commit().await.map_err(port_error)?;
        Ok(voucher)
    }

    #[instrument(skip(self), fields(domain = %domain))]
    async fn history(&self, domain: Domain, until: Option<NaiveDate>) -> Result<LedgerHistory, PortError> {
        let mut tx = self.snapshot().await?;
        let transactions = repo::fetch_transactions(&mut tx, domain, until).await?;
        let fund_transactions = repo::fetch_fund_transactions(&mut tx, domain, until).await?;
        let vouchers = if domain.is_main() {
            repo::fetch_vouchers(&mut tx, until).await?
        } else {
            Vec::new()
        };
        tx.commit().await.map_err(port_error)?;
        debug!(
            transactions = transactions.len(),
            funds = fund_transactions.len(),
            vouchers = vouchers.len(),
            "loaded history snapshot"
        );
        Ok(LedgerHistory {
            transactions,
            fund_transactions,
            vouchers,
        })
    }

    async fn vendor(&self, id: VendorId) -> Result<Option<Vendor>, PortError> {
        let mut conn = self.pool.acquire().await.map_err(port_error)?;
        Ok(repo::fetch_vendor(&mut conn, id, false).await?)
    }

    async fn vendor_transactions(&self, id: VendorId) -> Result<Vec<VendorTransaction>, PortError> {
        let mut tx = self.snapshot().await?;
        let rows = repo::fetch_vendor_transactions(&mut tx, id).await?;
        tx.commit().await.map_err(port_error)?;
        Ok(rows)
    }
}

/// One ledger unit of work on a dedicated database transaction
///
/// Dropping it without `commit` rolls the database transaction back.
pub struct PostgresUnitOfWork {
    tx: DbTransaction<'static, Postgres>,
}

impl PostgresUnitOfWork {
    fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }
}

#[async_trait]
impl LedgerUnitOfWork for PostgresUnitOfWork {
    async fn lock_account(&mut self, domain: Domain, opening_base: Decimal) -> Result<Account, PortError> {
        Ok(repo::lock_account(self.conn(), domain, opening_base).await?)
    }

    async fn save_account(&mut self, account: &Account) -> Result<(), PortError> {
        Ok(repo::update_account(self.conn(), account).await?)
    }

    async fn next_posting_seq(&mut self) -> Result<i64, PortError> {
        Ok(repo::next_posting_seq(self.conn()).await?)
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), PortError> {
        Ok(repo::insert_transaction(self.conn(), transaction).await?)
    }

    async fn lock_transaction(&mut self, id: TransactionId) -> Result<Option<Transaction>, PortError> {
        Ok(repo::fetch_transaction(self.conn(), id, true).await?)
    }

    async fn save_transaction(&mut self, transaction: &Transaction) -> Result<(), PortError> {
        Ok(repo::update_transaction(self.conn(), transaction).await?)
    }

    async fn insert_fund_transaction(&mut self, fund: &FundTransaction) -> Result<(), PortError> {
        Ok(repo::insert_fund_transaction(self.conn(), fund).await?)
    }

    async fn lock_voucher_by_key(&mut self, key: &MergeKey) -> Result<Option<Voucher>, PortError> {
        let name = key.lock_name();
        repo::advisory_lock(self.conn(), &name).await?;
        debug!(lock = %name, "holding merge key");
        Ok(repo::lock_voucher_by_key(self.conn(), key).await?)
    }

    async fn lock_voucher_for_transaction(&mut self, id: TransactionId) -> Result<Option<Voucher>, PortError> {
        Ok(repo::lock_voucher_for_transaction(self.conn(), id).await?)
    }

    async fn next_voucher_serials(&mut self) -> Result<VoucherSerials, PortError> {
        repo::advisory_lock(self.conn(), VOUCHER_SERIAL_LOCK).await?;
        let (max_sl_no, max_voucher_no) = repo::voucher_serials(self.conn()).await?;
        let voucher_seq = u64::try_from(max_voucher_no + 1)
            .map_err(|_| DatabaseError::corrupt(format!("voucher number {}", max_voucher_no)))?;
        Ok(VoucherSerials {
            sl_no: max_sl_no + 1,
            voucher_seq,
        })
    }

    async fn insert_voucher(&mut self, voucher: &Voucher) -> Result<(), PortError> {
        Ok(repo::insert_voucher(self.conn(), voucher).await?)
    }

    async fn save_voucher(&mut self, voucher: &Voucher) -> Result<(), PortError> {
        Ok(repo::update_voucher(self.conn(), voucher).await?)
    }

    async fn insert_vendor(&mut self, vendor: &Vendor) -> Result<(), PortError> {
        Ok(repo::insert_vendor(self.conn(), vendor).await?)
    }

    async fn lock_vendor(&mut self, id: VendorId) -> Result<Option<Vendor>, PortError> {
        Ok(repo::fetch_vendor(self.conn(), id, true).await?)
    }

    async fn save_vendor(&mut self, vendor: &Vendor) -> Result<(), PortError> {
        Ok(repo::update_vendor(self.conn(), vendor).await?)
    }

    async fn insert_vendor_transaction(&mut self, row: &VendorTransaction) -> Result<(), PortError> {
        Ok(repo::insert_vendor_transaction(self.conn(), row).await?)
    }

    async fn lock_vendor_transaction(
        &mut self,
        id: VendorTransactionId,
    ) -> Result<Option<VendorTransaction>, PortError> {
        Ok(repo::fetch_vendor_transaction(self.conn(), id, true).await?)
    }

    async fn save_vendor_transaction(&mut self, row: &VendorTransaction) -> Result<(), PortError> {
        Ok(repo::update_vendor_transaction(self.conn(), row).await?)
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        let unit = *self;
        unit.tx.commit().await.map_err(port_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), PortError> {
        let unit = *self;
        unit.tx.rollback().await.map_err(port_error)
    }
}
