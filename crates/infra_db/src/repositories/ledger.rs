//! Ledger tables
//!
//! Row types mirror `migrations/20240101_000001_ledger_schema.sql`. Enums are
//! stored as TEXT and decoded through the domain `FromStr` impls, so a value
//! the domain does not know surfaces as [`DatabaseError::CorruptRow`].
//!
//! Every function takes a plain connection; the adapter decides whether that
//! connection belongs to a unit of work or to a read snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

use core_kernel::{FundTransactionId, TransactionId, VendorId, VendorTransactionId, VoucherId};
use domain_ledger::{
    Account, Allocation, Domain, FundTransaction, MergeKey, Transaction, Vendor, VendorTransaction, Voucher,
};

use crate::error::DatabaseError;

macro_rules! account_select {
    () => {
        "SELECT domain, balance, transaction_seq, fund_voucher_seq, updated_at FROM ledger_accounts"
    };
}

macro_rules! transaction_select {
    () => {
        "SELECT id, domain, transaction_type, category, category_id, amount, description, reference_type, \
         reference_id, transaction_date, transaction_no, created_by, created_at, updated_at, posting_seq, \
         reversed_by FROM ledger_transactions"
    };
}

macro_rules! fund_select {
    () => {
        "SELECT id, domain, fund_type, amount, purpose, voucher_no, date, added_by, created_at, posting_seq \
         FROM fund_transactions"
    };
}

macro_rules! voucher_select {
    () => {
        "SELECT id, sl_no, voucher_no, voucher_type, date, narration, amount, source_account, \
         source_transaction_type, source_voucher_no, source_reference_id, created_by, created_at, updated_at, \
         posting_seq FROM main_vouchers"
    };
}

macro_rules! vendor_select {
    () => {
        "SELECT id, name, net_due, credit_limit, created_at, updated_at FROM vendors"
    };
}

macro_rules! vendor_transaction_select {
    () => {
        "SELECT id, vendor_id, kind, amount, outstanding, description, date, reference_no, ledger_transaction_id, \
         created_by, created_at, posting_seq FROM vendor_transactions"
    };
}

fn decode<T>(column: &str, value: &str) -> Result<T, DatabaseError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| DatabaseError::corrupt(format!("{} = '{}': {}", column, value, e)))
}

fn counter(column: &str, value: i64) -> Result<u64, DatabaseError> {
    u64::try_from(value).map_err(|_| DatabaseError::corrupt(format!("{} = {}", column, value)))
}

fn signed_counter(value: u64) -> Result<i64, DatabaseError> {
    i64::try_from(value).map_err(|_| DatabaseError::corrupt(format!("counter {} out of range", value)))
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub domain: String,
    pub balance: Decimal,
    pub transaction_seq: i64,
    pub fund_voucher_seq: i64,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = DatabaseError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account::restore(
            decode("ledger_accounts.domain", &row.domain)?,
            row.balance,
            counter("transaction_seq", row.transaction_seq)?,
            counter("fund_voucher_seq", row.fund_voucher_seq)?,
            row.updated_at,
        ))
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub id: Uuid,
    pub domain: String,
    pub transaction_type: String,
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
    pub reversed_by: Option<Uuid>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DatabaseError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            domain: decode("ledger_transactions.domain", &row.domain)?,
            transaction_type: decode("transaction_type", &row.transaction_type)?,
            category: row.category,
            category_id: row.category_id,
            amount: row.amount,
            description: row.description,
            reference_type: row.reference_type,
            reference_id: row.reference_id,
            transaction_date: row.transaction_date,
            transaction_no: row.transaction_no,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            posting_seq: row.posting_seq,
            reversed_by: row.reversed_by.map(TransactionId::from_uuid),
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct FundRow {
    pub id: Uuid,
    pub domain: String,
    pub fund_type: String,
    pub amount: Decimal,
    pub purpose: String,
    pub voucher_no: String,
    pub date: NaiveDate,
    pub added_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub posting_seq: i64,
}

impl TryFrom<FundRow> for FundTransaction {
    type Error = DatabaseError;

    fn try_from(row: FundRow) -> Result<Self, Self::Error> {
        Ok(FundTransaction {
            id: FundTransactionId::from_uuid(row.id),
            domain: decode("fund_transactions.domain", &row.domain)?,
            fund_type: decode("fund_type", &row.fund_type)?,
            amount: row.amount,
            purpose: row.purpose,
            voucher_no: row.voucher_no,
            date: row.date,
            added_by: row.added_by,
            created_at: row.created_at,
            posting_seq: row.posting_seq,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct VoucherRow {
    pub id: Uuid,
    pub sl_no: i64,
    pub voucher_no: String,
    pub voucher_type: String,
    pub date: NaiveDate,
    pub narration: String,
    pub amount: Decimal,
    pub source_account: String,
    pub source_transaction_type: String,
    pub source_voucher_no: Option<String>,
    pub source_reference_id: Option<Uuid>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub posting_seq: i64,
}

impl VoucherRow {
    fn into_voucher(self, links: Vec<Uuid>) -> Result<Voucher, DatabaseError> {
        Ok(Voucher {
            id: VoucherId::from_uuid(self.id),
            sl_no: self.sl_no,
            voucher_no: self.voucher_no,
            voucher_type: decode("voucher_type", &self.voucher_type)?,
            date: self.date,
            narration: self.narration,
            amount: self.amount,
            source_account: decode("source_account", &self.source_account)?,
            source_transaction_type: self.source_transaction_type,
            source_voucher_no: self.source_voucher_no,
            source_reference_id: self.source_reference_id.map(TransactionId::from_uuid),
            linked_transactions: links.into_iter().map(TransactionId::from_uuid).collect(),
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
            posting_seq: self.posting_seq,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct VendorRow {
    pub id: Uuid,
    pub name: String,
    pub net_due: Decimal,
    pub credit_limit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VendorRow> for Vendor {
    fn from(row: VendorRow) -> Self {
        Vendor::restore(
            VendorId::from_uuid(row.id),
            row.name,
            row.net_due,
            row.credit_limit,
            row.created_at,
            row.updated_at,
        )
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct VendorTransactionRow {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub kind: String,
    pub amount: Decimal,
    pub outstanding: Decimal,
    pub description: String,
    pub date: NaiveDate,
    pub reference_no: Option<String>,
    pub ledger_transaction_id: Option<Uuid>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub posting_seq: i64,
}

impl VendorTransactionRow {
    fn into_vendor_transaction(self, allocations: Vec<Allocation>) -> Result<VendorTransaction, DatabaseError> {
        Ok(VendorTransaction {
            id: VendorTransactionId::from_uuid(self.id),
            vendor_id: VendorId::from_uuid(self.vendor_id),
            kind: decode("vendor_transactions.kind", &self.kind)?,
            amount: self.amount,
            outstanding: self.outstanding,
            description: self.description,
            date: self.date,
            reference_no: self.reference_no,
            allocations,
            ledger_transaction_id: self.ledger_transaction_id.map(TransactionId::from_uuid),
            created_by: self.created_by,
            created_at: self.created_at,
            posting_seq: self.posting_seq,
        })
    }
}

// ============================================================================
// Accounts
// ============================================================================

pub async fn fetch_account(conn: &mut PgConnection, domain: Domain) -> Result<Option<Account>, DatabaseError> {
    sqlx::query_as::<_, AccountRow>(concat!(account_select!(), " WHERE domain = $1"))
        .bind(domain.as_str())
        .fetch_optional(&mut *conn)
        .await?
        .map(Account::try_from)
        .transpose()
}

pub async fn fetch_accounts(conn: &mut PgConnection) -> Result<Vec<Account>, DatabaseError> {
    sqlx::query_as::<_, AccountRow>(concat!(account_select!(), " ORDER BY domain"))
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(Account::try_from)
        .collect()
}

/// Get-or-create, then row lock until the surrounding transaction ends
pub async fn lock_account(
    conn: &mut PgConnection,
    domain: Domain,
    opening_base: Decimal,
) -> Result<Account, DatabaseError> {
    sqlx::query(
        "INSERT INTO ledger_accounts (domain, balance, transaction_seq, fund_voucher_seq, updated_at) \
         VALUES ($1, $2, 0, 0, now()) ON CONFLICT (domain) DO NOTHING",
    )
    .bind(domain.as_str())
    .bind(opening_base)
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query_as::<_, AccountRow>(concat!(account_select!(), " WHERE domain = $1 FOR UPDATE"))
        .bind(domain.as_str())
        .fetch_one(&mut *conn)
        .await?;
    Account::try_from(row)
}

pub async fn update_account(conn: &mut PgConnection, account: &Account) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        "UPDATE ledger_accounts SET balance = $2, transaction_seq = $3, fund_voucher_seq = $4, updated_at = $5 \
         WHERE domain = $1",
    )
    .bind(account.domain().as_str())
    .bind(account.balance())
    .bind(signed_counter(account.transaction_seq())?)
    .bind(signed_counter(account.fund_voucher_seq())?)
    .bind(account.updated_at())
    .execute(&mut *conn)
    .await?;
    expect_one(result.rows_affected(), "Account", account.domain())
}

pub async fn next_posting_seq(conn: &mut PgConnection) -> Result<i64, DatabaseError> {
    Ok(sqlx::query_scalar::<_, i64>("SELECT nextval('ledger_posting_seq')")
        .fetch_one(&mut *conn)
        .await?)
}

// ============================================================================
// Transactions and fund movements
// ============================================================================

pub async fn fetch_transaction(
    conn: &mut PgConnection,
    id: TransactionId,
    for_update: bool,
) -> Result<Option<Transaction>, DatabaseError> {
    let sql = if for_update {
        concat!(transaction_select!(), " WHERE id = $1 FOR UPDATE")
    } else {
        concat!(transaction_select!(), " WHERE id = $1")
    };
    sqlx::query_as::<_, TransactionRow>(sql)
        .bind(Uuid::from(id))
        .fetch_optional(&mut *conn)
        .await?
        .map(Transaction::try_from)
        .transpose()
}

pub async fn fetch_transactions(
    conn: &mut PgConnection,
    domain: Domain,
    until: Option<NaiveDate>,
) -> Result<Vec<Transaction>, DatabaseError> {
    sqlx::query_as::<_, TransactionRow>(concat!(
        transaction_select!(),
        " WHERE domain = $1 AND ($2::date IS NULL OR transaction_date <= $2) ORDER BY posting_seq"
    ))
    .bind(domain.as_str())
    .bind(until)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(Transaction::try_from)
    .collect()
}

pub async fn insert_transaction(conn: &mut PgConnection, tx: &Transaction) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO ledger_transactions (id, domain, transaction_type, category, category_id, amount, description, \
         reference_type, reference_id, transaction_date, transaction_no, created_by, created_at, updated_at, \
         posting_seq, reversed_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(Uuid::from(tx.id))
    .bind(tx.domain.as_str())
    .bind(tx.transaction_type.as_str())
    .bind(&tx.category)
    .bind(tx.category_id)
    .bind(tx.amount)
    .bind(&tx.description)
    .bind(&tx.reference_type)
    .bind(&tx.reference_id)
    .bind(tx.transaction_date)
    .bind(&tx.transaction_no)
    .bind(&tx.created_by)
    .bind(tx.created_at)
    .bind(tx.updated_at)
    .bind(tx.posting_seq)
    .bind(tx.reversed_by.map(Uuid::from))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn update_transaction(conn: &mut PgConnection, tx: &Transaction) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        "UPDATE ledger_transactions SET amount = $2, category = $3, category_id = $4, description = $5, \
         updated_at = $6, reversed_by = $7 WHERE id = $1",
    )
    .bind(Uuid::from(tx.id))
    .bind(tx.amount)
    .bind(&tx.category)
    .bind(tx.category_id)
    .bind(&tx.description)
    .bind(tx.updated_at)
    .bind(tx.reversed_by.map(Uuid::from))
    .execute(&mut *conn)
    .await?;
    expect_one(result.rows_affected(), "Transaction", tx.id)
}

pub async fn fetch_fund_transactions(
    conn: &mut PgConnection,
    domain: Domain,
    until: Option<NaiveDate>,
) -> Result<Vec<FundTransaction>, DatabaseError> {
    sqlx::query_as::<_, FundRow>(concat!(
        fund_select!(),
        " WHERE domain = $1 AND ($2::date IS NULL OR date <= $2) ORDER BY posting_seq"
    ))
    .bind(domain.as_str())
    .bind(until)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(FundTransaction::try_from)
    .collect()
}

pub async fn insert_fund_transaction(conn: &mut PgConnection, fund: &FundTransaction) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO fund_transactions (id, domain, fund_type, amount, purpose, voucher_no, date, added_by, \
         created_at, posting_seq) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(Uuid::from(fund.id))
    .bind(fund.domain.as_str())
    .bind(fund.fund_type.as_str())
    .bind(fund.amount)
    .bind(&fund.purpose)
    .bind(&fund.voucher_no)
    .bind(fund.date)
    .bind(&fund.added_by)
    .bind(fund.created_at)
    .bind(fund.posting_seq)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// ============================================================================
// Vouchers
// ============================================================================

/// Transaction-scoped advisory lock, released on commit or rollback
pub async fn advisory_lock(conn: &mut PgConnection, name: &str) -> Result<(), DatabaseError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(name)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn attach_links(conn: &mut PgConnection, rows: Vec<VoucherRow>) -> Result<Vec<Voucher>, DatabaseError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let links = sqlx::query_as::<_, (Uuid, Uuid)>(
        "SELECT voucher_id, transaction_id FROM voucher_links WHERE voucher_id = ANY($1) \
         ORDER BY voucher_id, position",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_voucher: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (voucher_id, transaction_id) in links {
        by_voucher.entry(voucher_id).or_default().push(transaction_id);
    }
    rows.into_iter()
        .map(|row| {
            let links = by_voucher.remove(&row.id).unwrap_or_default();
            row.into_voucher(links)
        })
        .collect()
}

async fn single_voucher(conn: &mut PgConnection, row: Option<VoucherRow>) -> Result<Option<Voucher>, DatabaseError> {
    match row {
        Some(row) => Ok(attach_links(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

pub async fn fetch_voucher(conn: &mut PgConnection, id: VoucherId) -> Result<Option<Voucher>, DatabaseError> {
    let row = sqlx::query_as::<_, VoucherRow>(concat!(voucher_select!(), " WHERE id = $1"))
        .bind(Uuid::from(id))
        .fetch_optional(&mut *conn)
        .await?;
    single_voucher(conn, row).await
}

pub async fn fetch_vouchers(conn: &mut PgConnection, until: Option<NaiveDate>) -> Result<Vec<Voucher>, DatabaseError> {
    let rows = sqlx::query_as::<_, VoucherRow>(concat!(
        voucher_select!(),
        " WHERE ($1::date IS NULL OR date <= $1) ORDER BY posting_seq"
    ))
    .bind(until)
    .fetch_all(&mut *conn)
    .await?;
    attach_links(conn, rows).await
}

pub async fn lock_voucher_by_key(conn: &mut PgConnection, key: &MergeKey) -> Result<Option<Voucher>, DatabaseError> {
    let row = sqlx::query_as::<_, VoucherRow>(concat!(
        voucher_select!(),
        " WHERE date = $1 AND source_account = $2 AND source_transaction_type = $3 AND voucher_type = $4 FOR UPDATE"
    ))
    .bind(key.date)
    .bind(key.source_account.as_str())
    .bind(&key.source_transaction_type)
    .bind(key.voucher_type.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    single_voucher(conn, row).await
}

pub async fn lock_voucher_for_transaction(
    conn: &mut PgConnection,
    id: TransactionId,
) -> Result<Option<Voucher>, DatabaseError> {
    let row = sqlx::query_as::<_, VoucherRow>(concat!(
        voucher_select!(),
        " WHERE source_reference_id = $1 \
         OR id IN (SELECT voucher_id FROM voucher_links WHERE transaction_id = $1) \
         ORDER BY posting_seq LIMIT 1 FOR UPDATE"
    ))
    .bind(Uuid::from(id))
    .fetch_optional(&mut *conn)
    .await?;
    single_voucher(conn, row).await
}

/// Highest serial and highest numeric voucher number in use
pub async fn voucher_serials(conn: &mut PgConnection) -> Result<(i64, i64), DatabaseError> {
    Ok(sqlx::query_as::<_, (i64, i64)>(
        "SELECT COALESCE(MAX(sl_no), 0)::bigint, \
         COALESCE(MAX(CASE WHEN voucher_no ~ '^[0-9]+$' THEN voucher_no::bigint END), 0)::bigint \
         FROM main_vouchers",
    )
    .fetch_one(&mut *conn)
    .await?)
}

async fn insert_links(conn: &mut PgConnection, voucher: &Voucher) -> Result<(), DatabaseError> {
    for (position, transaction_id) in voucher.linked_transactions.iter().enumerate() {
        sqlx::query(
            "INSERT INTO voucher_links (voucher_id, transaction_id, position) VALUES ($1, $2, $3) \
             ON CONFLICT (voucher_id, transaction_id) DO NOTHING",
        )
        .bind(Uuid::from(voucher.id))
        .bind(Uuid::from(*transaction_id))
        .bind(position as i32)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn insert_voucher(conn: &mut PgConnection, voucher: &Voucher) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO main_vouchers (id, sl_no, voucher_no, voucher_type, date, narration, amount, source_account, \
         source_transaction_type, source_voucher_no, source_reference_id, created_by, created_at, updated_at, \
         posting_seq) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
    )
    .bind(Uuid::from(voucher.id))
    .bind(voucher.sl_no)
    .bind(&voucher.voucher_no)
    .bind(voucher.voucher_type.as_str())
    .bind(voucher.date)
    .bind(&voucher.narration)
    .bind(voucher.amount)
    .bind(voucher.source_account.as_str())
    .bind(&voucher.source_transaction_type)
    .bind(&voucher.source_voucher_no)
    .bind(voucher.source_reference_id.map(Uuid::from))
    .bind(&voucher.created_by)
    .bind(voucher.created_at)
    .bind(voucher.updated_at)
    .bind(voucher.posting_seq)
    .execute(&mut *conn)
    .await?;
    insert_links(conn, voucher).await
}

pub async fn update_voucher(conn: &mut PgConnection, voucher: &Voucher) -> Result<(), DatabaseError> {
    let result = sqlx::query("UPDATE main_vouchers SET narration = $2, amount = $3, updated_at = $4 WHERE id = $1")
        .bind(Uuid::from(voucher.id))
        .bind(&voucher.narration)
        .bind(voucher.amount)
        .bind(voucher.updated_at)
        .execute(&mut *conn)
        .await?;
    expect_one(result.rows_affected(), "Voucher", voucher.id)?;
    insert_links(conn, voucher).await
}

// ============================================================================
// Vendors
// ============================================================================

pub async fn fetch_vendor(
    conn: &mut PgConnection,
    id: VendorId,
    for_update: bool,
) -> Result<Option<Vendor>, DatabaseError> {
    let sql = if for_update {
        concat!(vendor_select!(), " WHERE id = $1 FOR UPDATE")
    } else {
        concat!(vendor_select!(), " WHERE id = $1")
    };
    Ok(sqlx::query_as::<_, VendorRow>(sql)
        .bind(Uuid::from(id))
        .fetch_optional(&mut *conn)
        .await?
        .map(Vendor::from))
}

pub async fn insert_vendor(conn: &mut PgConnection, vendor: &Vendor) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO vendors (id, name, net_due, credit_limit, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::from(vendor.id))
    .bind(&vendor.name)
    .bind(vendor.net_due())
    .bind(vendor.credit_limit)
    .bind(vendor.created_at)
    .bind(vendor.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn update_vendor(conn: &mut PgConnection, vendor: &Vendor) -> Result<(), DatabaseError> {
    let result =
        sqlx::query("UPDATE vendors SET name = $2, net_due = $3, credit_limit = $4, updated_at = $5 WHERE id = $1")
            .bind(Uuid::from(vendor.id))
            .bind(&vendor.name)
            .bind(vendor.net_due())
            .bind(vendor.credit_limit)
            .bind(vendor.updated_at)
            .execute(&mut *conn)
            .await?;
    expect_one(result.rows_affected(), "Vendor", vendor.id)
}

async fn attach_allocations(
    conn: &mut PgConnection,
    rows: Vec<VendorTransactionRow>,
) -> Result<Vec<VendorTransaction>, DatabaseError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let allocations = sqlx::query_as::<_, (Uuid, Uuid, Decimal)>(
        "SELECT payment_id, purchase_id, amount FROM vendor_allocations WHERE payment_id = ANY($1) \
         ORDER BY payment_id, position",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_payment: HashMap<Uuid, Vec<Allocation>> = HashMap::new();
    for (payment_id, purchase_id, amount) in allocations {
        by_payment.entry(payment_id).or_default().push(Allocation {
            purchase_id: VendorTransactionId::from_uuid(purchase_id),
            amount,
        });
    }
    rows.into_iter()
        .map(|row| {
            let allocations = by_payment.remove(&row.id).unwrap_or_default();
            row.into_vendor_transaction(allocations)
        })
        .collect()
}

pub async fn fetch_vendor_transaction(
    conn: &mut PgConnection,
    id: VendorTransactionId,
    for_update: bool,
) -> Result<Option<VendorTransaction>, DatabaseError> {
    let sql = if for_update {
        concat!(vendor_transaction_select!(), " WHERE id = $1 FOR UPDATE")
    } else {
        concat!(vendor_transaction_select!(), " WHERE id = $1")
    };
    let row = sqlx::query_as::<_, VendorTransactionRow>(sql)
        .bind(Uuid::from(id))
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => Ok(attach_allocations(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

pub async fn fetch_vendor_transactions(
    conn: &mut PgConnection,
    vendor_id: VendorId,
) -> Result<Vec<VendorTransaction>, DatabaseError> {
    let rows = sqlx::query_as::<_, VendorTransactionRow>(concat!(
        vendor_transaction_select!(),
        " WHERE vendor_id = $1 ORDER BY date, posting_seq"
    ))
    .bind(Uuid::from(vendor_id))
    .fetch_all(&mut *conn)
    .await?;
    attach_allocations(conn, rows).await
}

pub async fn insert_vendor_transaction(conn: &mut PgConnection, row: &VendorTransaction) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO vendor_transactions (id, vendor_id, kind, amount, outstanding, description, date, reference_no, \
         ledger_transaction_id, created_by, created_at, posting_seq) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(Uuid::from(row.id))
    .bind(Uuid::from(row.vendor_id))
    .bind(row.kind.as_str())
    .bind(row.amount)
    .bind(row.outstanding)
    .bind(&row.description)
    .bind(row.date)
    .bind(&row.reference_no)
    .bind(row.ledger_transaction_id.map(Uuid::from))
    .bind(&row.created_by)
    .bind(row.created_at)
    .bind(row.posting_seq)
    .execute(&mut *conn)
    .await?;

    for (position, allocation) in row.allocations.iter().enumerate() {
        sqlx::query(
            "INSERT INTO vendor_allocations (payment_id, purchase_id, amount, position) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::from(row.id))
        .bind(Uuid::from(allocation.purchase_id))
        .bind(allocation.amount)
        .bind(position as i32)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn update_vendor_transaction(conn: &mut PgConnection, row: &VendorTransaction) -> Result<(), DatabaseError> {
    let result = sqlx::query("UPDATE vendor_transactions SET outstanding = $2 WHERE id = $1")
        .bind(Uuid::from(row.id))
        .bind(row.outstanding)
        .execute(&mut *conn)
        .await?;
    expect_one(result.rows_affected(), "VendorTransaction", row.id)
}

fn expect_one(rows_affected: u64, entity: &str, id: impl Display) -> Result<(), DatabaseError> {
    if rows_affected == 1 {
        Ok(())
    } else {
        Err(DatabaseError::not_found(entity, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_ledger::{TransactionType, VoucherType};
    use rust_decimal_macros::dec;

    fn voucher_row() -> VoucherRow {
        VoucherRow {
            id: Uuid::now_v7(),
            sl_no: 3,
            voucher_no: "03".to_string(),
            voucher_type: "Credit".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            narration: "Hospital - Income: G1".to_string(),
            amount: dec!(500),
            source_account: "hospital".to_string(),
            source_transaction_type: "income".to_string(),
            source_voucher_no: Some("HSP-000001".to_string()),
            source_reference_id: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            posting_seq: 7,
        }
    }

    #[test]
    fn test_voucher_row_decodes_with_links() {
        let link = Uuid::now_v7();
        let voucher = voucher_row().into_voucher(vec![link]).unwrap();
        assert_eq!(voucher.voucher_type, VoucherType::Credit);
        assert_eq!(voucher.source_account, Domain::Hospital);
        assert_eq!(voucher.linked_transactions, vec![TransactionId::from_uuid(link)]);
    }

    #[test]
    fn test_unknown_enum_text_is_corrupt() {
        let mut row = voucher_row();
        row.source_account = "pharmacy".to_string();
        let err = row.into_voucher(Vec::new()).unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptRow(_)));
    }

    #[test]
    fn test_transaction_row_decodes() {
        let now = Utc::now();
        let row = TransactionRow {
            id: Uuid::now_v7(),
            domain: "optics".to_string(),
            transaction_type: "expense".to_string(),
            category: "Optics Purchase".to_string(),
            category_id: None,
            amount: dec!(120),
            description: "frames".to_string(),
            reference_type: None,
            reference_id: None,
            transaction_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            transaction_no: "OPT-000001".to_string(),
            created_by: None,
            created_at: now,
            updated_at: now,
            posting_seq: 1,
            reversed_by: None,
        };
        let tx = Transaction::try_from(row).unwrap();
        assert_eq!(tx.domain, Domain::Optics);
        assert_eq!(tx.transaction_type, TransactionType::Expense);
        assert_eq!(tx.net(), dec!(-120));
    }

    #[test]
    fn test_negative_counter_is_corrupt() {
        let row = AccountRow {
            domain: "main".to_string(),
            balance: dec!(0),
            transaction_seq: -1,
            fund_voucher_seq: 0,
            updated_at: Utc::now(),
        };
        assert!(Account::try_from(row).is_err());
    }
}
