//! Posting routines shared by the posting service and the vendor ledger
//!
//! Each routine runs inside a caller-owned unit of work and follows the lock
//! order documented on [`crate::ports`]. An account is always locked, moved
//! and saved before the next account is locked, so a posting whose domain is
//! Main itself never works on a stale copy.

use chrono::NaiveDate;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;

use core_kernel::{FundTransactionId, TransactionId, VoucherId};

use crate::account::Domain;
use crate::balance::{BalanceCell, BalanceMovement};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::fund::{FundMovement, FundTransaction, FundType};
use crate::ports::LedgerUnitOfWork;
use crate::transaction::{NewPosting, Transaction, TransactionType};
use crate::voucher::{Voucher, VoucherPosting};

/// Locks `domain`, applies `delta`, writes the account back
pub(crate) async fn move_balance(
    uow: &mut dyn LedgerUnitOfWork,
    config: &LedgerConfig,
    domain: Domain,
    delta: Decimal,
    reference: &str,
) -> Result<BalanceMovement, LedgerError> {
    let mut account = uow.lock_account(domain, config.opening_balance(domain)).await?;
    let movement = account.apply(delta, reference)?;
    uow.save_account(&account).await?;
    Ok(movement)
}

pub(crate) async fn post_transaction(
    uow: &mut dyn LedgerUnitOfWork,
    config: &LedgerConfig,
    domain: Domain,
    transaction_type: TransactionType,
    posting: NewPosting,
) -> Result<Transaction, LedgerError> {
    let amount = posting.checked_amount()?;

    let mut account = uow.lock_account(domain, config.opening_balance(domain)).await?;
    let transaction_no = account.next_transaction_no();
    account.apply(transaction_type.direction().signed(amount.value()), &transaction_no)?;
    uow.save_account(&account).await?;

    let now = Utc::now();
    let transaction = Transaction {
        id: TransactionId::new_v7(),
        domain,
        transaction_type,
        category: posting.category,
        category_id: posting.category_id,
        amount: amount.value(),
        description: posting.description,
        reference_type: posting.reference_type,
        reference_id: posting.reference_id,
        transaction_date: business_date(config, posting.date),
        transaction_no,
        created_by: posting.created_by,
        created_at: now,
        updated_at: now,
        posting_seq: uow.next_posting_seq().await?,
        reversed_by: None,
    };
    uow.insert_transaction(&transaction).await?;
    Ok(transaction)
}

pub(crate) async fn post_fund(
    uow: &mut dyn LedgerUnitOfWork,
    config: &LedgerConfig,
    domain: Domain,
    fund_type: FundType,
    movement: FundMovement,
) -> Result<FundTransaction, LedgerError> {
    let amount = movement.validate()?;

    let mut account = uow.lock_account(domain, config.opening_balance(domain)).await?;
    if fund_type == FundType::FundOut && amount.value() > account.balance() {
        return Err(LedgerError::InsufficientBalance {
            domain,
            balance: account.balance(),
            requested: amount.value(),
        });
    }
    let voucher_no = account.next_fund_voucher_no();
    account.apply(fund_type.direction().signed(amount.value()), &voucher_no)?;
    uow.save_account(&account).await?;

    let fund = FundTransaction {
        id: FundTransactionId::new_v7(),
        domain,
        fund_type,
        amount: amount.value(),
        purpose: movement.purpose,
        voucher_no,
        date: business_date(config, movement.date),
        added_by: movement.added_by,
        created_at: Utc::now(),
        posting_seq: uow.next_posting_seq().await?,
    };
    uow.insert_fund_transaction(&fund).await?;
    Ok(fund)
}

/// Adds a posting to the Main ledger, merging into the voucher of its key
pub(crate) async fn merge_voucher(
    uow: &mut dyn LedgerUnitOfWork,
    config: &LedgerConfig,
    posting: VoucherPosting,
) -> Result<Voucher, LedgerError> {
    let amount = posting.validate()?;
    let key = posting.key();

    let voucher = match uow.lock_voucher_by_key(&key).await? {
        Some(mut existing) => {
            existing.merge(amount.value(), &posting.description, posting.source_reference_id)?;
            uow.save_voucher(&existing).await?;
            debug!(voucher_no = %existing.voucher_no, amount = %amount, total = %existing.amount, "merged into voucher");
            existing
        }
        None => {
            let serials = uow.next_voucher_serials().await?;
            let posting_seq = uow.next_posting_seq().await?;
            let created = posting.into_voucher(VoucherId::new_v7(), serials.sl_no, serials.voucher_seq, posting_seq);
            uow.insert_voucher(&created).await?;
            debug!(voucher_no = %created.voucher_no, amount = %amount, "created voucher");
            created
        }
    };

    move_balance(uow, config, Domain::Main, voucher.voucher_type.direction().signed(amount.value()), &voucher.voucher_no)
        .await?;
    Ok(voucher)
}

/// Carries an amount correction of `transaction_id` over to its voucher
///
/// Returns `None` when no voucher links the transaction.
pub(crate) async fn adjust_linked_voucher(
    uow: &mut dyn LedgerUnitOfWork,
    config: &LedgerConfig,
    transaction_id: TransactionId,
    delta: Decimal,
) -> Result<Option<Voucher>, LedgerError> {
    let Some(mut voucher) = uow.lock_voucher_for_transaction(transaction_id).await? else {
        return Ok(None);
    };
    if delta.is_zero() {
        return Ok(Some(voucher));
    }
    voucher.adjust(delta)?;
    if voucher.amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_operation(format!(
            "update would leave voucher {} with amount {}",
            voucher.voucher_no, voucher.amount
        )));
    }
    uow.save_voucher(&voucher).await?;
    debug!(voucher_no = %voucher.voucher_no, %delta, total = %voucher.amount, "adjusted voucher");

    move_balance(uow, config, Domain::Main, voucher.voucher_type.direction().signed(delta), &voucher.voucher_no).await?;
    Ok(Some(voucher))
}

/// Default business date for a row that did not name one
pub(crate) fn business_date(config: &LedgerConfig, date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| config.today())
}
