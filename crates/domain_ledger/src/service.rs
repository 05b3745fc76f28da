//! Ledger posting service
//!
//! The only surface that mutates balances. Every public operation opens one
//! unit of work, runs to completion inside it and commits; on any error the
//! unit is rolled back so no balance change survives without its row.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use core_kernel::{TransactionId, VoucherId};

use crate::account::Domain;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::fund::{FundMovement, FundTransaction, FundType};
use crate::ports::{LedgerStore, LedgerUnitOfWork};
use crate::posting;
use crate::transaction::{NewPosting, Transaction, TransactionType, TransactionUpdate, REVERSAL_REFERENCE};
use crate::voucher::{Voucher, VoucherPosting, VoucherType};

/// Source transaction type stamped on vouchers produced by reversals
pub const REVERSAL_SOURCE_TYPE: &str = "reversal";

/// Result of `reverse_transaction`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reversal {
    pub original: Transaction,
    pub reversal: Transaction,
    /// Opposite voucher merged into Main when the original was consolidated
    pub voucher: Option<Voucher>,
}

/// Commits on success, rolls back on failure
pub(crate) async fn finish<T>(uow: Box<dyn LedgerUnitOfWork>, result: Result<T, LedgerError>) -> Result<T, LedgerError> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = uow.rollback().await {
                warn!(error = %rollback_error, "rollback failed");
            }
            Err(error)
        }
    }
}

#[derive(Clone)]
pub struct PostingService {
    store: Arc<dyn LedgerStore>,
    config: Arc<LedgerConfig>,
}

impl PostingService {
    pub fn new(store: Arc<dyn LedgerStore>, config: Arc<LedgerConfig>) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Records income on a domain ledger
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a non-positive amount or an empty category;
    /// nothing is written in that case.
    #[instrument(skip(self, posting), fields(domain = %domain, amount = %posting.amount))]
    pub async fn add_income(&self, domain: Domain, posting: NewPosting) -> Result<Transaction, LedgerError> {
        self.post(domain, TransactionType::Income, posting).await
    }

    /// Records an expense on a domain ledger
    ///
    /// The balance may go negative: purchases are recorded even when the
    /// drawer is short.
    #[instrument(skip(self, posting), fields(domain = %domain, amount = %posting.amount))]
    pub async fn add_expense(&self, domain: Domain, posting: NewPosting) -> Result<Transaction, LedgerError> {
        self.post(domain, TransactionType::Expense, posting).await
    }

    async fn post(
        &self,
        domain: Domain,
        transaction_type: TransactionType,
        posting: NewPosting,
    ) -> Result<Transaction, LedgerError> {
        posting.validate()?;
        let mut uow = self.store.begin().await?;
        let result = posting::post_transaction(uow.as_mut(), &self.config, domain, transaction_type, posting).await;
        let transaction = finish(uow, result).await?;
        info!(
            transaction_no = %transaction.transaction_no,
            kind = %transaction_type,
            category = %transaction.category,
            "posted transaction"
        );
        Ok(transaction)
    }

    /// Posts income and merges it into the Main ledger as a Credit voucher
    #[instrument(skip(self, posting), fields(domain = %domain, amount = %posting.amount))]
    pub async fn post_income_with_voucher(
        &self,
        domain: Domain,
        posting: NewPosting,
        source_transaction_type: &str,
    ) -> Result<(Transaction, Voucher), LedgerError> {
        self.post_with_voucher(domain, TransactionType::Income, posting, source_transaction_type)
            .await
    }

    /// Posts an expense and merges it into the Main ledger as a Debit voucher
    #[instrument(skip(self, posting), fields(domain = %domain, amount = %posting.amount))]
    pub async fn post_expense_with_voucher(
        &self,
        domain: Domain,
        posting: NewPosting,
        source_transaction_type: &str,
    ) -> Result<(Transaction, Voucher), LedgerError> {
        self.post_with_voucher(domain, TransactionType::Expense, posting, source_transaction_type)
            .await
    }

    async fn post_with_voucher(
        &self,
        domain: Domain,
        transaction_type: TransactionType,
        posting: NewPosting,
        source_transaction_type: &str,
    ) -> Result<(Transaction, Voucher), LedgerError> {
        posting.validate()?;
        if domain.is_main() {
            return Err(LedgerError::validation("Main postings are not consolidated into vouchers"));
        }
        let voucher_type = match transaction_type {
            TransactionType::Income => VoucherType::Credit,
            TransactionType::Expense => VoucherType::Debit,
        };

        let mut uow = self.store.begin().await?;
        let result = async {
            let transaction =
                posting::post_transaction(uow.as_mut(), &self.config, domain, transaction_type, posting).await?;
            let mut voucher_posting = VoucherPosting::new(
                transaction.transaction_date,
                transaction.amount,
                voucher_type,
                domain,
                source_transaction_type,
                transaction.description.clone(),
            )
            .with_source(transaction.transaction_no.clone(), transaction.id);
            voucher_posting.created_by = transaction.created_by.clone();
            let voucher = posting::merge_voucher(uow.as_mut(), &self.config, voucher_posting).await?;
            Ok::<_, LedgerError>((transaction, voucher))
        }
        .await;
        let (transaction, voucher) = finish(uow, result).await?;
        info!(
            transaction_no = %transaction.transaction_no,
            voucher_no = %voucher.voucher_no,
            "posted transaction with voucher"
        );
        Ok((transaction, voucher))
    }

    /// Corrects the amount (and optionally category/description) of an income
    ///
    /// # Arguments
    ///
    /// * `id` - The income transaction to correct
    /// * `update` - The new amount and optional field overrides
    ///
    /// # Errors
    ///
    /// * `TransactionNotFound` when `id` is unknown
    /// * `InvalidOperation` when `id` is an expense, a reversal, or already reversed
    #[instrument(skip(self, update), fields(transaction_id = %id, amount = %update.amount))]
    pub async fn update_income(&self, id: TransactionId, update: TransactionUpdate) -> Result<Transaction, LedgerError> {
        self.update(id, Some(TransactionType::Income), update).await
    }

    /// Expense counterpart of [`PostingService::update_income`]
    #[instrument(skip(self, update), fields(transaction_id = %id, amount = %update.amount))]
    pub async fn update_expense(
        &self,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> Result<Transaction, LedgerError> {
        self.update(id, Some(TransactionType::Expense), update).await
    }

    /// Corrects a transaction of either type
    #[instrument(skip(self, update), fields(transaction_id = %id, amount = %update.amount))]
    pub async fn update_transaction(
        &self,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> Result<Transaction, LedgerError> {
        self.update(id, None, update).await
    }

    async fn update(
        &self,
        id: TransactionId,
        expected: Option<TransactionType>,
        update: TransactionUpdate,
    ) -> Result<Transaction, LedgerError> {
        update.validate()?;
        let mut uow = self.store.begin().await?;
        let result = async {
            let mut transaction = uow
                .lock_transaction(id)
                .await?
                .ok_or_else(|| LedgerError::TransactionNotFound(id.to_string()))?;
            if let Some(expected) = expected {
                if transaction.transaction_type != expected {
                    return Err(LedgerError::invalid_operation(format!(
                        "{} is an {}, not an {}",
                        transaction.transaction_no, transaction.transaction_type, expected
                    )));
                }
            }
            if transaction.is_reversed() || transaction.is_reversal() {
                return Err(LedgerError::invalid_operation(format!(
                    "{} is part of a reversal and can no longer be edited",
                    transaction.transaction_no
                )));
            }

            let delta = update.apply_to(&mut transaction);
            uow.save_transaction(&transaction).await?;
            posting::move_balance(
                uow.as_mut(),
                &self.config,
                transaction.domain,
                transaction.transaction_type.direction().signed(delta),
                &transaction.transaction_no,
            )
            .await?;
            let voucher = posting::adjust_linked_voucher(uow.as_mut(), &self.config, transaction.id, delta).await?;
            Ok::<_, LedgerError>((transaction, delta, voucher))
        }
        .await;
        let (transaction, delta, voucher) = finish(uow, result).await?;
        info!(
            transaction_no = %transaction.transaction_no,
            %delta,
            voucher_no = voucher.as_ref().map(|v| v.voucher_no.as_str()).unwrap_or("-"),
            "updated transaction"
        );
        Ok(transaction)
    }

    /// Adds a posting to the Main ledger, merging it into the voucher of
    /// the same `(date, source account, source type, voucher type)` if one
    /// exists
    #[instrument(skip(self, posting), fields(source = %posting.source_account, amount = %posting.amount))]
    pub async fn update_main_account_voucher(&self, posting: VoucherPosting) -> Result<Voucher, LedgerError> {
        posting.validate()?;
        let mut uow = self.store.begin().await?;
        let result = posting::merge_voucher(uow.as_mut(), &self.config, posting).await;
        let voucher = finish(uow, result).await?;
        info!(voucher_no = %voucher.voucher_no, total = %voucher.amount, "posted main voucher");
        Ok(voucher)
    }

    #[instrument(skip(self, movement), fields(domain = %domain, amount = %movement.amount))]
    pub async fn add_fund(&self, domain: Domain, movement: FundMovement) -> Result<FundTransaction, LedgerError> {
        self.fund(domain, FundType::FundIn, movement).await
    }

    /// Takes capital out of a domain; fails when the balance cannot cover it
    #[instrument(skip(self, movement), fields(domain = %domain, amount = %movement.amount))]
    pub async fn withdraw_fund(&self, domain: Domain, movement: FundMovement) -> Result<FundTransaction, LedgerError> {
        self.fund(domain, FundType::FundOut, movement).await
    }

    async fn fund(
        &self,
        domain: Domain,
        fund_type: FundType,
        movement: FundMovement,
    ) -> Result<FundTransaction, LedgerError> {
        movement.validate()?;
        let mut uow = self.store.begin().await?;
        let result = posting::post_fund(uow.as_mut(), &self.config, domain, fund_type, movement).await;
        let fund = finish(uow, result).await?;
        info!(voucher_no = %fund.voucher_no, kind = fund_type.as_str(), "posted fund movement");
        Ok(fund)
    }

    /// Offsets a transaction with one of the opposite type
    ///
    /// The original keeps its amount and is marked as reversed. If it was
    /// consolidated into a Main voucher, an opposite-direction voucher is
    /// merged under the `reversal` source type.
    #[instrument(skip(self, reason, created_by), fields(transaction_id = %id))]
    pub async fn reverse_transaction(
        &self,
        id: TransactionId,
        reason: &str,
        created_by: Option<String>,
    ) -> Result<Reversal, LedgerError> {
        let mut uow = self.store.begin().await?;
        let result = async {
            let mut original = uow
                .lock_transaction(id)
                .await?
                .ok_or_else(|| LedgerError::TransactionNotFound(id.to_string()))?;
            if original.is_reversed() {
                return Err(LedgerError::invalid_operation(format!(
                    "{} has already been reversed",
                    original.transaction_no
                )));
            }
            if original.is_reversal() {
                return Err(LedgerError::invalid_operation(format!(
                    "{} is itself a reversal",
                    original.transaction_no
                )));
            }

            let mut offset = NewPosting::new(
                original.amount,
                original.category.clone(),
                format!("Reversal of {}: {}", original.transaction_no, reason),
            )
            .with_reference(REVERSAL_REFERENCE, original.id.to_string());
            offset.category_id = original.category_id;
            offset.created_by = created_by.clone();
            let reversal = posting::post_transaction(
                uow.as_mut(),
                &self.config,
                original.domain,
                original.transaction_type.opposite(),
                offset,
            )
            .await?;

            original.reversed_by = Some(reversal.id);
            original.updated_at = reversal.created_at;
            uow.save_transaction(&original).await?;

            let linked = uow.lock_voucher_for_transaction(original.id).await?;
            let voucher = match linked {
                Some(linked) => {
                    let mut voucher_posting = VoucherPosting::new(
                        reversal.transaction_date,
                        reversal.amount,
                        linked.voucher_type.opposite(),
                        original.domain,
                        REVERSAL_SOURCE_TYPE,
                        reversal.description.clone(),
                    )
                    .with_source(reversal.transaction_no.clone(), reversal.id);
                    voucher_posting.created_by = created_by;
                    Some(posting::merge_voucher(uow.as_mut(), &self.config, voucher_posting).await?)
                }
                None => None,
            };
            Ok::<_, LedgerError>(Reversal {
                original,
                reversal,
                voucher,
            })
        }
        .await;
        let reversal = finish(uow, result).await?;
        info!(
            original = %reversal.original.transaction_no,
            reversal = %reversal.reversal.transaction_no,
            "reversed transaction"
        );
        Ok(reversal)
    }

    /// Live balance; the configured base when the account was never touched
    pub async fn get_balance(&self, domain: Domain) -> Result<Decimal, LedgerError> {
        let balance = self
            .store
            .account(domain)
            .await?
            .map(|account| account.balance())
            .unwrap_or_else(|| self.config.opening_balance(domain));
        Ok(balance)
    }

    pub async fn transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.store
            .transaction(id)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound(id.to_string()))
    }

    pub async fn voucher(&self, id: VoucherId) -> Result<Voucher, LedgerError> {
        self.store
            .voucher(id)
            .await?
            .ok_or_else(|| LedgerError::VoucherNotFound(id.to_string()))
    }
}
