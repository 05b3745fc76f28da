//! Statement builder
//!
//! Read-only reconstruction of balances and reports from history. Nothing
//! here looks at the live account balance, so a statement that covers the
//! whole history is an independent check of it.

use chrono::NaiveDate;
use csv::Writer;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use core_kernel::{checked_sum, round_money, DateRange};

use crate::account::Domain;
use crate::category::{CategoryTaxonomy, Side};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::history::{EntryKind, LedgerEntry, LedgerHistory};
use crate::ports::LedgerStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketAmount {
    pub label: String,
    pub amount: Decimal,
}

/// Credit and debit columns summed over some set of entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketTotals {
    pub fund_in: Decimal,
    pub credits: Vec<BucketAmount>,
    pub total_credit: Decimal,
    pub fund_out: Decimal,
    pub debits: Vec<BucketAmount>,
    pub total_debit: Decimal,
}

impl BucketTotals {
    fn empty(taxonomy: &CategoryTaxonomy) -> Self {
        let zeroed = |side| {
            taxonomy
                .labels(side)
                .into_iter()
                .map(|label| BucketAmount {
                    label,
                    amount: Decimal::ZERO,
                })
                .collect()
        };
        Self {
            fund_in: Decimal::ZERO,
            credits: zeroed(Side::Credit),
            total_credit: Decimal::ZERO,
            fund_out: Decimal::ZERO,
            debits: zeroed(Side::Debit),
            total_debit: Decimal::ZERO,
        }
    }

    fn add(&mut self, taxonomy: &CategoryTaxonomy, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let side = entry.kind.side();
        if entry.kind.is_fund() {
            let slot = match side {
                Side::Credit => &mut self.fund_in,
                Side::Debit => &mut self.fund_out,
            };
            *slot = checked_sum(*slot, entry.amount)?;
        } else {
            let label = taxonomy.classify(side, entry.category.as_deref().unwrap_or_default());
            let buckets = match side {
                Side::Credit => &mut self.credits,
                Side::Debit => &mut self.debits,
            };
            if let Some(bucket) = buckets.iter_mut().find(|b| b.label == label) {
                bucket.amount = checked_sum(bucket.amount, entry.amount)?;
            }
        }
        let total = match side {
            Side::Credit => &mut self.total_credit,
            Side::Debit => &mut self.total_debit,
        };
        *total = checked_sum(*total, entry.amount)?;
        Ok(())
    }

    pub fn net(&self) -> Decimal {
        self.total_credit - self.total_debit
    }

    pub fn credit(&self, label: &str) -> Decimal {
        Self::lookup(&self.credits, label)
    }

    pub fn debit(&self, label: &str) -> Decimal {
        Self::lookup(&self.debits, label)
    }

    fn lookup(buckets: &[BucketAmount], label: &str) -> Decimal {
        buckets
            .iter()
            .find(|b| b.label == label)
            .map(|b| b.amount)
            .unwrap_or(Decimal::ZERO)
    }

    fn csv_cells(&self) -> Vec<String> {
        let mut cells = vec![money_cell(self.fund_in)];
        cells.extend(self.credits.iter().map(|b| money_cell(b.amount)));
        cells.push(money_cell(self.total_credit));
        cells.push(money_cell(self.fund_out));
        cells.extend(self.debits.iter().map(|b| money_cell(b.amount)));
        cells.push(money_cell(self.total_debit));
        cells
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: BucketTotals,
    /// Balance at the end of the day
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStatement {
    pub domain: Domain,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
    /// One row per calendar day, including days without activity
    pub rows: Vec<DailyRow>,
    pub totals: BucketTotals,
}

impl DailyStatement {
    pub fn to_csv(&self) -> Result<String, LedgerError> {
        let mut header = vec!["Date".to_string(), "Fund In".to_string()];
        header.extend(self.totals.credits.iter().map(|b| b.label.clone()));
        header.push("Total Credit".to_string());
        header.push("Fund Out".to_string());
        header.extend(self.totals.debits.iter().map(|b| b.label.clone()));
        header.push("Total Debit".to_string());
        header.push("Balance".to_string());
        let width = header.len();

        let mut records = vec![header, padded("Opening Balance", width, self.opening_balance)];
        for row in &self.rows {
            let mut record = vec![row.date.to_string()];
            record.extend(row.totals.csv_cells());
            record.push(money_cell(row.balance));
            records.push(record);
        }
        let mut totals = vec!["Total".to_string()];
        totals.extend(self.totals.csv_cells());
        totals.push(money_cell(self.closing_balance));
        records.push(totals);
        write_csv(records)
    }
}

/// Bucket totals over a whole range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub domain: Domain,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
    pub totals: BucketTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatementRow {
    pub date: NaiveDate,
    pub number: String,
    pub kind: EntryKind,
    pub category: Option<String>,
    pub description: String,
    pub deposit: Option<Decimal>,
    pub withdraw: Option<Decimal>,
    pub running_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatement {
    pub domain: Domain,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
    pub total_deposit: Decimal,
    pub total_withdraw: Decimal,
    pub rows: Vec<AccountStatementRow>,
}

impl AccountStatement {
    pub fn to_csv(&self) -> Result<String, LedgerError> {
        let header: Vec<String> = ["Date", "No", "Description", "Category", "Deposit", "Withdraw", "Balance"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        let width = header.len();
        let mut records = vec![header, padded("Opening Balance", width, self.opening_balance)];
        for row in &self.rows {
            records.push(vec![
                row.date.to_string(),
                row.number.clone(),
                row.description.clone(),
                row.category.clone().unwrap_or_default(),
                row.deposit.map(money_cell).unwrap_or_default(),
                row.withdraw.map(money_cell).unwrap_or_default(),
                money_cell(row.running_balance),
            ]);
        }
        records.push(vec![
            "Total".to_string(),
            String::new(),
            String::new(),
            String::new(),
            money_cell(self.total_deposit),
            money_cell(self.total_withdraw),
            money_cell(self.closing_balance),
        ]);
        write_csv(records)
    }
}

fn money_cell(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}

/// Label in the first column, amount in the last
fn padded(label: &str, width: usize, amount: Decimal) -> Vec<String> {
    let mut record = vec![String::new(); width];
    record[0] = label.to_string();
    record[width - 1] = money_cell(amount);
    record
}

fn write_csv(records: Vec<Vec<String>>) -> Result<String, LedgerError> {
    let mut writer = Writer::from_writer(vec![]);
    for record in records {
        writer
            .write_record(&record)
            .map_err(|e| LedgerError::Export(e.to_string()))?;
    }
    let data = writer.into_inner().map_err(|e| LedgerError::Export(e.to_string()))?;
    String::from_utf8(data).map_err(|e| LedgerError::Export(e.to_string()))
}

#[derive(Clone)]
pub struct StatementBuilder {
    store: Arc<dyn LedgerStore>,
    config: Arc<LedgerConfig>,
}

impl StatementBuilder {
    pub fn new(store: Arc<dyn LedgerStore>, config: Arc<LedgerConfig>) -> Self {
        Self { store, config }
    }

    async fn history(&self, domain: Domain, until: NaiveDate) -> Result<LedgerHistory, LedgerError> {
        let history = self.store.history(domain, Some(until)).await?.scoped(domain);
        debug!(
            %domain,
            %until,
            transactions = history.transactions.len(),
            funds = history.fund_transactions.len(),
            vouchers = history.vouchers.len(),
            "loaded history"
        );
        Ok(history)
    }

    fn opening_from(&self, domain: Domain, history: &LedgerHistory, from: NaiveDate) -> Result<Decimal, LedgerError> {
        Ok(checked_sum(self.config.opening_balance(domain), history.net_before(from)?)?)
    }

    /// Configured base plus everything dated strictly before `from`
    #[instrument(skip(self))]
    pub async fn opening_balance(&self, domain: Domain, from: NaiveDate) -> Result<Decimal, LedgerError> {
        let history = self.history(domain, from).await?;
        self.opening_from(domain, &history, from)
    }

    /// One row per day of `[from, to]` with category buckets and a carried balance
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` when `from > to` or the range is longer
    /// than `max_statement_days`.
    #[instrument(skip(self))]
    pub async fn daily_statement(&self, domain: Domain, from: NaiveDate, to: NaiveDate) -> Result<DailyStatement, LedgerError> {
        let range = DateRange::new(from, to)?.limited_to(self.config.max_statement_days)?;
        let history = self.history(domain, to).await?;
        let opening_balance = self.opening_from(domain, &history, from)?;
        let taxonomy = &self.config.taxonomy;

        let entries = history.entries();
        let mut pending = entries.iter().filter(|e| range.contains(e.date)).peekable();
        let mut totals = BucketTotals::empty(taxonomy);
        let mut balance = opening_balance;
        let mut rows = Vec::with_capacity(range.len_days() as usize);
        for day in range.days() {
            let mut day_totals = BucketTotals::empty(taxonomy);
            while let Some(entry) = pending.next_if(|e| e.date == day) {
                day_totals.add(taxonomy, entry)?;
                totals.add(taxonomy, entry)?;
            }
            balance = checked_sum(balance, day_totals.net())?;
            rows.push(DailyRow {
                date: day,
                totals: day_totals,
                balance,
            });
        }

        Ok(DailyStatement {
            domain,
            from,
            to,
            opening_balance,
            closing_balance: balance,
            rows,
            totals,
        })
    }

    #[instrument(skip(self))]
    pub async fn period_summary(&self, domain: Domain, from: NaiveDate, to: NaiveDate) -> Result<PeriodSummary, LedgerError> {
        let range = DateRange::new(from, to)?;
        let history = self.history(domain, to).await?;
        let opening_balance = self.opening_from(domain, &history, from)?;
        let mut totals = BucketTotals::empty(&self.config.taxonomy);
        for entry in history.entries().iter().filter(|e| range.contains(e.date)) {
            totals.add(&self.config.taxonomy, entry)?;
        }
        Ok(PeriodSummary {
            domain,
            from,
            to,
            opening_balance,
            closing_balance: checked_sum(opening_balance, totals.net())?,
            totals,
        })
    }

    /// Running-balance ledger of `[from, to]`
    #[instrument(skip(self))]
    pub async fn account_statement(&self, domain: Domain, from: NaiveDate, to: NaiveDate) -> Result<AccountStatement, LedgerError> {
        let range = DateRange::new(from, to)?;
        let history = self.history(domain, to).await?;
        let opening_balance = self.opening_from(domain, &history, from)?;

        let mut running = opening_balance;
        let mut total_deposit = Decimal::ZERO;
        let mut total_withdraw = Decimal::ZERO;
        let mut rows = Vec::new();
        for entry in history.entries().into_iter().filter(|e| range.contains(e.date)) {
            running = checked_sum(running, entry.signed())?;
            let (deposit, withdraw) = match entry.kind.side() {
                Side::Credit => {
                    total_deposit = checked_sum(total_deposit, entry.amount)?;
                    (Some(entry.amount), None)
                }
                Side::Debit => {
                    total_withdraw = checked_sum(total_withdraw, entry.amount)?;
                    (None, Some(entry.amount))
                }
            };
            rows.push(AccountStatementRow {
                date: entry.date,
                number: entry.number,
                kind: entry.kind,
                category: entry.category,
                description: entry.description,
                deposit,
                withdraw,
                running_balance: round_money(running),
            });
        }

        Ok(AccountStatement {
            domain,
            from,
            to,
            opening_balance,
            closing_balance: round_money(running),
            total_deposit,
            total_withdraw,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_cell_rounds_to_cents() {
        assert_eq!(money_cell(dec!(10)), "10.00");
        assert_eq!(money_cell(dec!(2.345)), "2.35");
        assert_eq!(money_cell(dec!(-7.5)), "-7.50");
    }

    #[test]
    fn test_padded_row() {
        assert_eq!(padded("Opening Balance", 3, dec!(5)), vec!["Opening Balance", "", "5.00"]);
    }

    #[test]
    fn test_empty_totals_follow_taxonomy() {
        let totals = BucketTotals::empty(&CategoryTaxonomy::clinic_default());
        assert_eq!(totals.credits.len(), 6);
        assert_eq!(totals.debits.len(), 6);
        assert_eq!(totals.debits.last().unwrap().label, "Other Expenses");
        assert_eq!(totals.credit("Medical Test"), Decimal::ZERO);
    }
}
