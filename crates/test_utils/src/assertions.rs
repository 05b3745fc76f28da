//! Custom Test Assertions
//!
//! Ledger assertions with messages that name the domain and the numbers
//! involved.

use rust_decimal::Decimal;

use domain_ledger::{AccountStatement, DailyStatement, Domain, LedgerEngine};

/// Asserts the live balance of a domain account
///
/// # Panics
///
/// Panics if the balance cannot be read or differs from `expected`
pub async fn assert_balance(engine: &LedgerEngine, domain: Domain, expected: Decimal) {
    let actual = engine
        .postings
        .get_balance(domain)
        .await
        .unwrap_or_else(|e| panic!("could not read {} balance: {}", domain, e));
    assert_eq!(
        actual, expected,
        "{} balance mismatch: actual={}, expected={}",
        domain, actual, expected
    );
}

/// Asserts that every account matches a replay of its history
///
/// # Panics
///
/// Panics on the first domain whose live balance drifted
pub async fn assert_reconciled(engine: &LedgerEngine) {
    let reports = engine
        .reconciler
        .reconcile_all()
        .await
        .unwrap_or_else(|e| panic!("reconciliation failed: {}", e));
    for report in reports {
        assert!(
            report.is_consistent,
            "{} drifted: live={}, recomputed={}, drift={}",
            report.domain, report.live_balance, report.recomputed_balance, report.drift
        );
    }
}

/// Asserts that each row's running balance follows from the previous one
///
/// # Panics
///
/// Panics at the first row whose balance does not equal the previous
/// balance plus deposit minus withdrawal, or if the last row disagrees with
/// the closing balance
pub fn assert_running_balance(statement: &AccountStatement) {
    let mut balance = statement.opening_balance;
    for (index, row) in statement.rows.iter().enumerate() {
        balance += row.deposit.unwrap_or_default() - row.withdraw.unwrap_or_default();
        assert_eq!(
            row.running_balance,
            balance.round_dp(2),
            "row {} ({}) breaks the running balance",
            index,
            row.number
        );
    }
    assert_eq!(
        statement.closing_balance,
        balance.round_dp(2),
        "closing balance does not follow from the rows"
    );
}

/// Asserts that each day closes on the previous close plus that day's net
///
/// # Panics
///
/// Panics at the first day that breaks the chain
pub fn assert_daily_chain(statement: &DailyStatement) {
    let mut balance = statement.opening_balance;
    for row in &statement.rows {
        balance += row.totals.net();
        assert_eq!(row.balance, balance, "day {} breaks the balance chain", row.date);
    }
    assert_eq!(statement.closing_balance, balance);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{LedgerScenario, PostingBuilder};
    use crate::fixtures::{DateFixtures, LedgerFixtures};
    use domain_ledger::FundMovement;
    use rust_decimal_macros::dec;

    async fn seeded() -> LedgerEngine {
        let engine = LedgerFixtures::clinic_engine();
        LedgerScenario::new()
            .income(Domain::Optics, PostingBuilder::new().with_category("Glasses Sale").build())
            .expense(
                Domain::Optics,
                PostingBuilder::new()
                    .with_category("Salary")
                    .with_amount(dec!(120.50))
                    .on(DateFixtures::day(12))
                    .build(),
            )
            .fund_out(Domain::Optics, FundMovement::new(dec!(40), "petty cash").dated(DateFixtures::day(12)))
            .run(&engine)
            .await
            .unwrap();
        engine
    }

    #[tokio::test]
    async fn test_assertions_accept_consistent_ledger() {
        let engine = seeded().await;
        assert_balance(&engine, Domain::Optics, dec!(1139.50)).await;
        assert_reconciled(&engine).await;

        let (from, to) = (DateFixtures::month_start(), DateFixtures::month_end());
        let statement = engine.statements.account_statement(Domain::Optics, from, to).await.unwrap();
        assert_running_balance(&statement);
        let daily = engine.statements.daily_statement(Domain::Optics, from, to).await.unwrap();
        assert_daily_chain(&daily);
    }

    #[tokio::test]
    #[should_panic(expected = "optics balance mismatch")]
    async fn test_assert_balance_reports_mismatch() {
        let engine = seeded().await;
        assert_balance(&engine, Domain::Optics, dec!(0)).await;
    }
}
