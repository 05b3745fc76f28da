//! Pre-built Test Fixtures
//!
//! Fixed, predictable data for ledger tests. Dates sit in March 2024 so
//! statements over the fixture month never depend on the wall clock.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use domain_ledger::{Domain, InMemoryLedgerStore, LedgerConfig, LedgerEngine};

/// Configuration with an opening base on every domain ledger
pub static CLINIC_CONFIG: Lazy<LedgerConfig> = Lazy::new(|| {
    LedgerConfig::default()
        .with_opening_balance(Domain::Main, dec!(10000))
        .with_opening_balance(Domain::Hospital, dec!(2500))
        .with_opening_balance(Domain::Medicine, dec!(1500))
        .with_opening_balance(Domain::Optics, dec!(800))
        .with_opening_balance(Domain::Operation, dec!(0))
});

/// Fixture for business dates
pub struct DateFixtures;

impl DateFixtures {
    /// A day in March 2024
    pub fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    /// The business day most fixtures post on
    pub fn business_day() -> NaiveDate {
        Self::day(10)
    }

    pub fn month_start() -> NaiveDate {
        Self::day(1)
    }

    pub fn month_end() -> NaiveDate {
        Self::day(31)
    }

    /// Far enough back to sit before anything a test posts
    pub fn epoch() -> NaiveDate {
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
    }
}

/// Fixture for typical clinic amounts
pub struct AmountFixtures;

impl AmountFixtures {
    pub fn test_booking() -> Decimal {
        dec!(500.00)
    }

    pub fn opd_fee() -> Decimal {
        dec!(300.00)
    }

    pub fn medicine_sale() -> Decimal {
        dec!(1250.75)
    }

    pub fn salary() -> Decimal {
        dec!(4000.00)
    }

    pub fn utility_bill() -> Decimal {
        dec!(180.40)
    }
}

/// Fixture for categories and source types
pub struct StringFixtures;

impl StringFixtures {
    pub fn test_category() -> &'static str {
        "Medical Test"
    }

    pub fn opd_category() -> &'static str {
        "OPD Income"
    }

    pub fn salary_category() -> &'static str {
        "Salary"
    }

    /// Source type used when consolidating test bookings into Main
    pub fn test_source_type() -> &'static str {
        "medical_test"
    }

    pub fn vendor_name() -> &'static str {
        "Acme Pharma"
    }
}

/// Fixture for ready-to-use engines
pub struct LedgerFixtures;

impl LedgerFixtures {
    /// Engine on a fresh in-memory store with zero opening bases
    pub fn engine() -> LedgerEngine {
        Self::engine_with(LedgerConfig::default())
    }

    /// Engine on a fresh in-memory store with [`CLINIC_CONFIG`]
    pub fn clinic_engine() -> LedgerEngine {
        Self::engine_with(CLINIC_CONFIG.clone())
    }

    pub fn engine_with(config: LedgerConfig) -> LedgerEngine {
        LedgerEngine::new(Arc::new(InMemoryLedgerStore::new()), config)
            .expect("fixture configuration is valid")
    }

    /// Engine plus a handle on its store, for fault injection
    pub fn engine_and_store(config: LedgerConfig) -> (LedgerEngine, InMemoryLedgerStore) {
        let store = InMemoryLedgerStore::new();
        let engine = LedgerEngine::new(Arc::new(store.clone()), config).expect("fixture configuration is valid");
        (engine, store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clinic_config_bases() {
        assert_eq!(CLINIC_CONFIG.opening_balance(Domain::Hospital), dec!(2500));
        assert_eq!(CLINIC_CONFIG.opening_balance(Domain::Operation), dec!(0));
    }

    #[test]
    fn test_dates_are_in_fixture_month() {
        assert!(DateFixtures::month_start() <= DateFixtures::business_day());
        assert!(DateFixtures::business_day() <= DateFixtures::month_end());
    }
}
