//! Property-Based Test Generators
//!
//! Proptest strategies for ledger inputs, plus `fake` helpers for
//! free-text fields.

use chrono::{Duration, NaiveDate};
use fake::faker::company::en::CompanyName;
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use proptest::prelude::*;
use rust_decimal::Decimal;

use domain_ledger::{Domain, VoucherType};

use crate::fixtures::DateFixtures;

/// Strategy for positive money amounts with two decimal places
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for the four source domains (everything except Main)
pub fn source_domain_strategy() -> impl Strategy<Value = Domain> {
    prop_oneof![
        Just(Domain::Hospital),
        Just(Domain::Medicine),
        Just(Domain::Optics),
        Just(Domain::Operation),
    ]
}

pub fn voucher_type_strategy() -> impl Strategy<Value = VoucherType> {
    prop_oneof![Just(VoucherType::Credit), Just(VoucherType::Debit)]
}

/// Strategy for categories, mixing bucketed names with unknown ones
pub fn category_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Medical Test".to_string()),
        Just("OPD Income".to_string()),
        Just("Medicine Sale".to_string()),
        Just("Salary".to_string()),
        Just("Utility".to_string()),
        "[A-Z][a-z]{3,12}",
    ]
}

/// Strategy for dates within the fixture month
pub fn fixture_month_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..31).prop_map(|offset| DateFixtures::month_start() + Duration::days(offset))
}

/// Strategy for a signed sequence of postings: `true` is income
pub fn posting_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<(bool, Decimal)>> {
    prop::collection::vec((any::<bool>(), amount_strategy()), 1..max_len)
}

/// A plausible vendor name
pub fn fake_vendor_name() -> String {
    CompanyName().fake()
}

/// A short free-text description
pub fn fake_description() -> String {
    Sentence(2..6).fake()
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_amounts_are_positive_cents(amount in amount_strategy()) {
            prop_assert!(amount > Decimal::ZERO);
            prop_assert!(amount.scale() <= 2);
        }

        #[test]
        fn test_source_domains_exclude_main(domain in source_domain_strategy()) {
            prop_assert!(!domain.is_main());
        }

        #[test]
        fn test_dates_stay_in_fixture_month(date in fixture_month_date_strategy()) {
            prop_assert!(date >= DateFixtures::month_start());
            prop_assert!(date <= DateFixtures::month_end());
        }
    }

    #[test]
    fn test_fake_text_is_not_empty() {
        assert!(!fake_vendor_name().trim().is_empty());
        assert!(!fake_description().trim().is_empty());
    }
}
