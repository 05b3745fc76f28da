//! Tests for core_kernel error types

use chrono::NaiveDate;
use core_kernel::error::CoreError;
use core_kernel::money::MoneyError;
use core_kernel::temporal::TemporalError;
use rust_decimal_macros::dec;

#[test]
fn test_core_error_validation() {
    let error = CoreError::validation("Invalid input");

    match error {
        CoreError::Validation(msg) => assert_eq!(msg, "Invalid input"),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_core_error_not_found() {
    let error = CoreError::not_found("Voucher not found");
    assert!(matches!(error, CoreError::NotFound(ref msg) if msg == "Voucher not found"));
}

#[test]
fn test_core_error_from_money_error() {
    let core_error: CoreError = MoneyError::NonPositive(dec!(-5)).into();
    assert!(matches!(core_error, CoreError::Money(MoneyError::NonPositive(_))));
    assert!(core_error.to_string().contains("-5"));
}

#[test]
fn test_core_error_from_temporal_error() {
    let from = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    let to = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let core_error: CoreError = TemporalError::InvalidRange { from, to }.into();
    assert!(core_error.to_string().contains("2024-02-01"));
}
