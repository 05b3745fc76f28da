//! Tests for the decimal money helpers

use core_kernel::{checked_total, round_money, Direction, MoneyError, PositiveAmount};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod positive_amount {
    use super::*;

    #[test]
    fn test_accepts_smallest_unit() {
        let amount = PositiveAmount::new(dec!(0.01)).unwrap();
        assert_eq!(amount.value(), dec!(0.01));
        assert_eq!(amount.to_string(), "0.01");
    }

    #[test]
    fn test_rejects_zero() {
        assert!(matches!(PositiveAmount::new(Decimal::ZERO), Err(MoneyError::NonPositive(_))));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: PositiveAmount = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(ok.value(), dec!(12.50));
        assert!(serde_json::from_str::<PositiveAmount>("\"-1\"").is_err());
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_thousands_of_cent_postings_do_not_drift() {
        let postings = std::iter::repeat(dec!(0.10)).take(10_000);
        assert_eq!(checked_total(postings).unwrap(), dec!(1000.00));
    }

    #[test]
    fn test_round_money_on_running_balance() {
        assert_eq!(round_money(dec!(1333.3333)), dec!(1333.33));
        assert_eq!(round_money(dec!(0.125)), dec!(0.13));
    }

    #[test]
    fn test_direction_round_trip() {
        let amount = dec!(42);
        let net = Direction::Inflow.signed(amount) + Direction::Outflow.signed(amount);
        assert_eq!(net, Decimal::ZERO);
    }
}
