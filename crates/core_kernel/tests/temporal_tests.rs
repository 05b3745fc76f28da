//! Tests for business-date ranges and timezones

use chrono::NaiveDate;
use core_kernel::{DateRange, TemporalError, Timezone};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

mod date_range {
    use super::*;

    #[test]
    fn test_single_day_range_has_one_day() {
        let range = DateRange::single(date(2024, 1, 15));
        assert_eq!(range.days().collect::<Vec<_>>(), vec![date(2024, 1, 15)]);
        assert_eq!(range.len_days(), 1);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert!(range.contains(date(2024, 1, 1)));
        assert!(range.contains(date(2024, 1, 31)));
        assert!(!range.contains(date(2024, 2, 1)));
        assert!(!range.contains(date(2023, 12, 31)));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let result = DateRange::new(date(2024, 1, 2), date(2024, 1, 1));
        assert_eq!(
            result,
            Err(TemporalError::InvalidRange { from: date(2024, 1, 2), to: date(2024, 1, 1) })
        );
    }

    #[test]
    fn test_leap_year_february() {
        let range = DateRange::new(date(2024, 2, 1), date(2024, 2, 29)).unwrap();
        assert_eq!(range.days().count(), 29);
    }
}

mod timezone {
    use super::*;

    #[test]
    fn test_default_is_utc() {
        let tz = Timezone::default();
        let instant = date(2024, 6, 1).and_hms_opt(23, 30, 0).unwrap().and_utc();
        assert_eq!(tz.date_of(instant), date(2024, 6, 1));
    }

    #[test]
    fn test_serde_round_trip_by_name() {
        let tz: Timezone = serde_json::from_str("\"Asia/Dhaka\"").unwrap();
        assert_eq!(serde_json::to_string(&tz).unwrap(), "\"Asia/Dhaka\"");
    }
}
