//! Business-date handling
//!
//! Ledger rows carry a business date (`NaiveDate`) that is independent of the
//! moment the row was written. Reports work on inclusive date ranges, and the
//! notion of "today" follows the clinic's local timezone rather than UTC.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid date range: {from} is after {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[error("Date range of {days} days exceeds the limit of {max_days}")]
    SpanTooLong { days: i64, max_days: u32 },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// Timezone wrapper used to derive the local business date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for Timezone {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s)
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(s.to_string()))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Business date of a UTC instant in this timezone
    pub fn date_of(&self, utc: DateTime<Utc>) -> NaiveDate {
        utc.with_timezone(&self.0).date_naive()
    }

    /// Current business date in this timezone
    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::UTC)
    }
}

/// An inclusive range of business dates
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use core_kernel::DateRange;
///
/// let from = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let to = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
/// let range = DateRange::new(from, to).unwrap();
/// assert_eq!(range.days().count(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `from > to`
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, TemporalError> {
        if from > to {
            return Err(TemporalError::InvalidRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// A single-day range
    pub fn single(day: NaiveDate) -> Self {
        Self { from: day, to: day }
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// Returns true if `date` falls inside the range (both ends inclusive)
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }

    /// Iterates every calendar day of the range in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let to = self.to;
        self.from.iter_days().take_while(move |day| *day <= to)
    }

    /// Number of calendar days in the range
    pub fn len_days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    /// Rejects a range longer than `max_days` calendar days
    pub fn limited_to(self, max_days: u32) -> Result<Self, TemporalError> {
        let days = self.len_days();
        if days > i64::from(max_days) {
            return Err(TemporalError::SpanTooLong { days, max_days });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        let result = DateRange::new(date(2024, 2, 2), date(2024, 2, 1));
        assert!(matches!(result, Err(TemporalError::InvalidRange { .. })));
    }

    #[test]
    fn test_range_days_cross_month_boundary() {
        let range = DateRange::new(date(2024, 2, 28), date(2024, 3, 1)).unwrap();
        let days: Vec<_> = range.days().collect();
        assert_eq!(days, vec![date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1)]);
        assert_eq!(range.len_days(), 3);
    }

    #[test]
    fn test_limited_to_caps_span() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert_eq!(range.limited_to(31), Ok(range));
        assert_eq!(range.limited_to(30), Err(TemporalError::SpanTooLong { days: 31, max_days: 30 }));
    }

    #[test]
    fn test_timezone_business_date() {
        let tz: Timezone = "Asia/Dhaka".parse().unwrap();
        let late_utc = date(2024, 5, 1).and_hms_opt(20, 0, 0).unwrap().and_utc();
        assert_eq!(tz.date_of(late_utc), date(2024, 5, 2));
        assert!("Mars/Olympus".parse::<Timezone>().is_err());
    }
}
