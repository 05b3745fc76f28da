//! Ledger engine settings

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use core_kernel::Timezone;

use crate::account::Domain;
use crate::category::CategoryTaxonomy;
use crate::error::LedgerError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Base balance each account starts from; missing domains start at zero
    #[serde(default)]
    pub opening_balances: BTreeMap<Domain, Decimal>,
    #[serde(default)]
    pub taxonomy: CategoryTaxonomy,
    /// Zone whose calendar decides the default business date
    #[serde(default)]
    pub timezone: Timezone,
    /// Longest range a daily statement may cover, one row per day
    #[serde(default = "default_max_statement_days")]
    pub max_statement_days: u32,
}

fn default_max_statement_days() -> u32 {
    36_600
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            opening_balances: BTreeMap::new(),
            taxonomy: CategoryTaxonomy::clinic_default(),
            timezone: Timezone::default(),
            max_statement_days: default_max_statement_days(),
        }
    }
}

impl LedgerConfig {
    pub fn with_opening_balance(mut self, domain: Domain, base: Decimal) -> Self {
        self.opening_balances.insert(domain, base);
        self
    }

    pub fn with_timezone(mut self, timezone: Timezone) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn opening_balance(&self, domain: Domain) -> Decimal {
        self.opening_balances.get(&domain).copied().unwrap_or(Decimal::ZERO)
    }

    /// Business date postings default to
    pub fn today(&self) -> NaiveDate {
        self.timezone.today()
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.max_statement_days == 0 {
            return Err(LedgerError::validation("max_statement_days must be at least 1"));
        }
        self.taxonomy.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_base_is_zero() {
        let config = LedgerConfig::default().with_opening_balance(Domain::Hospital, dec!(1000));
        assert_eq!(config.opening_balance(Domain::Hospital), dec!(1000));
        assert_eq!(config.opening_balance(Domain::Optics), Decimal::ZERO);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(LedgerConfig::default().validate().is_ok());
        let config = LedgerConfig { max_statement_days: 0, ..LedgerConfig::default() };
        assert!(config.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_deserializes_with_domain_keys() {
        let config: LedgerConfig = serde_json::from_value(serde_json::json!({
            "opening_balances": { "main": "250.50", "medicine": "10" },
            "timezone": "Asia/Dhaka"
        }))
        .unwrap();
        assert_eq!(config.opening_balance(Domain::Main), dec!(250.50));
        assert_eq!(config.opening_balance(Domain::Medicine), dec!(10));
        assert_eq!(config.taxonomy, CategoryTaxonomy::clinic_default());
        assert_eq!(config.max_statement_days, 36_600);
    }
}
