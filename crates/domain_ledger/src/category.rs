//! Category taxonomy for statement buckets
//!
//! Free-text categories on transactions (and source transaction types on
//! Main vouchers) are sorted into a fixed list of labelled columns per side.
//! Anything unmatched lands in the side's catch-all column.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::LedgerError;
use crate::transaction::TransactionType;
use crate::voucher::VoucherType;

/// Statement side a bucket belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Credit,
    Debit,
}

impl From<TransactionType> for Side {
    fn from(value: TransactionType) -> Self {
        match value {
            TransactionType::Income => Side::Credit,
            TransactionType::Expense => Side::Debit,
        }
    }
}

impl From<VoucherType> for Side {
    fn from(value: VoucherType) -> Self {
        match value {
            VoucherType::Credit => Side::Credit,
            VoucherType::Debit => Side::Debit,
        }
    }
}

/// One labelled statement column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBucket {
    pub label: String,
    pub side: Side,
    /// Category names absorbed by this bucket, besides the label itself
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl CategoryBucket {
    pub fn new(label: impl Into<String>, side: Side, aliases: &[&str]) -> Self {
        Self {
            label: label.into(),
            side,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn absorbs(&self, normalized: &str) -> bool {
        normalize(&self.label) == normalized || self.aliases.iter().any(|a| normalize(a) == normalized)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTaxonomy {
    pub buckets: Vec<CategoryBucket>,
    pub credit_catch_all: String,
    pub debit_catch_all: String,
}

impl CategoryTaxonomy {
    /// The clinic's standard statement layout
    pub fn clinic_default() -> Self {
        Self {
            buckets: vec![
                CategoryBucket::new("Medicine Income", Side::Credit, &["medicine_sale", "pharmacy_sale", "medicine"]),
                CategoryBucket::new("Optics Income", Side::Credit, &["optics_sale", "glasses_sale", "optics"]),
                CategoryBucket::new("Medical Test", Side::Credit, &["medical_test", "lab_test", "test_booking", "diagnostic"]),
                CategoryBucket::new("OPD Income", Side::Credit, &["opd", "consultation", "opd_fee"]),
                CategoryBucket::new("Operation Income", Side::Credit, &["operation", "surgery", "operation_booking"]),
                CategoryBucket::new("Medicine Purchase", Side::Debit, &["medicine_purchase", "pharmacy_purchase"]),
                CategoryBucket::new("Optics Purchase", Side::Debit, &["optics_purchase", "lens_purchase", "frame_purchase"]),
                CategoryBucket::new("Salary", Side::Debit, &["salaries", "wages", "payroll"]),
                CategoryBucket::new("Utility", Side::Debit, &["utilities", "electricity", "water", "internet"]),
                CategoryBucket::new("Vendor Payment", Side::Debit, &["vendor_purchase", "supplier_payment"]),
            ],
            credit_catch_all: "Other Income".to_string(),
            debit_catch_all: "Other Expenses".to_string(),
        }
    }

    /// Rejects names claimed by two buckets of one side and labels that
    /// shadow the side's catch-all column
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.credit_catch_all.trim().is_empty() || self.debit_catch_all.trim().is_empty() {
            return Err(LedgerError::validation("catch-all labels must not be empty"));
        }
        let mut owners: HashMap<(Side, String), usize> = HashMap::new();
        for (index, bucket) in self.buckets.iter().enumerate() {
            if normalize(&bucket.label) == normalize(self.catch_all(bucket.side)) {
                return Err(LedgerError::validation(format!(
                    "bucket '{}' collides with the {:?} catch-all",
                    bucket.label, bucket.side
                )));
            }
            for name in std::iter::once(&bucket.label).chain(bucket.aliases.iter()) {
                let owner = *owners.entry((bucket.side, normalize(name))).or_insert(index);
                if owner != index {
                    return Err(LedgerError::validation(format!(
                        "category '{}' is claimed twice on the {:?} side",
                        name, bucket.side
                    )));
                }
            }
        }
        Ok(())
    }

    /// Bucket labels of one side, catch-all last
    pub fn labels(&self, side: Side) -> Vec<String> {
        self.buckets
            .iter()
            .filter(|b| b.side == side)
            .map(|b| b.label.clone())
            .chain(std::iter::once(self.catch_all(side).to_string()))
            .collect()
    }

    pub fn catch_all(&self, side: Side) -> &str {
        match side {
            Side::Credit => &self.credit_catch_all,
            Side::Debit => &self.debit_catch_all,
        }
    }

    /// Label of the column `category` is counted in
    pub fn classify(&self, side: Side, category: &str) -> &str {
        let normalized = normalize(category);
        self.buckets
            .iter()
            .find(|b| b.side == side && b.absorbs(&normalized))
            .map(|b| b.label.as_str())
            .unwrap_or_else(|| self.catch_all(side))
    }
}

impl Default for CategoryTaxonomy {
    fn default() -> Self {
        Self::clinic_default()
    }
}

/// Case, underscore, hyphen and whitespace insensitive form
pub fn normalize(category: &str) -> String {
    category
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_matches_labels_and_aliases() {
        let taxonomy = CategoryTaxonomy::clinic_default();
        assert_eq!(taxonomy.classify(Side::Credit, "medical_test"), "Medical Test");
        assert_eq!(taxonomy.classify(Side::Credit, "OPD  income"), "OPD Income");
        assert_eq!(taxonomy.classify(Side::Debit, "SALARY"), "Salary");
        assert_eq!(taxonomy.classify(Side::Debit, "vendor-purchase"), "Vendor Payment");
    }

    #[test]
    fn test_unmatched_goes_to_catch_all_of_its_side() {
        let taxonomy = CategoryTaxonomy::clinic_default();
        assert_eq!(taxonomy.classify(Side::Credit, "donation"), "Other Income");
        // a debit label never absorbs a credit posting
        assert_eq!(taxonomy.classify(Side::Credit, "Salary"), "Other Income");
        assert_eq!(taxonomy.classify(Side::Debit, "repairs"), "Other Expenses");
    }

    #[test]
    fn test_labels_order() {
        let labels = CategoryTaxonomy::clinic_default().labels(Side::Credit);
        assert_eq!(
            labels,
            vec!["Medicine Income", "Optics Income", "Medical Test", "OPD Income", "Operation Income", "Other Income"]
        );
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut taxonomy = CategoryTaxonomy::clinic_default();
        assert!(taxonomy.validate().is_ok());
        taxonomy.buckets.push(CategoryBucket::new("Lab", Side::Credit, &["Lab-Test"]));
        assert!(taxonomy.validate().is_err());
    }

    #[test]
    fn test_alias_repeating_its_own_label_is_allowed() {
        let taxonomy = CategoryTaxonomy {
            buckets: vec![CategoryBucket::new("Medical Test", Side::Credit, &["medical_test", "MEDICAL-TEST"])],
            ..CategoryTaxonomy::clinic_default()
        };
        assert!(taxonomy.validate().is_ok());
    }

    #[test]
    fn test_same_name_on_both_sides_is_allowed() {
        let mut taxonomy = CategoryTaxonomy::clinic_default();
        taxonomy.buckets.push(CategoryBucket::new("Refunds", Side::Credit, &[]));
        taxonomy.buckets.push(CategoryBucket::new("Refunds", Side::Debit, &[]));
        assert!(taxonomy.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bucket_shadowing_catch_all() {
        let mut taxonomy = CategoryTaxonomy::clinic_default();
        taxonomy.buckets.push(CategoryBucket::new("other_income", Side::Credit, &[]));
        let err = taxonomy.validate().unwrap_err();
        assert!(err.to_string().contains("catch-all"));
    }
}
