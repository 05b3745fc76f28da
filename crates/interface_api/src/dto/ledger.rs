//! Ledger DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::TransactionId;
use domain_ledger::{
    Domain, FundMovement, NewPosting, Transaction, TransactionUpdate, Voucher, VoucherPosting,
    VoucherType,
};

/// Income or expense posting, optionally merged into Main
#[derive(Debug, Deserialize)]
pub struct PostingRequest {
    #[serde(flatten)]
    pub posting: NewPosting,
    #[serde(default)]
    pub voucher: Option<VoucherOptions>,
}

#[derive(Debug, Deserialize)]
pub struct VoucherOptions {
    /// Merge key component, e.g. `medical_test`
    pub source_transaction_type: String,
}

#[derive(Debug, Serialize)]
pub struct PostingResponse {
    pub transaction: Transaction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voucher: Option<Voucher>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTransactionRequest {
    pub amount: Decimal,
    pub category: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
}

impl From<UpdateTransactionRequest> for TransactionUpdate {
    fn from(request: UpdateTransactionRequest) -> Self {
        let mut update = TransactionUpdate::amount(request.amount);
        if let Some(category) = request.category {
            update = update.with_category(category);
        }
        if let Some(description) = request.description {
            update = update.with_description(description);
        }
        if let Some(category_id) = request.category_id {
            update = update.with_category_id(category_id);
        }
        update
    }
}

#[derive(Debug, Deserialize)]
pub struct ReverseRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundDirection {
    In,
    Out,
}

#[derive(Debug, Deserialize)]
pub struct FundRequest {
    pub direction: FundDirection,
    #[serde(flatten)]
    pub movement: FundMovement,
}

/// Direct call into the Main merge routine
#[derive(Debug, Deserialize)]
pub struct VoucherRequest {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub voucher_type: VoucherType,
    pub source_account: Domain,
    pub source_transaction_type: String,
    pub description: String,
    pub source_voucher_no: Option<String>,
    pub source_reference_id: Option<Uuid>,
}

impl VoucherRequest {
    pub fn into_posting(self, created_by: Option<String>) -> VoucherPosting {
        let mut posting = VoucherPosting::new(
            self.date,
            self.amount,
            self.voucher_type,
            self.source_account,
            self.source_transaction_type,
            self.description,
        );
        if let (Some(voucher_no), Some(reference)) = (self.source_voucher_no, self.source_reference_id) {
            posting = posting.with_source(voucher_no, TransactionId::from(reference));
        }
        if let Some(user) = created_by {
            posting = posting.created_by(user);
        }
        posting
    }
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub domain: Domain,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementFormat {
    #[default]
    Json,
    Csv,
}

/// `?from=&to=` with an optional `format`
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(default)]
    pub format: StatementFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_posting_request_flattens_posting() {
        let request: PostingRequest = serde_json::from_value(serde_json::json!({
            "amount": "500.00",
            "category": "Medical Test",
            "description": "Group G1",
            "date": "2024-03-10",
            "voucher": { "source_transaction_type": "medical_test" }
        }))
        .unwrap();
        assert_eq!(request.posting.amount, dec!(500.00));
        assert_eq!(request.posting.date, NaiveDate::from_ymd_opt(2024, 3, 10));
        assert_eq!(request.voucher.unwrap().source_transaction_type, "medical_test");
    }

    #[test]
    fn test_fund_request_direction() {
        let request: FundRequest = serde_json::from_value(serde_json::json!({
            "direction": "out",
            "amount": "25",
            "purpose": "petty cash"
        }))
        .unwrap();
        assert_eq!(request.direction, FundDirection::Out);
        assert_eq!(request.movement.purpose, "petty cash");
    }

    #[test]
    fn test_update_request_keeps_overrides() {
        let update: TransactionUpdate = UpdateTransactionRequest {
            amount: dec!(600),
            category: None,
            description: Some("corrected".into()),
            category_id: None,
        }
        .into();
        assert_eq!(update.amount, dec!(600));
        assert_eq!(update.description.as_deref(), Some("corrected"));
        assert!(update.category.is_none());
    }
}
