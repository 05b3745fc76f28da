//! Vendor DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::VendorId;
use domain_ledger::{BalanceType, Vendor, VendorTransaction};

#[derive(Debug, Deserialize)]
pub struct RegisterVendorRequest {
    pub name: String,
    pub credit_limit: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct VendorResponse {
    pub id: VendorId,
    pub name: String,
    /// Signed; negative while the vendor holds an advance
    pub net_due: Decimal,
    pub current_balance: Decimal,
    pub balance_type: BalanceType,
    pub credit_limit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Vendor> for VendorResponse {
    fn from(vendor: Vendor) -> Self {
        Self {
            net_due: vendor.net_due(),
            current_balance: vendor.current_balance(),
            balance_type: vendor.balance_type(),
            id: vendor.id,
            name: vendor.name,
            credit_limit: vendor.credit_limit,
            created_at: vendor.created_at,
            updated_at: vendor.updated_at,
        }
    }
}

/// Vendor with its purchase and payment rows
#[derive(Debug, Serialize)]
pub struct VendorDetailResponse {
    #[serde(flatten)]
    pub vendor: VendorResponse,
    pub transactions: Vec<VendorTransaction>,
}

#[derive(Debug, Deserialize)]
pub struct AgingQuery {
    /// Defaults to today in the business timezone
    pub as_of: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_vendor_response_reports_advance() {
        let vendor = Vendor::restore(VendorId::new(), "Lens Co".into(), dec!(-40), None, Utc::now(), Utc::now());
        let response = VendorResponse::from(vendor);
        assert_eq!(response.net_due, dec!(-40));
        assert_eq!(response.current_balance, dec!(40));
        assert_eq!(response.balance_type, BalanceType::Advance);
    }
}
