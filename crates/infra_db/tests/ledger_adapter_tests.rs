//! PostgreSQL adapter tests
//!
//! These start a PostgreSQL container and are ignored by default:
//! `cargo test -p infra_db -- --ignored`

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::VendorTransactionId;
use domain_ledger::{
    Domain, FundMovement, LedgerConfig, LedgerEngine, LedgerError, LedgerStore, NewPosting, Purchase,
    TransactionUpdate, VendorPayment, VoucherPosting, VoucherType,
};
use infra_db::PostgresLedgerAdapter;
use test_utils::create_isolated_test_database;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

async fn engine(pool: &sqlx::PgPool) -> LedgerEngine {
    let store = Arc::new(PostgresLedgerAdapter::new(pool.clone()));
    LedgerEngine::new(store, LedgerConfig::default()).unwrap()
}

// ============================================================================
// Posting Tests
// ============================================================================

mod posting_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_merge_and_update_round_trip_through_postgres() {
        let db = create_isolated_test_database().await.unwrap();
        let engine = engine(db.pool()).await;

        let (first, _) = engine
            .postings
            .post_income_with_voucher(
                Domain::Hospital,
                NewPosting::new(dec!(500), "Medical Test", "Group G1").dated(day(10)),
                "income",
            )
            .await
            .unwrap();
        let (second, voucher) = engine
            .postings
            .post_income_with_voucher(
                Domain::Hospital,
                NewPosting::new(dec!(300), "Medical Test", "Group G2").dated(day(10)),
                "income",
            )
            .await
            .unwrap();
        assert_eq!(voucher.amount, dec!(800));

        let stored = engine.postings.voucher(voucher.id).await.unwrap();
        assert_eq!(stored.voucher_no, "01");
        assert_eq!(stored.linked_transactions, vec![first.id, second.id]);
        assert_eq!(stored.narration, "Hospital - Income: Group G1 + Group G2");

        engine
            .postings
            .update_income(first.id, TransactionUpdate::amount(dec!(600)))
            .await
            .unwrap();
        assert_eq!(engine.postings.get_balance(Domain::Hospital).await.unwrap(), dec!(900));
        assert_eq!(engine.postings.get_balance(Domain::Main).await.unwrap(), dec!(900));
        assert_eq!(engine.postings.voucher(voucher.id).await.unwrap().amount, dec!(900));

        for report in engine.reconciler.reconcile_all().await.unwrap() {
            assert!(report.is_consistent, "{:?}", report);
        }
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_fund_withdrawal_is_checked_under_lock() {
        let db = create_isolated_test_database().await.unwrap();
        let engine = engine(db.pool()).await;

        engine
            .postings
            .add_fund(Domain::Optics, FundMovement::new(dec!(100), "float").dated(day(1)))
            .await
            .unwrap();
        let err = engine
            .postings
            .withdraw_fund(Domain::Optics, FundMovement::new(dec!(150), "too much"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

        let history = engine.store().history(Domain::Optics, None).await.unwrap();
        assert_eq!(history.fund_transactions.len(), 1);
        assert_eq!(history.fund_transactions[0].voucher_no, "FV-OPT-0001");
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_concurrent_merges_share_one_voucher() {
        let db = create_isolated_test_database().await.unwrap();
        let engine = engine(db.pool()).await;

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..10 {
            let postings = engine.postings.clone();
            tasks.spawn(async move {
                postings
                    .update_main_account_voucher(VoucherPosting::new(
                        day(12),
                        dec!(15),
                        VoucherType::Debit,
                        Domain::Medicine,
                        "medicine_purchase",
                        format!("order {}", i),
                    ))
                    .await
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        let vouchers = engine.store().history(Domain::Main, None).await.unwrap().vouchers;
        assert_eq!(vouchers.len(), 1);
        assert_eq!(vouchers[0].amount, dec!(150));
        assert_eq!(engine.postings.get_balance(Domain::Main).await.unwrap(), dec!(-150));
    }
}

// ============================================================================
// Vendor Tests
// ============================================================================

mod vendor_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_failed_allocation_rolls_back_database_transaction() {
        let db = create_isolated_test_database().await.unwrap();
        let engine = engine(db.pool()).await;

        let vendor = engine.vendors.register_vendor("Acme Pharma", Some(dec!(5000))).await.unwrap();
        let purchase = engine
            .vendors
            .record_purchase(vendor.id, Purchase::new(dec!(400), "batch").dated(day(2)))
            .await
            .unwrap()
            .purchase;

        let err = engine
            .vendors
            .record_payment(
                vendor.id,
                VendorPayment::new(dec!(300), "settlement")
                    .allocate(purchase.id, dec!(200))
                    .allocate(VendorTransactionId::new(), dec!(100))
                    .pay_from(Domain::Medicine),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::PurchaseNotFound(_)));

        let rows = engine.vendors.vendor_transactions(vendor.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].outstanding, dec!(400));
        assert_eq!(engine.vendors.vendor(vendor.id).await.unwrap().net_due(), dec!(400));
        assert_eq!(engine.postings.get_balance(Domain::Medicine).await.unwrap(), dec!(0));
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_payment_allocations_are_persisted() {
        let db = create_isolated_test_database().await.unwrap();
        let engine = engine(db.pool()).await;

        let vendor = engine.vendors.register_vendor("Lens Co", None).await.unwrap();
        let purchase = engine
            .vendors
            .record_purchase(vendor.id, Purchase::new(dec!(250), "lenses").dated(day(3)))
            .await
            .unwrap()
            .purchase;
        let outcome = engine
            .vendors
            .record_payment(
                vendor.id,
                VendorPayment::new(dec!(100), "part").allocate(purchase.id, dec!(100)).dated(day(4)),
            )
            .await
            .unwrap();

        let rows = engine.vendors.vendor_transactions(vendor.id).await.unwrap();
        let payment = rows.iter().find(|r| r.id == outcome.payment.id).unwrap();
        assert_eq!(payment.allocations.len(), 1);
        assert_eq!(payment.allocations[0].purchase_id, purchase.id);
        let stored = rows.iter().find(|r| r.id == purchase.id).unwrap();
        assert_eq!(stored.outstanding, dec!(150));
    }
}
