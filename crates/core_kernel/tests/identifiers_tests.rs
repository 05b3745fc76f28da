//! Tests for the strongly typed identifiers

use core_kernel::{FundTransactionId, TransactionId, VendorId, VendorTransactionId, VoucherId};
use std::collections::HashSet;
use uuid::Uuid;

mod transaction_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let ids: HashSet<TransactionId> = (0..100).map(|_| TransactionId::new()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = TransactionId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = TransactionId::new_v7();
        let uuid1: Uuid = id1.into();
        let uuid2: Uuid = id2.into();
        assert!(uuid1 < uuid2);
    }

    #[test]
    fn test_parse_with_and_without_prefix() {
        let uuid = Uuid::new_v4();
        let with_prefix: TransactionId = format!("TXN-{}", uuid).parse().unwrap();
        let bare: TransactionId = uuid.to_string().parse().unwrap();
        assert_eq!(with_prefix, bare);
        assert_eq!(*bare.as_uuid(), uuid);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("TXN-not-a-uuid".parse::<TransactionId>().is_err());
    }
}

mod prefixes {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert!(FundTransactionId::new().to_string().starts_with("FTX-"));
        assert!(VoucherId::new().to_string().starts_with("VCH-"));
        assert!(VendorId::new().to_string().starts_with("VND-"));
        assert!(VendorTransactionId::new().to_string().starts_with("VTX-"));
        assert_eq!(VoucherId::prefix(), "VCH");
    }

    #[test]
    fn test_serde_is_transparent() {
        let uuid = Uuid::new_v4();
        let id = VendorId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
    }
}
