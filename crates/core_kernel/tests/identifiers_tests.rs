//! Unit tests for the Identifiers module
//!
//! Covers numeric keys from the surrounding system and the business
//! numbers generated by the ledger.

use core_kernel::{AgentId, ApplicationId, ApplicationNo, BookingId, TransactionNo};
use proptest::prelude::*;

mod agent_id_tests {
    use super::*;

    #[test]
    fn test_prefix() {
        assert_eq!(AgentId::prefix(), "AGT");
        assert_eq!(BookingId::prefix(), "BKG");
        assert_eq!(ApplicationId::prefix(), "APP");
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        let original = AgentId::new(1024);
        let parsed: AgentId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_i64_conversion() {
        let id = BookingId::from(77);
        let back: i64 = id.into();
        assert_eq!(back, 77);
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&AgentId::new(5)).unwrap();
        assert_eq!(json, "5");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("AGT-".parse::<AgentId>().is_err());
        assert!("abc".parse::<ApplicationId>().is_err());
    }
}

mod business_number_tests {
    use super::*;

    #[test]
    fn test_generated_prefixes() {
        assert!(TransactionNo::generate().as_str().starts_with("CT"));
        assert!(ApplicationNo::generate().as_str().starts_with("CA"));
    }

    #[test]
    fn test_generated_numbers_are_time_ordered() {
        let first = TransactionNo::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = TransactionNo::generate();
        assert!(first < second);
    }

    #[test]
    fn test_caller_supplied_number_is_accepted() {
        let number = TransactionNo::parse("booking-42_retry").unwrap();
        assert_eq!(number.as_str(), "booking-42_retry");
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        assert!(TransactionNo::parse("").is_err());
        assert!(TransactionNo::parse("has space").is_err());
        assert!(TransactionNo::parse("x".repeat(65)).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<TransactionNo, _> = serde_json::from_str("\"CT123\"");
        assert!(ok.is_ok());
        let bad: Result<TransactionNo, _> = serde_json::from_str("\"a b\"");
        assert!(bad.is_err());
    }
}

proptest! {
    #[test]
    fn prop_agent_id_parses_its_display(value in any::<i64>()) {
        let id = AgentId::new(value);
        let parsed: AgentId = id.to_string().parse().unwrap();
        prop_assert_eq!(id, parsed);
    }
}
