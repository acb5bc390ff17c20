//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::{require_positive, AgentId, TransactionNo};
use rust_decimal_macros::dec;

#[test]
fn test_core_error_validation() {
    let error = CoreError::validation("Invalid input");

    match error {
        CoreError::Validation(msg) => assert_eq!(msg, "Invalid input"),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_non_positive_amount_names_the_field() {
    let error = require_positive("requested_amount", dec!(-1)).unwrap_err();

    match &error {
        CoreError::NonPositiveAmount { field, value } => {
            assert_eq!(field, "requested_amount");
            assert_eq!(*value, dec!(-1));
        }
        other => panic!("Expected NonPositiveAmount, got {:?}", other),
    }
    assert!(error.to_string().contains("requested_amount"));
}

#[test]
fn test_sub_cent_amount_rounds_to_zero_and_is_rejected() {
    let error = require_positive("amount", dec!(0.004)).unwrap_err();
    assert!(matches!(error, CoreError::NonPositiveAmount { .. }));
}

#[test]
fn test_malformed_identifiers_report_their_kind() {
    let error = "AGT-x".parse::<AgentId>().unwrap_err();
    assert_eq!(error, CoreError::malformed("AgentId", "AGT-x"));

    let error = TransactionNo::parse("bad key!").unwrap_err();
    assert!(error.to_string().contains("malformed TransactionNo"));
}
