//! Request and response types for the credit facade
//!
//! Requests carry `validator` rules for the free-text and key fields;
//! amount rules that depend on account state stay in the engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use core_kernel::{AgentId, ApplicationId, ApplicationNo, BookingId, TransactionNo};
use domain_credit::{
    ApplicationStatus, CreditAccountView, DateRange, LedgerReceipt, PageRequest, PaymentCheck,
    TransactionType,
};

fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("positive_amount"))
    }
}

fn transaction_key(value: &str) -> Result<(), ValidationError> {
    TransactionNo::parse(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("transaction_no"))
}

/// One-based paging parameters; absent values fall back to the policy
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl From<PageParams> for PageRequest {
    fn from(params: PageParams) -> Self {
        PageRequest::new(params.page.unwrap_or(1), params.page_size.unwrap_or(0))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PayWithCreditRequest {
    pub agent_id: AgentId,
    pub booking_id: BookingId,
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    /// Idempotency key supplied by the booking system
    #[validate(custom(function = "transaction_key"))]
    pub transaction_no: Option<String>,
    #[serde(default)]
    pub allow_overdraft: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckPaymentRequest {
    pub agent_id: AgentId,
    pub booking_id: BookingId,
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RepayRequest {
    pub agent_id: AgentId,
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    #[validate(custom(function = "transaction_key"))]
    pub transaction_no: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TopupRequest {
    pub agent_id: AgentId,
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    /// Application the top-up settles, if any
    pub application_id: Option<ApplicationId>,
    /// Idempotency key; application-linked top-ups are keyed by the application
    #[validate(custom(function = "transaction_key"))]
    pub transaction_no: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApplyCreditLimitRequest {
    pub agent_id: AgentId,
    #[validate(custom(function = "positive_amount"))]
    pub requested_amount: Decimal,
    #[validate(length(min = 1, max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProcessApplicationRequest {
    pub application_id: ApplicationId,
    pub approved: bool,
    #[validate(custom(function = "positive_amount"))]
    pub approved_amount: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAccountRequest {
    pub agent_id: AgentId,
    pub initial_limit: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionListRequest {
    pub agent_id: AgentId,
    pub transaction_type: Option<TransactionType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paging: PageParams,
}

impl TransactionListRequest {
    pub fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            transaction_type: None,
            from: None,
            to: None,
            paging: PageParams::default(),
        }
    }

    pub fn range(&self) -> DateRange {
        DateRange::new(self.from, self.to)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationListRequest {
    pub agent_id: Option<AgentId>,
    pub status: Option<ApplicationStatus>,
    #[serde(default)]
    pub paging: PageParams,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AuditListRequest {
    pub agent_id: Option<AgentId>,
    #[validate(length(min = 1, max = 64))]
    pub operation: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paging: PageParams,
}

impl AuditListRequest {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.from, self.to)
    }
}

/// Result of `pay_with_credit`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentResult {
    pub transaction_no: TransactionNo,
    pub booking_id: Option<BookingId>,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub available_credit: Decimal,
    pub used_credit: Decimal,
    pub overdraft_count: i32,
    pub replayed: bool,
}

impl From<LedgerReceipt> for PaymentResult {
    fn from(receipt: LedgerReceipt) -> Self {
        Self {
            transaction_no: receipt.transaction.transaction_no,
            booking_id: receipt.transaction.booking_id,
            amount: receipt.transaction.amount,
            balance_before: receipt.transaction.balance_before,
            balance_after: receipt.transaction.balance_after,
            available_credit: receipt.account.available_credit,
            used_credit: receipt.account.used_credit,
            overdraft_count: receipt.account.overdraft_count,
            replayed: receipt.replayed,
        }
    }
}

/// Result of `check_credit_payment`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub booking_id: BookingId,
    #[serde(flatten)]
    pub check: PaymentCheck,
}

/// Result of `repay_credit`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepaymentResult {
    pub transaction_no: TransactionNo,
    pub amount: Decimal,
    pub used_credit: Decimal,
    pub available_credit: Decimal,
    pub deposit_balance: Decimal,
    pub replayed: bool,
}

impl From<LedgerReceipt> for RepaymentResult {
    fn from(receipt: LedgerReceipt) -> Self {
        Self {
            transaction_no: receipt.transaction.transaction_no,
            amount: receipt.transaction.amount,
            used_credit: receipt.account.used_credit,
            available_credit: receipt.account.available_credit,
            deposit_balance: receipt.account.deposit_balance,
            replayed: receipt.replayed,
        }
    }
}

/// Result of `topup_credit`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopupResult {
    pub transaction_no: TransactionNo,
    pub amount: Decimal,
    pub application_no: Option<ApplicationNo>,
    pub account: CreditAccountView,
    pub replayed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payment_request_rules() {
        let mut request = PayWithCreditRequest {
            agent_id: AgentId::new(1),
            booking_id: BookingId::new(2),
            amount: dec!(10),
            transaction_no: Some("BKG-2-1".to_string()),
            allow_overdraft: false,
        };
        assert!(request.validate().is_ok());

        request.amount = dec!(0);
        assert!(request.validate().is_err());

        request.amount = dec!(10);
        request.transaction_no = Some("not a key!".to_string());
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("transaction_no"));
    }

    #[test]
    fn test_repay_note_length_limit() {
        let request = RepayRequest {
            agent_id: AgentId::new(1),
            amount: dec!(5),
            note: Some("x".repeat(501)),
            transaction_no: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_page_params_default_to_policy_size() {
        let request: PageRequest = PageParams::default().into();
        assert_eq!(request, PageRequest::new(1, 0));
    }
}
