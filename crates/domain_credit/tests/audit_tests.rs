//! Tests for the fire-and-forget audit logger

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use core_kernel::{AgentId, DomainPort, PortError};
use domain_credit::memory::InMemoryAuditLog;
use domain_credit::{
    AuditLogPort, AuditLogger, AuditQuery, AuditStatus, CreditError, NewPaymentAuditLog, Page,
    PageRequest, PaymentAuditLog, RequestContext,
};

struct BrokenSink;

impl DomainPort for BrokenSink {}

#[async_trait]
impl AuditLogPort for BrokenSink {
    async fn insert_audit_log(&self, _record: NewPaymentAuditLog) -> Result<PaymentAuditLog, PortError> {
        Err(PortError::unavailable("audit store unreachable"))
    }

    async fn list_audit_logs(&self, _query: &AuditQuery) -> Result<Page<PaymentAuditLog>, PortError> {
        Err(PortError::unavailable("audit store unreachable"))
    }
}

async fn wait_for_records(sink: &InMemoryAuditLog, count: usize) -> Vec<PaymentAuditLog> {
    for _ in 0..50 {
        let records = sink.records().await;
        if records.len() >= count {
            return records;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    sink.records().await
}

#[tokio::test]
async fn test_successful_call_is_recorded() {
    let sink = Arc::new(InMemoryAuditLog::new());
    let logger = AuditLogger::new(sink.clone(), 500);
    let agent = AgentId::new(3);
    let ctx = RequestContext::agent(agent).with_http(
        Some("10.1.1.1".into()),
        Some("Mozilla/5.0".into()),
        Some("/credit/pay".into()),
        None,
    );

    let value: Result<u32, CreditError> = logger
        .audited(&ctx, "pay_with_credit", Some(agent), json!({"amount": "300"}), async { Ok(42) })
        .await;
    assert_eq!(value.unwrap(), 42);

    let records = wait_for_records(&sink, 1).await;
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.operation, "pay_with_credit");
    assert_eq!(record.status, AuditStatus::Success);
    assert_eq!(record.result, Some(json!(42)));
    assert_eq!(record.parameters, json!({"amount": "300"}));
    assert_eq!(record.agent_id, Some(agent));
    assert_eq!(record.ip_address.as_deref(), Some("10.1.1.1"));
    assert!(record.duration_ms >= 0);
}

#[tokio::test]
async fn test_failed_call_is_recorded_and_error_returned() {
    let sink = Arc::new(InMemoryAuditLog::new());
    let logger = AuditLogger::new(sink.clone(), 500);
    let ctx = RequestContext::system("batch");

    let outcome: Result<(), CreditError> = logger
        .audited(&ctx, "repay_credit", Some(AgentId::new(1)), json!({}), async {
            Err(CreditError::FrozenAccount(AgentId::new(1)))
        })
        .await;
    assert!(matches!(outcome, Err(CreditError::FrozenAccount(_))));

    let records = wait_for_records(&sink, 1).await;
    assert_eq!(records[0].status, AuditStatus::Error);
    assert!(records[0].error_message.as_deref().unwrap_or_default().contains("frozen"));
    assert!(records[0].result.is_none());
}

#[tokio::test]
async fn test_sink_failure_never_reaches_caller() {
    let logger = AuditLogger::new(Arc::new(BrokenSink), 500);
    let ctx = RequestContext::system("batch");

    let value: Result<&str, CreditError> = logger
        .audited(&ctx, "get_credit_info", None, json!({}), async { Ok("fine") })
        .await;
    assert_eq!(value.unwrap(), "fine");

    let record = NewPaymentAuditLog::capture(&ctx, "health", None, json!({}), None, None, 0, 500);
    let handle = logger.dispatch(record).expect("runtime present");
    assert!(handle.await.is_ok());
}

#[tokio::test]
async fn test_long_http_fields_are_truncated() {
    let sink = Arc::new(InMemoryAuditLog::new());
    let logger = AuditLogger::new(sink.clone(), 500);
    let ctx = RequestContext::agent(AgentId::new(8)).with_http(
        None,
        Some("UA".repeat(400)),
        Some(format!("/credit/transactions?{}", "q=1&".repeat(300))),
        Some("r".repeat(1200)),
    );

    let _: Result<(), CreditError> = logger
        .audited(&ctx, "list_transactions", None, json!({}), async { Ok(()) })
        .await;

    let records = wait_for_records(&sink, 1).await;
    let record = &records[0];
    assert_eq!(record.user_agent.as_ref().map(|v| v.len()), Some(500));
    assert_eq!(record.request_url.as_ref().map(|v| v.len()), Some(500));
    assert_eq!(record.referer.as_ref().map(|v| v.len()), Some(500));
}

#[tokio::test]
async fn test_audit_listing_is_newest_first() {
    let sink = Arc::new(InMemoryAuditLog::new());
    let logger = AuditLogger::new(sink.clone(), 500);
    let agent = AgentId::new(2);
    let ctx = RequestContext::agent(agent);

    for op in ["check_credit_payment", "pay_with_credit"] {
        let _: Result<(), CreditError> = logger.audited(&ctx, op, Some(agent), json!({}), async { Ok(()) }).await;
        wait_for_records(&sink, 1).await;
    }
    wait_for_records(&sink, 2).await;

    let page = sink
        .list_audit_logs(&AuditQuery {
            agent_id: Some(agent),
            operation: None,
            page: PageRequest::first(10),
            ..AuditQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].operation, "pay_with_credit");
}
