//! PostgreSQL Payment Audit Adapter

use async_trait::async_trait;
use sqlx::PgPool;

use core_kernel::{AgentId, DomainPort, PortError};
use domain_credit::{AuditLogPort, AuditQuery, AuditStatus, CallerType, NewPaymentAuditLog, Page, PaymentAuditLog};

use crate::repositories::audit::{
    AuditFilter, AuditLogRow, AuditRepository, AuditStatus as DbAuditStatus, CallerType as DbCallerType,
    NewAuditLogRow,
};

/// PostgreSQL-backed implementation of `AuditLogPort`
#[derive(Debug, Clone)]
pub struct PostgresAuditLog {
    repository: AuditRepository,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: AuditRepository::new(pool),
        }
    }
}

impl DomainPort for PostgresAuditLog {}

#[async_trait]
impl AuditLogPort for PostgresAuditLog {
    async fn insert_audit_log(&self, record: NewPaymentAuditLog) -> Result<PaymentAuditLog, PortError> {
        let row = NewAuditLogRow {
            caller_id: record.caller_id,
            caller_type: caller_type_to_db(record.caller_type),
            agent_id: record.agent_id.map(|id| id.value()),
            operation: record.operation,
            parameters: record.parameters,
            result: record.result,
            error_message: record.error_message,
            duration_ms: record.duration_ms,
            status: status_to_db(record.status),
            ip_address: record.ip_address,
            user_agent: record.user_agent,
            request_url: record.request_url,
            referer: record.referer,
            created_at: record.created_at,
        };
        Ok(row_to_log(self.repository.insert(&row).await?))
    }

    async fn list_audit_logs(&self, query: &AuditQuery) -> Result<Page<PaymentAuditLog>, PortError> {
        let filter = AuditFilter {
            agent_id: query.agent_id.map(|id| id.value()),
            operation: query.operation.clone(),
            from: query.range.from,
            to: query.range.to,
            limit: query.page.limit() as i64,
            offset: query.page.offset() as i64,
        };
        let (rows, total) = self.repository.list(&filter).await?;
        let items = rows.into_iter().map(row_to_log).collect();
        Ok(Page::new(items, query.page, total.max(0) as u64))
    }
}

fn row_to_log(row: AuditLogRow) -> PaymentAuditLog {
    PaymentAuditLog {
        id: row.id,
        caller_id: row.caller_id,
        caller_type: match row.caller_type {
            DbCallerType::Agent => CallerType::Agent,
            DbCallerType::Admin => CallerType::Admin,
            DbCallerType::System => CallerType::System,
        },
        agent_id: row.agent_id.map(AgentId::new),
        operation: row.operation,
        parameters: row.parameters.0,
        result: row.result.map(|json| json.0),
        error_message: row.error_message,
        duration_ms: row.duration_ms,
        status: match row.status {
            DbAuditStatus::Success => AuditStatus::Success,
            DbAuditStatus::Error => AuditStatus::Error,
        },
        ip_address: row.ip_address,
        user_agent: row.user_agent,
        request_url: row.request_url,
        referer: row.referer,
        created_at: row.created_at,
    }
}

fn caller_type_to_db(value: CallerType) -> DbCallerType {
    match value {
        CallerType::Agent => DbCallerType::Agent,
        CallerType::Admin => DbCallerType::Admin,
        CallerType::System => DbCallerType::System,
    }
}

fn status_to_db(value: AuditStatus) -> DbAuditStatus {
    match value {
        AuditStatus::Success => DbAuditStatus::Success,
        AuditStatus::Error => DbAuditStatus::Error,
    }
}
