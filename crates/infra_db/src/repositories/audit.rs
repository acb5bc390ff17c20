//! Payment audit log repository

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::error::DatabaseError;

/// Repository for `payment_audit_logs`
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, record: &NewAuditLogRow) -> Result<AuditLogRow, DatabaseError> {
        let row = sqlx::query_as::<_, AuditLogRow>(
            r#"
            INSERT INTO payment_audit_logs (
                caller_id, caller_type, agent_id, operation, parameters, result,
                error_message, duration_ms, status, ip_address, user_agent,
                request_url, referer, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(&record.caller_id)
        .bind(record.caller_type)
        .bind(record.agent_id)
        .bind(&record.operation)
        .bind(Json(&record.parameters))
        .bind(record.result.as_ref().map(Json))
        .bind(&record.error_message)
        .bind(record.duration_ms)
        .bind(record.status)
        .bind(&record.ip_address)
        .bind(&record.user_agent)
        .bind(&record.request_url)
        .bind(&record.referer)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// One page of audit rows, newest first, with the total match count
    pub async fn list(&self, filter: &AuditFilter) -> Result<(Vec<AuditLogRow>, i64), DatabaseError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM payment_audit_logs
            WHERE ($1::bigint IS NULL OR agent_id = $1)
              AND ($2::varchar IS NULL OR operation = $2)
              AND ($3::timestamptz IS NULL OR created_at >= $3)
              AND ($4::timestamptz IS NULL OR created_at < $4)
            "#,
        )
        .bind(filter.agent_id)
        .bind(&filter.operation)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT * FROM payment_audit_logs
            WHERE ($1::bigint IS NULL OR agent_id = $1)
              AND ($2::varchar IS NULL OR operation = $2)
              AND ($3::timestamptz IS NULL OR created_at >= $3)
              AND ($4::timestamptz IS NULL OR created_at < $4)
            ORDER BY id DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.agent_id)
        .bind(&filter.operation)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }
}

/// Database row for `payment_audit_logs`
#[derive(Debug, Clone, FromRow)]
pub struct AuditLogRow {
    pub id: i64,
    pub caller_id: String,
    pub caller_type: CallerType,
    pub agent_id: Option<i64>,
    pub operation: String,
    pub parameters: Json<Value>,
    pub result: Option<Json<Value>>,
    pub error_message: Option<String>,
    pub duration_ms: i64,
    pub status: AuditStatus,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_url: Option<String>,
    pub referer: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `payment_audit_logs`
#[derive(Debug, Clone)]
pub struct NewAuditLogRow {
    pub caller_id: String,
    pub caller_type: CallerType,
    pub agent_id: Option<i64>,
    pub operation: String,
    pub parameters: Value,
    pub result: Option<Value>,
    pub error_message: Option<String>,
    pub duration_ms: i64,
    pub status: AuditStatus,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_url: Option<String>,
    pub referer: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Filter for [`AuditRepository::list`]
#[derive(Debug, Clone)]
pub struct AuditFilter {
    pub agent_id: Option<i64>,
    pub operation: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

/// Caller type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "audit_caller_type", rename_all = "snake_case")]
pub enum CallerType {
    Agent,
    Admin,
    System,
}

/// Audit status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "audit_status", rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Error,
}
