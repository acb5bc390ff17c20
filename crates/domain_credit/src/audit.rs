//! Payment audit records
//!
//! Purely observational: audit rows are never consulted for balances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use core_kernel::AgentId;

use crate::context::{CallerType, RequestContext};

/// Outcome of an audited call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Success,
    Error,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "SUCCESS",
            AuditStatus::Error => "ERROR",
        }
    }
}

/// A persisted audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAuditLog {
    pub id: i64,
    pub caller_id: String,
    pub caller_type: CallerType,
    /// Account the call targeted, when there is one
    pub agent_id: Option<AgentId>,
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

/// An audit record about to be stored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPaymentAuditLog {
    pub caller_id: String,
    pub caller_type: CallerType,
    pub agent_id: Option<AgentId>,
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

impl NewPaymentAuditLog {
    /// Captures one audited call
    ///
    /// Long free-text fields from the request layer are cut to `max_len`
    /// characters.
    #[allow(clippy::too_many_arguments)]
    pub fn capture(
        ctx: &RequestContext,
        operation: &str,
        agent_id: Option<AgentId>,
        parameters: Value,
        result: Option<Value>,
        error_message: Option<String>,
        duration_ms: i64,
        max_len: usize,
    ) -> Self {
        let status = if error_message.is_some() {
            AuditStatus::Error
        } else {
            AuditStatus::Success
        };

        Self {
            caller_id: truncate(&ctx.caller_id, max_len),
            caller_type: ctx.caller_type,
            agent_id: agent_id.or(ctx.agent_id),
            operation: operation.to_string(),
            parameters,
            result,
            error_message,
            duration_ms,
            status,
            ip_address: ctx.ip_address.as_deref().map(|v| truncate(v, max_len)),
            user_agent: ctx.user_agent.as_deref().map(|v| truncate(v, max_len)),
            request_url: ctx.request_url.as_deref().map(|v| truncate(v, max_len)),
            referer: ctx.referer.as_deref().map(|v| truncate(v, max_len)),
            created_at: Utc::now(),
        }
    }

    pub fn into_log(self, id: i64) -> PaymentAuditLog {
        PaymentAuditLog {
            id,
            caller_id: self.caller_id,
            caller_type: self.caller_type,
            agent_id: self.agent_id,
            operation: self.operation,
            parameters: self.parameters,
            result: self.result,
            error_message: self.error_message,
            duration_ms: self.duration_ms,
            status: self.status,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            request_url: self.request_url,
            referer: self.referer,
            created_at: self.created_at,
        }
    }
}

/// Cuts `value` to at most `max_len` characters on a char boundary
pub fn truncate(value: &str, max_len: usize) -> String {
    match value.char_indices().nth(max_len) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}
