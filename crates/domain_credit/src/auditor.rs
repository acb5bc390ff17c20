//! Fire-and-forget audit recording
//!
//! Wraps a facade call, measures it and hands the resulting record to a
//! background task. The wrapped call's result is returned unchanged; a
//! failing audit sink is logged and otherwise ignored.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use core_kernel::AgentId;

use crate::audit::NewPaymentAuditLog;
use crate::context::RequestContext;
use crate::ports::AuditLogPort;

#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditLogPort>,
    max_field_len: usize,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditLogPort>, max_field_len: usize) -> Self {
        Self { sink, max_field_len }
    }

    /// Runs `call` and records its outcome
    ///
    /// # Arguments
    ///
    /// * `ctx` - Caller identity and HTTP metadata
    /// * `operation` - Facade operation name stored on the record
    /// * `agent_id` - Account the call targets, if any
    /// * `parameters` - Request parameters as JSON
    /// * `call` - The operation itself
    pub async fn audited<T, E, Fut>(
        &self,
        ctx: &RequestContext,
        operation: &str,
        agent_id: Option<AgentId>,
        parameters: Value,
        call: Fut,
    ) -> Result<T, E>
    where
        T: Serialize,
        E: Display,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let outcome = call.await;
        let duration_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

        let (result, error_message) = match &outcome {
            Ok(value) => (serde_json::to_value(value).ok(), None),
            Err(err) => (None, Some(err.to_string())),
        };

        let record = NewPaymentAuditLog::capture(
            ctx,
            operation,
            agent_id,
            parameters,
            result,
            error_message,
            duration_ms,
            self.max_field_len,
        );
        self.dispatch(record);

        outcome
    }

    /// Persists `record` in the background
    ///
    /// Returns the task handle so tests can wait for it; `None` when no
    /// runtime is available, in which case the record is dropped.
    pub fn dispatch(&self, record: NewPaymentAuditLog) -> Option<JoinHandle<()>> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                error!(operation = %record.operation, "No async runtime, audit record dropped");
                return None;
            }
        };

        let sink = self.sink.clone();
        Some(handle.spawn(async move {
            let operation = record.operation.clone();
            match sink.insert_audit_log(record).await {
                Ok(stored) => debug!(audit_id = stored.id, operation = %operation, "Audit record stored"),
                Err(err) => error!(operation = %operation, error = %err, "Failed to store audit record"),
            }
        }))
    }
}
