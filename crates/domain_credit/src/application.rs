//! Credit limit applications
//!
//! An agent asks for a new limit; an administrator decides once.
//!
//! ```text
//! PENDING -> APPROVED
//!         -> REJECTED
//! ```
//!
//! Both outcomes are terminal and applications are never deleted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{require_positive, AdminId, AgentId, ApplicationId, ApplicationNo};

use crate::error::CreditError;

/// Lifecycle state of an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
        }
    }
}

/// A persisted credit limit application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditApplication {
    pub id: ApplicationId,
    pub application_no: ApplicationNo,
    pub agent_id: AgentId,
    pub requested_amount: Decimal,
    pub approved_amount: Option<Decimal>,
    pub status: ApplicationStatus,
    pub reason: Option<String>,
    pub admin_comment: Option<String>,
    pub admin_id: Option<AdminId>,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl CreditApplication {
    /// Validates and builds the one decision this application can take
    ///
    /// An approval without an explicit amount approves the requested amount.
    ///
    /// # Errors
    ///
    /// - `Validation("already processed")` when the application is terminal
    /// - `Validation` when the approved amount is not positive
    pub fn decide(
        &self,
        approved: bool,
        approved_amount: Option<Decimal>,
        admin_id: AdminId,
        admin_comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ApplicationDecision, CreditError> {
        if self.status.is_terminal() {
            return Err(CreditError::validation(format!(
                "application {} already processed ({})",
                self.application_no,
                self.status.as_str()
            )));
        }

        let (status, approved_amount) = if approved {
            let amount = require_positive(
                "approved_amount",
                approved_amount.unwrap_or(self.requested_amount),
            )?;
            (ApplicationStatus::Approved, Some(amount))
        } else {
            (ApplicationStatus::Rejected, None)
        };

        Ok(ApplicationDecision {
            application_id: self.id,
            agent_id: self.agent_id,
            status,
            approved_amount,
            admin_id,
            admin_comment,
            processed_at: now,
        })
    }

    /// Applies a decision to this record
    pub fn apply(&mut self, decision: &ApplicationDecision) {
        self.status = decision.status;
        self.approved_amount = decision.approved_amount;
        self.admin_id = Some(decision.admin_id);
        self.admin_comment = decision.admin_comment.clone();
        self.processed_at = Some(decision.processed_at);
    }
}

/// A new application before the store assigns its id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCreditApplication {
    pub application_no: ApplicationNo,
    pub agent_id: AgentId,
    pub requested_amount: Decimal,
    pub reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl NewCreditApplication {
    /// # Errors
    ///
    /// Returns `Validation` when the requested amount is not positive.
    pub fn new(
        agent_id: AgentId,
        requested_amount: Decimal,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, CreditError> {
        Ok(Self {
            application_no: ApplicationNo::generate(),
            agent_id,
            requested_amount: require_positive("requested_amount", requested_amount)?,
            reason,
            submitted_at: now,
        })
    }

    pub fn into_application(self, id: ApplicationId) -> CreditApplication {
        CreditApplication {
            id,
            application_no: self.application_no,
            agent_id: self.agent_id,
            requested_amount: self.requested_amount,
            approved_amount: None,
            status: ApplicationStatus::Pending,
            reason: self.reason,
            admin_comment: None,
            admin_id: None,
            submitted_at: self.submitted_at,
            processed_at: None,
        }
    }
}

/// The admin decision that moves an application out of `PENDING`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDecision {
    pub application_id: ApplicationId,
    pub agent_id: AgentId,
    pub status: ApplicationStatus,
    pub approved_amount: Option<Decimal>,
    pub admin_id: AdminId,
    pub admin_comment: Option<String>,
    pub processed_at: DateTime<Utc>,
}
