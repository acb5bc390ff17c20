//! Credit limit application workflow
//!
//! Agents submit a requested limit; an administrator approves or rejects it
//! exactly once. Approval and the resulting limit change commit together, so
//! an approved application without the new limit (or the reverse) is never
//! observable.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use core_kernel::{AgentId, ApplicationId};

use crate::account::CreditAccountView;
use crate::application::{ApplicationStatus, CreditApplication, NewCreditApplication};
use crate::context::RequestContext;
use crate::engine::CreditAccountEngine;
use crate::error::CreditError;
use crate::ports::{AgentDirectoryPort, CreditLedgerPort, DecisionOutcome};

/// Result of processing an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationOutcome {
    pub application: CreditApplication,
    /// Account after the limit change; `None` for rejections
    pub account: Option<CreditAccountView>,
}

pub struct ApplicationWorkflow {
    ledger: Arc<dyn CreditLedgerPort>,
    directory: Arc<dyn AgentDirectoryPort>,
    engine: Arc<CreditAccountEngine>,
}

impl ApplicationWorkflow {
    pub fn new(
        ledger: Arc<dyn CreditLedgerPort>,
        directory: Arc<dyn AgentDirectoryPort>,
        engine: Arc<CreditAccountEngine>,
    ) -> Self {
        Self {
            ledger,
            directory,
            engine,
        }
    }

    /// Records a new `PENDING` application
    ///
    /// # Arguments
    ///
    /// * `agent_id` - The requesting agent; must exist and be active
    /// * `requested_amount` - The desired total limit, strictly positive
    /// * `reason` - Free-text justification shown to the reviewer
    #[instrument(skip(self, reason, ctx), fields(actor = %ctx.actor()))]
    pub async fn submit(
        &self,
        agent_id: AgentId,
        requested_amount: Decimal,
        reason: Option<String>,
        ctx: &RequestContext,
    ) -> Result<CreditApplication, CreditError> {
        match self.directory.find_agent(agent_id).await? {
            Some(profile) if profile.active => {}
            Some(_) => {
                return Err(CreditError::validation(format!("{} is not active", agent_id)));
            }
            None => return Err(CreditError::not_found("Agent", agent_id)),
        }

        let new_application = NewCreditApplication::new(agent_id, requested_amount, reason, Utc::now())?;
        let application = self.ledger.insert_application(new_application).await?;

        info!(
            application_no = %application.application_no,
            requested = %application.requested_amount,
            "Credit application submitted"
        );
        Ok(application)
    }

    /// Approves or rejects a pending application
    ///
    /// An approval without `approved_amount` grants the requested amount and
    /// sets it as the agent's total limit in the same transaction as the
    /// status change.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless the caller is an administrator
    /// - `NotFound` for an unknown application
    /// - `Validation` when the application is already terminal
    /// - `ConcurrentEdit` when another administrator decided it first
    #[instrument(skip(self, admin_comment, ctx), fields(actor = %ctx.actor()))]
    pub async fn process(
        &self,
        application_id: ApplicationId,
        approved: bool,
        approved_amount: Option<Decimal>,
        admin_comment: Option<String>,
        ctx: &RequestContext,
    ) -> Result<ApplicationOutcome, CreditError> {
        let admin_id = ctx.require_admin()?;
        let application = self
            .ledger
            .get_application(application_id)
            .await?
            .ok_or_else(|| CreditError::not_found("CreditApplication", application_id))?;

        let decision = application.decide(approved, approved_amount, admin_id, admin_comment, Utc::now())?;

        let outcome = match decision.status {
            ApplicationStatus::Approved => {
                let committed = self.engine.approve_with_limit(&application, decision.clone(), ctx).await?;
                let application = committed.application.unwrap_or_else(|| {
                    let mut decided = application.clone();
                    decided.apply(&decision);
                    decided
                });
                ApplicationOutcome {
                    application,
                    account: Some(committed.account.view()),
                }
            }
            _ => match self.ledger.decide_application(decision).await? {
                DecisionOutcome::Decided(application) => ApplicationOutcome {
                    application,
                    account: None,
                },
                DecisionOutcome::AlreadyProcessed(conflict) => {
                    warn!(conflict = %conflict, "Application decided concurrently");
                    return Err(CreditError::ConcurrentEdit(conflict));
                }
            },
        };

        info!(
            application_no = %outcome.application.application_no,
            status = outcome.application.status.as_str(),
            approved_amount = ?outcome.application.approved_amount,
            "Credit application processed"
        );
        Ok(outcome)
    }

    pub async fn get(&self, application_id: ApplicationId) -> Result<CreditApplication, CreditError> {
        self.ledger
            .get_application(application_id)
            .await?
            .ok_or_else(|| CreditError::not_found("CreditApplication", application_id))
    }
}
