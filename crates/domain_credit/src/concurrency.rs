//! Optimistic concurrency control for account mutations
//!
//! Every account write is planned against a freshly read row and committed
//! with `WHERE version = ?`. Losing a race is transient: the controller
//! re-reads and re-plans, up to `max_retries` times, and only then reports
//! the last `VERSION` conflict to the caller.

use std::sync::Arc;

use tracing::{debug, warn};

use core_kernel::AgentId;

use crate::account::CreditAccount;
use crate::application::{ApplicationDecision, CreditApplication};
use crate::error::CreditError;
use crate::ports::{AccountWrite, CommitOutcome, CreditLedgerPort};
use crate::transaction::CreditTransaction;

/// A successful (or replayed) account mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    pub account: CreditAccount,
    pub entry: Option<CreditTransaction>,
    pub application: Option<CreditApplication>,
    /// True when the transaction number had already been applied
    pub replayed: bool,
}

/// Read, plan, conditionally write, retry
#[derive(Clone)]
pub struct ConcurrencyController {
    ledger: Arc<dyn CreditLedgerPort>,
    max_retries: u32,
}

impl ConcurrencyController {
    pub fn new(ledger: Arc<dyn CreditLedgerPort>, max_retries: u32) -> Self {
        Self { ledger, max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Runs `plan` against the current account row until a write sticks
    ///
    /// `plan` receives `None` when the agent has no account yet and may
    /// return an error to abort without writing; that error is returned as is.
    ///
    /// # Errors
    ///
    /// - whatever `plan` returns
    /// - `ConcurrentEdit` carrying the `VERSION` detail once the retry
    ///   budget is spent, or the `CONCURRENT_EDIT` detail when an attached
    ///   application was decided by someone else
    /// - `Persistence` when the store fails
    pub async fn execute<F>(
        &self,
        agent_id: AgentId,
        decision: Option<ApplicationDecision>,
        plan: F,
    ) -> Result<Committed, CreditError>
    where
        F: Fn(Option<&CreditAccount>) -> Result<AccountWrite, CreditError> + Send + Sync,
    {
        let mut attempt: u32 = 0;

        loop {
            let current = self.ledger.get_account(agent_id).await?;
            let write = plan(current.as_ref())?;

            match self.ledger.commit(write, decision.clone()).await? {
                CommitOutcome::Committed {
                    account,
                    entry,
                    application,
                } => {
                    return Ok(Committed {
                        account,
                        entry,
                        application,
                        replayed: false,
                    });
                }
                CommitOutcome::DuplicateTransaction(existing) => {
                    debug!(
                        agent_id = %agent_id,
                        transaction_no = %existing.transaction_no,
                        "Transaction number already applied, replaying stored result"
                    );
                    let account = self
                        .ledger
                        .get_account(existing.agent_id)
                        .await?
                        .ok_or_else(|| CreditError::not_found("CreditAccount", existing.agent_id))?;
                    return Ok(Committed {
                        account,
                        entry: Some(existing),
                        application: None,
                        replayed: true,
                    });
                }
                CommitOutcome::ApplicationConflict(conflict) => {
                    warn!(agent_id = %agent_id, conflict = %conflict, "Application resolved concurrently");
                    return Err(CreditError::ConcurrentEdit(conflict));
                }
                CommitOutcome::VersionConflict(conflict) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(
                            agent_id = %agent_id,
                            attempts = attempt,
                            conflict = %conflict,
                            "Retry budget exhausted on version conflict"
                        );
                        return Err(CreditError::ConcurrentEdit(conflict));
                    }
                    debug!(
                        agent_id = %agent_id,
                        attempt,
                        expected = ?conflict.expected_version,
                        current = ?conflict.current_version,
                        "Lost version race, retrying with fresh state"
                    );
                }
            }
        }
    }
}
