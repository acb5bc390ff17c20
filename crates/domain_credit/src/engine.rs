//! Credit Account Engine
//!
//! Balance invariants and the debit/credit/limit/freeze operations. Every
//! mutation goes through the [`ConcurrencyController`] so that the account
//! row and its ledger entry are written together or not at all.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use core_kernel::{normalize_amount, require_positive, AgentId, BookingId, TransactionNo};

use crate::account::{CreditAccount, CreditAccountView};
use crate::application::{ApplicationDecision, ApplicationStatus, CreditApplication};
use crate::concurrency::{Committed, ConcurrencyController};
use crate::context::RequestContext;
use crate::error::CreditError;
use crate::policy::CreditPolicy;
use crate::ports::{AccountWrite, AgentDirectoryPort, CreditLedgerPort};
use crate::transaction::{CreditTransaction, NewCreditTransaction, TransactionType};

/// A booking paid on credit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitCommand {
    pub agent_id: AgentId,
    pub booking_id: Option<BookingId>,
    pub amount: Decimal,
    /// Idempotency key; generated when absent
    pub transaction_no: Option<TransactionNo>,
    /// Caller asks to tolerate a deficit within the overdraft policy
    pub allow_overdraft: bool,
    pub description: Option<String>,
}

impl DebitCommand {
    pub fn new(agent_id: AgentId, booking_id: Option<BookingId>, amount: Decimal) -> Self {
        Self {
            agent_id,
            booking_id,
            amount,
            transaction_no: None,
            allow_overdraft: false,
            description: None,
        }
    }
}

/// Kind of balance increase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditKind {
    Repaid,
    Topup,
}

impl From<CreditKind> for TransactionType {
    fn from(kind: CreditKind) -> Self {
        match kind {
            CreditKind::Repaid => TransactionType::Repaid,
            CreditKind::Topup => TransactionType::Topup,
        }
    }
}

/// A repayment or top-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCommand {
    pub agent_id: AgentId,
    pub amount: Decimal,
    pub kind: CreditKind,
    pub transaction_no: Option<TransactionNo>,
    pub note: Option<String>,
}

impl CreditCommand {
    pub fn new(agent_id: AgentId, amount: Decimal, kind: CreditKind, note: Option<String>) -> Self {
        Self {
            agent_id,
            amount,
            kind,
            transaction_no: None,
            note,
        }
    }
}

/// Result of a debit or credit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    pub transaction: CreditTransaction,
    /// Account state after the operation (current state for replays)
    pub account: CreditAccountView,
    /// True when the transaction number had been applied before
    pub replayed: bool,
}

/// Pre-flight answer for a prospective payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCheck {
    pub agent_id: AgentId,
    pub amount: Decimal,
    pub available_credit: Decimal,
    pub sufficient: bool,
    pub shortfall: Decimal,
    pub frozen: bool,
    /// Sufficient and not frozen
    pub payable: bool,
}

pub struct CreditAccountEngine {
    ledger: Arc<dyn CreditLedgerPort>,
    directory: Arc<dyn AgentDirectoryPort>,
    controller: ConcurrencyController,
    policy: CreditPolicy,
}

impl CreditAccountEngine {
    pub fn new(
        ledger: Arc<dyn CreditLedgerPort>,
        directory: Arc<dyn AgentDirectoryPort>,
        policy: CreditPolicy,
    ) -> Self {
        Self {
            controller: ConcurrencyController::new(ledger.clone(), policy.max_retries),
            ledger,
            directory,
            policy,
        }
    }

    pub fn policy(&self) -> &CreditPolicy {
        &self.policy
    }

    async fn load(&self, agent_id: AgentId) -> Result<CreditAccount, CreditError> {
        self.ledger
            .get_account(agent_id)
            .await?
            .ok_or_else(|| CreditError::not_found("CreditAccount", agent_id))
    }

    /// Read-only snapshot of an account
    #[instrument(skip(self))]
    pub async fn get_balance(&self, agent_id: AgentId) -> Result<CreditAccountView, CreditError> {
        debug!("Loading credit balance");
        Ok(self.load(agent_id).await?.view())
    }

    /// Creates a credit account for an agent known to the directory
    ///
    /// # Errors
    ///
    /// - `NotFound` when the agent is unknown
    /// - `Validation` when the limit is negative or the agent already has an account
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor()))]
    pub async fn open_account(
        &self,
        agent_id: AgentId,
        initial_limit: Decimal,
        ctx: &RequestContext,
    ) -> Result<CreditAccountView, CreditError> {
        self.require_agent(agent_id).await?;
        let initial_limit = normalize_amount(initial_limit);
        if initial_limit < Decimal::ZERO {
            return Err(CreditError::validation("initial credit limit must not be negative"));
        }

        let actor = ctx.actor();
        let committed = self
            .controller
            .execute(agent_id, None, |current| {
                if current.is_some() {
                    return Err(CreditError::validation(format!(
                        "{} already has a credit account",
                        agent_id
                    )));
                }
                Ok(self.plan_new_account(agent_id, initial_limit, actor, None))
            })
            .await?;

        info!(agent_id = %agent_id, limit = %initial_limit, "Credit account opened");
        Ok(committed.account.view())
    }

    /// Pays a booking on credit
    ///
    /// # Errors
    ///
    /// `Validation`, `NotFound`, `FrozenAccount`, `InsufficientCredit`,
    /// `ConcurrentEdit` after the retry budget, or `Persistence`.
    #[instrument(skip(self, command, ctx), fields(agent_id = %command.agent_id, actor = %ctx.actor()))]
    pub async fn debit(&self, command: DebitCommand, ctx: &RequestContext) -> Result<LedgerReceipt, CreditError> {
        let amount = require_positive("amount", command.amount)?;
        let transaction_no = command.transaction_no.clone().unwrap_or_else(TransactionNo::generate);

        if let Some(existing) = self.ledger.find_transaction(&transaction_no).await? {
            return self.replay(existing, command.agent_id, TransactionType::Used).await;
        }

        let actor = ctx.actor();
        let description = command
            .description
            .clone()
            .or_else(|| command.booking_id.map(|b| format!("Booking {} paid on credit", b)));

        let result = self
            .controller
            .execute(command.agent_id, None, |current| {
                let current =
                    current.ok_or_else(|| CreditError::not_found("CreditAccount", command.agent_id))?;
                let next = current.plan_debit(
                    amount,
                    command.allow_overdraft,
                    &self.policy.overdraft,
                    actor,
                    Utc::now(),
                )?;
                let entry = NewCreditTransaction::between(
                    transaction_no.clone(),
                    TransactionType::Used,
                    amount,
                    current,
                    &next,
                    command.booking_id,
                    description.clone(),
                    actor,
                );
                Ok(AccountWrite::update(current, next, Some(entry)))
            })
            .await;

        match result {
            Ok(committed) => {
                let receipt = Self::receipt(committed, TransactionType::Used, command.agent_id)?;
                if !receipt.replayed {
                    info!(
                        transaction_no = %receipt.transaction.transaction_no,
                        amount = %amount,
                        used = %receipt.account.used_credit,
                        available = %receipt.account.available_credit,
                        "Credit debited"
                    );
                }
                Ok(receipt)
            }
            Err(err) => {
                warn!(amount = %amount, error = %err, "Debit rejected");
                Err(err)
            }
        }
    }

    /// Applies a repayment or top-up
    ///
    /// Usage is paid down first and never increased; any remainder becomes deposit.
    #[instrument(skip(self, command, ctx), fields(agent_id = %command.agent_id, actor = %ctx.actor()))]
    pub async fn credit(&self, command: CreditCommand, ctx: &RequestContext) -> Result<LedgerReceipt, CreditError> {
        let amount = require_positive("amount", command.amount)?;
        let kind = TransactionType::from(command.kind);
        let transaction_no = command.transaction_no.clone().unwrap_or_else(TransactionNo::generate);

        if let Some(existing) = self.ledger.find_transaction(&transaction_no).await? {
            return self.replay(existing, command.agent_id, kind).await;
        }

        let actor = ctx.actor();
        let committed = self
            .controller
            .execute(command.agent_id, None, |current| {
                let current =
                    current.ok_or_else(|| CreditError::not_found("CreditAccount", command.agent_id))?;
                let next = current.plan_credit(amount, actor, Utc::now());
                let entry = NewCreditTransaction::between(
                    transaction_no.clone(),
                    kind,
                    amount,
                    current,
                    &next,
                    None,
                    command.note.clone(),
                    actor,
                );
                Ok(AccountWrite::update(current, next, Some(entry)))
            })
            .await?;

        let receipt = Self::receipt(committed, kind, command.agent_id)?;
        if !receipt.replayed {
            info!(
                transaction_no = %receipt.transaction.transaction_no,
                kind = kind.as_str(),
                amount = %amount,
                used = %receipt.account.used_credit,
                deposit = %receipt.account.deposit_balance,
                "Credit applied"
            );
        }
        Ok(receipt)
    }

    /// Sets a new approved limit
    #[instrument(skip(self, ctx), fields(actor = %ctx.actor()))]
    pub async fn adjust_limit(
        &self,
        agent_id: AgentId,
        new_total: Decimal,
        ctx: &RequestContext,
    ) -> Result<CreditAccountView, CreditError> {
        let committed = self.apply_limit(agent_id, new_total, ctx, None).await?;
        Ok(committed.account.view())
    }

    /// Approves an application and sets the agent's limit in one transaction
    ///
    /// Provisions the account when the agent does not have one yet.
    pub(crate) async fn approve_with_limit(
        &self,
        application: &CreditApplication,
        decision: ApplicationDecision,
        ctx: &RequestContext,
    ) -> Result<Committed, CreditError> {
        debug_assert_eq!(decision.status, ApplicationStatus::Approved);
        let new_total = decision
            .approved_amount
            .ok_or_else(|| CreditError::validation("approval requires an approved amount"))?;
        self.apply_limit(application.agent_id, new_total, ctx, Some(decision)).await
    }

    async fn apply_limit(
        &self,
        agent_id: AgentId,
        new_total: Decimal,
        ctx: &RequestContext,
        decision: Option<ApplicationDecision>,
    ) -> Result<Committed, CreditError> {
        let new_total = normalize_amount(new_total);
        if new_total < Decimal::ZERO {
            return Err(CreditError::validation(format!(
                "credit limit must not be negative, got {}",
                new_total
            )));
        }

        let provision = decision.is_some();
        let actor = ctx.actor();
        let note = decision.as_ref().map(|d| format!("Limit approved via application {}", d.application_id));

        let committed = self
            .controller
            .execute(agent_id, decision, |current| match current {
                Some(current) => {
                    let next = current.plan_limit(new_total, actor, Utc::now())?;
                    let delta = next.total_credit - current.total_credit;
                    let entry = (!delta.is_zero()).then(|| {
                        NewCreditTransaction::between(
                            TransactionNo::generate(),
                            TransactionType::Granted,
                            delta.abs(),
                            current,
                            &next,
                            None,
                            note.clone().or_else(|| {
                                Some(format!("Limit changed from {} to {}", current.total_credit, new_total))
                            }),
                            actor,
                        )
                    });
                    Ok(AccountWrite::update(current, next, entry))
                }
                None if provision => Ok(self.plan_new_account(agent_id, new_total, actor, note.clone())),
                None => Err(CreditError::not_found("CreditAccount", agent_id)),
            })
            .await?;

        info!(
            agent_id = %agent_id,
            total = %committed.account.total_credit,
            version = committed.account.version,
            "Credit limit adjusted"
        );
        Ok(committed)
    }

    /// Blocks future debits; in-flight debits are not reversed
    pub async fn freeze(&self, agent_id: AgentId, ctx: &RequestContext) -> Result<CreditAccountView, CreditError> {
        self.set_frozen(agent_id, true, ctx).await
    }

    pub async fn unfreeze(&self, agent_id: AgentId, ctx: &RequestContext) -> Result<CreditAccountView, CreditError> {
        self.set_frozen(agent_id, false, ctx).await
    }

    #[instrument(skip(self, ctx), fields(actor = %ctx.actor()))]
    async fn set_frozen(
        &self,
        agent_id: AgentId,
        frozen: bool,
        ctx: &RequestContext,
    ) -> Result<CreditAccountView, CreditError> {
        let current = self.load(agent_id).await?;
        if current.is_frozen == frozen {
            return Ok(current.view());
        }

        let actor = ctx.actor();
        let committed = self
            .controller
            .execute(agent_id, None, |current| {
                let current = current.ok_or_else(|| CreditError::not_found("CreditAccount", agent_id))?;
                Ok(AccountWrite::update(current, current.plan_freeze(frozen, actor, Utc::now()), None))
            })
            .await?;

        info!(agent_id = %agent_id, frozen, "Credit account freeze state changed");
        Ok(committed.account.view())
    }

    /// Answers whether `amount` could be paid right now, without writing
    #[instrument(skip(self))]
    pub async fn check_payment(&self, agent_id: AgentId, amount: Decimal) -> Result<PaymentCheck, CreditError> {
        let amount = require_positive("amount", amount)?;
        let account = self.load(agent_id).await?;
        let available = account.available_credit();
        let sufficient = available >= amount;

        Ok(PaymentCheck {
            agent_id,
            amount,
            available_credit: available,
            sufficient,
            shortfall: if sufficient { Decimal::ZERO } else { amount - available },
            frozen: account.is_frozen,
            payable: sufficient && !account.is_frozen,
        })
    }

    async fn require_agent(&self, agent_id: AgentId) -> Result<(), CreditError> {
        match self.directory.find_agent(agent_id).await? {
            Some(profile) if profile.active => Ok(()),
            Some(_) => Err(CreditError::validation(format!("{} is not active", agent_id))),
            None => Err(CreditError::not_found("Agent", agent_id)),
        }
    }

    fn plan_new_account(
        &self,
        agent_id: AgentId,
        limit: Decimal,
        actor: &str,
        note: Option<String>,
    ) -> AccountWrite {
        let now = Utc::now();
        let account = CreditAccount::open(agent_id, limit, actor, now);
        let entry = (!account.total_credit.is_zero()).then(|| {
            let empty = CreditAccount::open(agent_id, Decimal::ZERO, actor, now);
            NewCreditTransaction::between(
                TransactionNo::generate(),
                TransactionType::Granted,
                account.total_credit,
                &empty,
                &account,
                None,
                note.or_else(|| Some("Initial credit limit".to_string())),
                actor,
            )
        });
        AccountWrite::create(account, entry)
    }

    /// Returns the stored result of an already applied transaction number
    async fn replay(
        &self,
        existing: CreditTransaction,
        agent_id: AgentId,
        expected: TransactionType,
    ) -> Result<LedgerReceipt, CreditError> {
        Self::ensure_same_operation(&existing, agent_id, expected)?;
        let account = self.load(agent_id).await?;
        debug!(transaction_no = %existing.transaction_no, "Replaying applied transaction");
        Ok(LedgerReceipt {
            transaction: existing,
            account: account.view(),
            replayed: true,
        })
    }

    fn receipt(
        committed: Committed,
        expected: TransactionType,
        agent_id: AgentId,
    ) -> Result<LedgerReceipt, CreditError> {
        let transaction = committed
            .entry
            .ok_or_else(|| CreditError::validation("ledger write produced no entry"))?;
        if committed.replayed {
            Self::ensure_same_operation(&transaction, agent_id, expected)?;
        }
        Ok(LedgerReceipt {
            transaction,
            account: committed.account.view(),
            replayed: committed.replayed,
        })
    }

    fn ensure_same_operation(
        existing: &CreditTransaction,
        agent_id: AgentId,
        expected: TransactionType,
    ) -> Result<(), CreditError> {
        if existing.agent_id != agent_id || existing.transaction_type != expected {
            return Err(CreditError::validation(format!(
                "transaction number {} was already used for a different operation",
                existing.transaction_no
            )));
        }
        Ok(())
    }
}
