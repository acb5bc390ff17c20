//! Credit facade
//!
//! [`CreditService`] is the single entry point for the surrounding booking
//! system. It checks the caller's role, validates request DTOs, delegates to
//! the engine or the application workflow, and wraps the money-moving calls
//! in the [`AuditLogger`].

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use core_kernel::{AdapterHealth, AgentId, ApplicationId, HealthCheckResult, TransactionNo};
use domain_credit::{
    verify_ledger, AgentDirectoryPort, ApplicationOutcome, ApplicationQuery, ApplicationStatus,
    ApplicationWorkflow, AuditLogPort, AuditLogger, AuditQuery, CallerType, CreditAccountEngine,
    CreditAccountView, CreditApplication, CreditCommand, CreditError, CreditKind,
    CreditLedgerPort, CreditPolicy, CreditTransaction, DebitCommand, LedgerVerification, Page,
    PageRequest, PaymentAuditLog, RequestContext, TransactionQuery,
};
use infra_db::{DatabasePool, PostgresAgentDirectory, PostgresAuditLog, PostgresCreditLedger};

use crate::config::ServiceConfig;
use crate::dto::{
    ApplicationListRequest, ApplyCreditLimitRequest, AuditListRequest, CheckPaymentRequest,
    CheckResult, OpenAccountRequest, PayWithCreditRequest, PaymentResult,
    ProcessApplicationRequest, RepayRequest, RepaymentResult, TopupRequest, TopupResult,
    TransactionListRequest,
};
use crate::error::ServiceError;

/// Readiness of the service's storage
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub status: AdapterHealth,
    pub ledger: HealthCheckResult,
}

pub struct CreditService {
    ledger: Arc<dyn CreditLedgerPort>,
    audit_log: Arc<dyn AuditLogPort>,
    engine: Arc<CreditAccountEngine>,
    workflow: ApplicationWorkflow,
    auditor: AuditLogger,
    policy: CreditPolicy,
}

impl CreditService {
    /// Wires the service over the given ports
    ///
    /// # Arguments
    ///
    /// * `ledger` - Account, transaction and application store
    /// * `directory` - Read-only view of the agency's agents
    /// * `audit_log` - Sink for audit records
    /// * `policy` - Retry budget, overdraft and paging settings
    pub fn new(
        ledger: Arc<dyn CreditLedgerPort>,
        directory: Arc<dyn AgentDirectoryPort>,
        audit_log: Arc<dyn AuditLogPort>,
        policy: CreditPolicy,
    ) -> Self {
        let engine = Arc::new(CreditAccountEngine::new(
            ledger.clone(),
            directory.clone(),
            policy.clone(),
        ));
        let workflow = ApplicationWorkflow::new(ledger.clone(), directory, engine.clone());
        let auditor = AuditLogger::new(audit_log.clone(), policy.audit_field_max_len);

        Self {
            ledger,
            audit_log,
            engine,
            workflow,
            auditor,
            policy,
        }
    }

    /// PostgreSQL-backed service over an existing pool
    pub fn postgres(pool: DatabasePool, policy: CreditPolicy) -> Self {
        Self::new(
            Arc::new(PostgresCreditLedger::new(pool.clone())),
            Arc::new(PostgresAgentDirectory::new(pool.clone())),
            Arc::new(PostgresAuditLog::new(pool)),
            policy,
        )
    }

    /// Connects to the configured database and wires the service
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the pool cannot be created
    pub async fn connect(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let pool = infra_db::create_pool(config.database.clone()).await?;
        Ok(Self::postgres(pool, config.credit.clone()))
    }

    pub fn policy(&self) -> &CreditPolicy {
        &self.policy
    }

    // ------------------------------------------------------------------
    // Account reads and payments
    // ------------------------------------------------------------------

    /// Balance snapshot of an agent's account
    #[instrument(skip(self, ctx), fields(caller = %ctx.caller_id))]
    pub async fn get_credit_info(
        &self,
        agent_id: AgentId,
        ctx: &RequestContext,
    ) -> Result<CreditAccountView, ServiceError> {
        ctx.require_access(agent_id)?;
        Ok(self.engine.get_balance(agent_id).await?)
    }

    /// Pays a booking from the agent's credit line
    ///
    /// A repeated `transaction_no` returns the original payment with
    /// `replayed = true` and moves no money.
    ///
    /// # Errors
    ///
    /// `InvalidRequest`, or the engine's `FrozenAccount`, `InsufficientCredit`
    /// (with the shortfall) and `ConcurrentEdit` outcomes.
    #[instrument(skip(self, request, ctx), fields(agent_id = %request.agent_id, booking_id = %request.booking_id))]
    pub async fn pay_with_credit(
        &self,
        request: PayWithCreditRequest,
        ctx: &RequestContext,
    ) -> Result<PaymentResult, ServiceError> {
        let parameters = json!({
            "agent_id": request.agent_id,
            "booking_id": request.booking_id,
            "amount": request.amount,
            "transaction_no": request.transaction_no,
            "allow_overdraft": request.allow_overdraft,
        });

        self.auditor
            .audited(ctx, "pay_with_credit", Some(request.agent_id), parameters, self.pay(&request, ctx))
            .await
    }

    async fn pay(&self, request: &PayWithCreditRequest, ctx: &RequestContext) -> Result<PaymentResult, ServiceError> {
        request.validate()?;
        ctx.require_access(request.agent_id)?;

        let mut command = DebitCommand::new(request.agent_id, Some(request.booking_id), request.amount);
        command.transaction_no = parse_transaction_no(request.transaction_no.as_deref())?;
        command.allow_overdraft = request.allow_overdraft;
        command.description = Some(format!("Payment for booking {}", request.booking_id));

        let receipt = self.engine.debit(command, ctx).await?;
        Ok(PaymentResult::from(receipt))
    }

    /// Pre-flight check for a payment; never writes
    #[instrument(skip(self, request, ctx), fields(agent_id = %request.agent_id))]
    pub async fn check_credit_payment(
        &self,
        request: CheckPaymentRequest,
        ctx: &RequestContext,
    ) -> Result<CheckResult, ServiceError> {
        let parameters = json!({
            "agent_id": request.agent_id,
            "booking_id": request.booking_id,
            "amount": request.amount,
        });

        self.auditor
            .audited(ctx, "check_credit_payment", Some(request.agent_id), parameters, self.check(&request, ctx))
            .await
    }

    async fn check(&self, request: &CheckPaymentRequest, ctx: &RequestContext) -> Result<CheckResult, ServiceError> {
        request.validate()?;
        ctx.require_access(request.agent_id)?;

        let check = self.engine.check_payment(request.agent_id, request.amount).await?;
        if !check.payable {
            debug!(shortfall = %check.shortfall, frozen = check.frozen, "Payment would be refused");
        }
        Ok(CheckResult {
            booking_id: request.booking_id,
            check,
        })
    }

    /// Records a repayment by the agent
    #[instrument(skip(self, request, ctx), fields(agent_id = %request.agent_id))]
    pub async fn repay_credit(
        &self,
        request: RepayRequest,
        ctx: &RequestContext,
    ) -> Result<RepaymentResult, ServiceError> {
        let parameters = json!({
            "agent_id": request.agent_id,
            "amount": request.amount,
            "note": request.note,
            "transaction_no": request.transaction_no,
        });

        self.auditor
            .audited(ctx, "repay_credit", Some(request.agent_id), parameters, self.repay(&request, ctx))
            .await
    }

    async fn repay(&self, request: &RepayRequest, ctx: &RequestContext) -> Result<RepaymentResult, ServiceError> {
        request.validate()?;
        ctx.require_access(request.agent_id)?;

        let mut command =
            CreditCommand::new(request.agent_id, request.amount, CreditKind::Repaid, request.note.clone());
        command.transaction_no = parse_transaction_no(request.transaction_no.as_deref())?;

        let receipt = self.engine.credit(command, ctx).await?;
        Ok(RepaymentResult::from(receipt))
    }

    /// Administrative top-up, optionally settling an approved application
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless the caller is an administrator
    /// - `Validation` when the application belongs to another agent or is not
    ///   approved, or when a caller key disagrees with the application's key
    ///
    /// A repeated top-up for the same application, or with the same
    /// `transaction_no`, returns the original entry with `replayed: true`.
    #[instrument(skip(self, request, ctx), fields(agent_id = %request.agent_id))]
    pub async fn topup_credit(
        &self,
        request: TopupRequest,
        ctx: &RequestContext,
    ) -> Result<TopupResult, ServiceError> {
        let parameters = json!({
            "agent_id": request.agent_id,
            "amount": request.amount,
            "note": request.note,
            "application_id": request.application_id,
            "transaction_no": request.transaction_no,
        });

        self.auditor
            .audited(ctx, "topup_credit", Some(request.agent_id), parameters, self.topup(&request, ctx))
            .await
    }

    async fn topup(&self, request: &TopupRequest, ctx: &RequestContext) -> Result<TopupResult, ServiceError> {
        request.validate()?;
        ctx.require_admin()?;

        let application = match request.application_id {
            Some(id) => Some(self.approved_application_of(request.agent_id, id).await?),
            None => None,
        };
        let note = match (&request.note, &application) {
            (Some(note), _) => Some(note.clone()),
            (None, Some(app)) => Some(format!("Top-up for application {}", app.application_no)),
            (None, None) => None,
        };

        let requested_key = parse_transaction_no(request.transaction_no.as_deref())?;
        let transaction_no = match &application {
            Some(app) => {
                let key = topup_key(app)?;
                if requested_key.as_ref().is_some_and(|requested| *requested != key) {
                    return Err(CreditError::validation(format!(
                        "top-ups for application {} use transaction number {}",
                        app.application_no, key
                    ))
                    .into());
                }
                Some(key)
            }
            None => requested_key,
        };

        let mut command = CreditCommand::new(request.agent_id, request.amount, CreditKind::Topup, note);
        command.transaction_no = transaction_no;
        let receipt = self.engine.credit(command, ctx).await?;

        Ok(TopupResult {
            transaction_no: receipt.transaction.transaction_no,
            amount: receipt.transaction.amount,
            application_no: application.map(|app| app.application_no),
            account: receipt.account,
            replayed: receipt.replayed,
        })
    }

    async fn approved_application_of(
        &self,
        agent_id: AgentId,
        application_id: ApplicationId,
    ) -> Result<CreditApplication, ServiceError> {
        let application = self.workflow.get(application_id).await?;
        if application.agent_id != agent_id {
            return Err(CreditError::validation(format!(
                "application {} belongs to {}",
                application.application_no, application.agent_id
            ))
            .into());
        }
        if application.status != ApplicationStatus::Approved {
            return Err(CreditError::validation(format!(
                "application {} is {}",
                application.application_no,
                application.status.as_str()
            ))
            .into());
        }
        Ok(application)
    }

    // ------------------------------------------------------------------
    // Limit applications
    // ------------------------------------------------------------------

    /// Files a limit increase request for review
    #[instrument(skip(self, request, ctx), fields(agent_id = %request.agent_id))]
    pub async fn apply_credit_limit(
        &self,
        request: ApplyCreditLimitRequest,
        ctx: &RequestContext,
    ) -> Result<CreditApplication, ServiceError> {
        request.validate()?;
        ctx.require_access(request.agent_id)?;
        Ok(self
            .workflow
            .submit(request.agent_id, request.requested_amount, request.reason, ctx)
            .await?)
    }

    /// Approves or rejects a pending application
    #[instrument(skip(self, request, ctx), fields(application_id = %request.application_id))]
    pub async fn process_application(
        &self,
        request: ProcessApplicationRequest,
        ctx: &RequestContext,
    ) -> Result<ApplicationOutcome, ServiceError> {
        let parameters = json!({
            "application_id": request.application_id,
            "approved": request.approved,
            "approved_amount": request.approved_amount,
            "comment": request.comment,
        });

        // an unknown application still gets an audit row, without an agent
        let agent_id = self
            .workflow
            .get(request.application_id)
            .await
            .ok()
            .map(|application| application.agent_id);

        self.auditor
            .audited(ctx, "process_application", agent_id, parameters, self.decide(&request, ctx))
            .await
    }

    async fn decide(
        &self,
        request: &ProcessApplicationRequest,
        ctx: &RequestContext,
    ) -> Result<ApplicationOutcome, ServiceError> {
        request.validate()?;
        let outcome = self
            .workflow
            .process(
                request.application_id,
                request.approved,
                request.approved_amount,
                request.comment.clone(),
                ctx,
            )
            .await?;
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Listings
    // ------------------------------------------------------------------

    /// One page of an agent's ledger, newest first
    pub async fn list_transactions(
        &self,
        request: TransactionListRequest,
        ctx: &RequestContext,
    ) -> Result<Page<CreditTransaction>, ServiceError> {
        ctx.require_access(request.agent_id)?;
        let range = request.range();
        range.validate()?;

        let query = TransactionQuery {
            agent_id: request.agent_id,
            transaction_type: request.transaction_type,
            range,
            page: self.page(request.paging.into()),
        };
        Ok(self.ledger.list_transactions(&query).await.map_err(CreditError::from)?)
    }

    /// Applications, scoped to the caller's own account for agents
    pub async fn list_applications(
        &self,
        request: ApplicationListRequest,
        ctx: &RequestContext,
    ) -> Result<Page<CreditApplication>, ServiceError> {
        let query = ApplicationQuery {
            agent_id: scope_to_caller(ctx, request.agent_id)?,
            status: request.status,
            page: self.page(request.paging.into()),
        };
        Ok(self.ledger.list_applications(&query).await.map_err(CreditError::from)?)
    }

    /// Audit trail for compliance review, newest first
    pub async fn list_audit_logs(
        &self,
        request: AuditListRequest,
        ctx: &RequestContext,
    ) -> Result<Page<PaymentAuditLog>, ServiceError> {
        request.validate()?;
        let range = request.range();
        range.validate()?;

        let query = AuditQuery {
            agent_id: scope_to_caller(ctx, request.agent_id)?,
            operation: request.operation,
            range,
            page: self.page(request.paging.into()),
        };
        Ok(self.audit_log.list_audit_logs(&query).await.map_err(CreditError::from)?)
    }

    fn page(&self, request: PageRequest) -> PageRequest {
        request.normalized(&self.policy)
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    pub async fn open_account(
        &self,
        request: OpenAccountRequest,
        ctx: &RequestContext,
    ) -> Result<CreditAccountView, ServiceError> {
        ctx.require_admin()?;
        Ok(self
            .engine
            .open_account(request.agent_id, request.initial_limit, ctx)
            .await?)
    }

    /// Sets a new total limit directly, outside the application workflow
    pub async fn adjust_limit(
        &self,
        agent_id: AgentId,
        new_total: Decimal,
        ctx: &RequestContext,
    ) -> Result<CreditAccountView, ServiceError> {
        ctx.require_admin()?;
        Ok(self.engine.adjust_limit(agent_id, new_total, ctx).await?)
    }

    pub async fn freeze(&self, agent_id: AgentId, ctx: &RequestContext) -> Result<CreditAccountView, ServiceError> {
        ctx.require_admin()?;
        Ok(self.engine.freeze(agent_id, ctx).await?)
    }

    pub async fn unfreeze(&self, agent_id: AgentId, ctx: &RequestContext) -> Result<CreditAccountView, ServiceError> {
        ctx.require_admin()?;
        Ok(self.engine.unfreeze(agent_id, ctx).await?)
    }

    /// Replays one account's ledger against its stored balances
    #[instrument(skip(self, ctx))]
    pub async fn verify_ledger(
        &self,
        agent_id: AgentId,
        ctx: &RequestContext,
    ) -> Result<LedgerVerification, ServiceError> {
        require_operator(ctx)?;
        let account = self
            .ledger
            .get_account(agent_id)
            .await
            .map_err(CreditError::from)?
            .ok_or_else(|| CreditError::not_found("CreditAccount", agent_id))?;
        let history = self.ledger.ledger_history(agent_id).await.map_err(CreditError::from)?;

        let report = verify_ledger(&account, &history);
        if report.is_consistent() {
            debug!(entries = report.entries_checked, "Ledger verified");
        } else {
            warn!(issues = report.issues.len(), "Ledger verification found issues");
        }
        Ok(report)
    }

    /// Verifies every account, in agent order
    pub async fn verify_all(&self, ctx: &RequestContext) -> Result<Vec<LedgerVerification>, ServiceError> {
        require_operator(ctx)?;
        let accounts = self.ledger.list_accounts().await.map_err(CreditError::from)?;

        let mut reports = Vec::with_capacity(accounts.len());
        for account in accounts {
            reports.push(self.verify_ledger(account.agent_id, ctx).await?);
        }
        info!(
            accounts = reports.len(),
            inconsistent = reports.iter().filter(|r| !r.is_consistent()).count(),
            "Ledger verification finished"
        );
        Ok(reports)
    }

    pub async fn health(&self) -> ServiceHealth {
        let ledger = self.ledger.health_check().await;
        ServiceHealth {
            status: ledger.status,
            ledger,
        }
    }
}

/// One top-up per approved application: the key is derived from its number
fn topup_key(application: &CreditApplication) -> Result<TransactionNo, CreditError> {
    TransactionNo::parse(format!("TOPUP-{}", application.application_no)).map_err(CreditError::from)
}

fn parse_transaction_no(value: Option<&str>) -> Result<Option<TransactionNo>, CreditError> {
    value
        .map(TransactionNo::parse)
        .transpose()
        .map_err(CreditError::from)
}

/// Agents see only their own records; other callers see what they ask for
fn scope_to_caller(ctx: &RequestContext, requested: Option<AgentId>) -> Result<Option<AgentId>, CreditError> {
    match (ctx.caller_type, requested) {
        (CallerType::Agent, None) => Ok(ctx.agent_id),
        (_, Some(agent_id)) => ctx.require_access(agent_id).map(|_| Some(agent_id)),
        (_, None) => Ok(None),
    }
}

fn require_operator(ctx: &RequestContext) -> Result<(), CreditError> {
    match ctx.caller_type {
        CallerType::Admin | CallerType::System => Ok(()),
        CallerType::Agent => Err(CreditError::forbidden(format!(
            "{} may not verify ledgers",
            ctx.caller_id
        ))),
    }
}
