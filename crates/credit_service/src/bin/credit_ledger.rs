//! Credit Ledger - maintenance binary
//!
//! # Usage
//!
//! ```bash
//! # Apply pending schema migrations
//! credit-ledger migrate
//!
//! # Replay every account's ledger (or one agent's) against stored balances
//! credit-ledger verify
//! credit-ledger verify 1001
//!
//! # Check database connectivity
//! credit-ledger health
//!
//! # Usage for any command
//! credit-ledger --help
//! ```
//!
//! # Environment Variables
//!
//! * `CREDIT_DATABASE__URL` - PostgreSQL connection string
//! * `CREDIT_LOG__LEVEL` - Log filter when `RUST_LOG` is unset (default: info)
//! * `CREDIT_LOG__FORMAT` - `plain` or `json`
//! * `CREDIT_CREDIT__MAX_RETRIES` - Optimistic retry budget (default: 3)

use anyhow::{bail, Context, Result};
use clap::Parser;
use core_kernel::{AdapterHealth, AgentId};
use credit_service::cli::{Cli, Command};
use credit_service::{telemetry::init_tracing, CreditService, ServiceConfig};
use domain_credit::RequestContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ServiceConfig::load().context("failed to load configuration")?;
    init_tracing(&config.log);

    match cli.subcommand() {
        Command::Migrate => migrate(&config).await,
        Command::Verify { agent } => verify(&config, agent).await,
        Command::Health => health(&config).await,
    }
}

async fn migrate(config: &ServiceConfig) -> Result<()> {
    let pool = infra_db::create_pool(config.database.clone()).await?;
    infra_db::run_migrations(&pool).await?;
    tracing::info!("Migrations applied");
    Ok(())
}

async fn verify(config: &ServiceConfig, agent: Option<AgentId>) -> Result<()> {
    let service = CreditService::connect(config).await?;
    let ctx = RequestContext::system("credit-ledger-verify");

    let reports = match agent {
        Some(agent_id) => vec![service.verify_ledger(agent_id, &ctx).await?],
        None => service.verify_all(&ctx).await?,
    };

    let mut failures = 0;
    for report in &reports {
        if report.is_consistent() {
            println!("{}: ok ({} entries)", report.agent_id, report.entries_checked);
        } else {
            failures += 1;
            println!("{}: {} issue(s)", report.agent_id, report.issues.len());
            for issue in &report.issues {
                println!("  {}", serde_json::to_string(issue)?);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} ledgers are inconsistent", failures, reports.len());
    }
    Ok(())
}

async fn health(config: &ServiceConfig) -> Result<()> {
    let service = CreditService::connect(config).await?;
    let health = service.health().await;
    println!("{}", serde_json::to_string_pretty(&health)?);

    if health.status != AdapterHealth::Healthy {
        bail!("ledger store is {:?}", health.status);
    }
    Ok(())
}
