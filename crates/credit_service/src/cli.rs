//! Command line for the `credit-ledger` maintenance binary

use clap::{Parser, Subcommand};
use core_kernel::AgentId;

#[derive(Parser, Debug)]
#[command(
    name = "credit-ledger",
    about = "Maintenance commands for the travel agent credit ledger",
    version
)]
pub struct Cli {
    /// Defaults to `health`
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Apply pending schema migrations
    Migrate,
    /// Replay ledgers against stored balances
    Verify {
        /// Agent to check, e.g. `1001` or `AGT-1001`; every account when omitted
        agent: Option<AgentId>,
    },
    /// Check database connectivity
    Health,
}

impl Cli {
    pub fn subcommand(&self) -> Command {
        self.command.clone().unwrap_or(Command::Health)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_health() {
        let cli = Cli::try_parse_from(["credit-ledger"]).unwrap();
        assert_eq!(cli.subcommand(), Command::Health);
    }

    #[test]
    fn test_verify_accepts_prefixed_and_bare_agent_ids() {
        let cli = Cli::try_parse_from(["credit-ledger", "verify", "AGT-1001"]).unwrap();
        assert_eq!(cli.subcommand(), Command::Verify { agent: Some(AgentId::new(1001)) });

        let cli = Cli::try_parse_from(["credit-ledger", "verify", "42"]).unwrap();
        assert_eq!(cli.subcommand(), Command::Verify { agent: Some(AgentId::new(42)) });

        let cli = Cli::try_parse_from(["credit-ledger", "verify"]).unwrap();
        assert_eq!(cli.subcommand(), Command::Verify { agent: None });
    }

    #[test]
    fn test_bad_input_is_a_usage_error() {
        assert!(Cli::try_parse_from(["credit-ledger", "verify", "agent-x"]).is_err());
        assert!(Cli::try_parse_from(["credit-ledger", "rebuild"]).is_err());

        let help = Cli::try_parse_from(["credit-ledger", "--help"]).unwrap_err();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
