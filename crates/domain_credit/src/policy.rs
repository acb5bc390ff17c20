//! Credit policy configuration
//!
//! Loaded once at startup and injected into the engine. All knobs have
//! conservative defaults: no overdraft, three optimistic retries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Overdraft tolerance beyond the approved limit
///
/// A debit may push available credit below zero only when the individual
/// call authorises it, the policy is enabled, and the resulting deficit stays
/// within `max_overdraft`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverdraftPolicy {
    pub enabled: bool,
    /// Largest tolerated negative available credit (a positive number)
    pub max_overdraft: Decimal,
}

impl Default for OverdraftPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            max_overdraft: Decimal::ZERO,
        }
    }
}

impl OverdraftPolicy {
    /// Decides whether a debit leaving `projected_available` may proceed
    pub fn permits(&self, call_authorized: bool, projected_available: Decimal) -> bool {
        call_authorized && self.enabled && -projected_available <= self.max_overdraft
    }
}

/// Tunables of the credit core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditPolicy {
    /// Retries after a lost version race before the conflict is reported
    pub max_retries: u32,
    pub overdraft: OverdraftPolicy,
    /// Maximum stored length of user-agent, URL and referer audit fields
    pub audit_field_max_len: usize,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for CreditPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            overdraft: OverdraftPolicy::default(),
            audit_field_max_len: 500,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_overdraft_requires_call_and_policy() {
        let disabled = OverdraftPolicy::default();
        assert!(!disabled.permits(true, dec!(-1)));

        let enabled = OverdraftPolicy {
            enabled: true,
            max_overdraft: dec!(200),
        };
        assert!(!enabled.permits(false, dec!(-1)));
        assert!(enabled.permits(true, dec!(-200)));
        assert!(!enabled.permits(true, dec!(-200.01)));
    }
}
