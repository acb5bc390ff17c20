//! Pre-built Test Fixtures
//!
//! Ready-to-use test data for agents, contexts and amounts. Fixtures are
//! consistent and predictable so assertions can use literal values.

use chrono::{DateTime, TimeZone, Utc};
use core_kernel::{AdminId, AgentId, BookingId, TransactionNo};
use domain_credit::{AgentProfile, RequestContext};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fixture for agents known to the directory
pub struct AgentFixtures;

impl AgentFixtures {
    /// The default agent used by single-agent tests
    pub fn agent_id() -> AgentId {
        AgentId::new(1001)
    }

    /// Another agent, for access-control tests
    pub fn other_agent_id() -> AgentId {
        AgentId::new(1002)
    }

    /// An active agent profile
    pub fn active(agent_id: AgentId) -> AgentProfile {
        AgentProfile {
            agent_id,
            display_name: format!("Sunrise Travel {}", agent_id.value()),
            discount_rate: dec!(0.0500),
            active: true,
        }
    }

    /// A deactivated agent profile
    pub fn inactive(agent_id: AgentId) -> AgentProfile {
        AgentProfile {
            active: false,
            ..Self::active(agent_id)
        }
    }
}

/// Fixture for caller contexts
pub struct ContextFixtures;

impl ContextFixtures {
    pub fn admin_id() -> AdminId {
        AdminId::new(9)
    }

    /// Administrator with HTTP metadata attached
    pub fn admin() -> RequestContext {
        RequestContext::admin(Self::admin_id()).with_http(
            Some("192.168.10.5".to_string()),
            Some("Mozilla/5.0 (X11; Linux x86_64)".to_string()),
            Some("/admin/credit".to_string()),
            None,
        )
    }

    /// Agent acting on their own account
    pub fn agent(agent_id: AgentId) -> RequestContext {
        RequestContext::agent(agent_id).with_http(
            Some("10.0.0.20".to_string()),
            Some("AgencyPortal/2.1".to_string()),
            Some("/agent/credit".to_string()),
            None,
        )
    }

    pub fn system() -> RequestContext {
        RequestContext::system("settlement-job")
    }
}

/// Fixture for monetary amounts
pub struct AmountFixtures;

impl AmountFixtures {
    /// Standard starting limit
    pub fn limit() -> Decimal {
        dec!(1000.00)
    }

    /// A typical tour booking
    pub fn booking() -> Decimal {
        dec!(300.00)
    }

    /// More than the standard limit
    pub fn oversized() -> Decimal {
        dec!(1200.00)
    }
}

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    pub fn booking_id() -> BookingId {
        BookingId::new(880_001)
    }

    /// A caller-supplied transaction number
    ///
    /// # Panics
    ///
    /// Panics if `suffix` makes the number invalid
    pub fn transaction_no(suffix: &str) -> TransactionNo {
        TransactionNo::parse(format!("BKG-880001-{}", suffix)).expect("valid transaction number")
    }
}

/// Fixture for timestamps
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Jan 1, 2024 00:00 UTC
    pub fn start_of_2024() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_agents_are_distinct() {
        assert_ne!(AgentFixtures::agent_id(), AgentFixtures::other_agent_id());
        assert!(AgentFixtures::active(AgentFixtures::agent_id()).active);
        assert!(!AgentFixtures::inactive(AgentFixtures::agent_id()).active);
    }

    #[test]
    fn test_admin_fixture_is_admin() {
        assert!(ContextFixtures::admin().is_admin());
        assert_eq!(IdFixtures::transaction_no("A").as_str(), "BKG-880001-A");
    }
}
