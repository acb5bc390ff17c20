//! Caller context passed explicitly through every call
//!
//! The surrounding request layer authenticates the caller and hands the
//! resulting identity, together with HTTP metadata for auditing, to the
//! credit facade. Nothing in this crate discovers the caller on its own.

use serde::{Deserialize, Serialize};

use core_kernel::{AdminId, AgentId};

use crate::error::CreditError;

/// Kind of principal behind a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallerType {
    Agent,
    Admin,
    System,
}

impl CallerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallerType::Agent => "AGENT",
            CallerType::Admin => "ADMIN",
            CallerType::System => "SYSTEM",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "AGENT" => Some(CallerType::Agent),
            "ADMIN" => Some(CallerType::Admin),
            "SYSTEM" => Some(CallerType::System),
            _ => None,
        }
    }
}

/// Identity and request metadata of the current caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Stable caller identifier, recorded as `created_by` on ledger entries
    pub caller_id: String,
    pub caller_type: CallerType,
    /// Set when the caller is a travel agent
    pub agent_id: Option<AgentId>,
    /// Set when the caller is an administrator
    pub admin_id: Option<AdminId>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_url: Option<String>,
    pub referer: Option<String>,
}

impl RequestContext {
    /// Context for a travel agent acting on their own account
    pub fn agent(agent_id: AgentId) -> Self {
        Self {
            caller_id: agent_id.to_string(),
            caller_type: CallerType::Agent,
            agent_id: Some(agent_id),
            admin_id: None,
            ip_address: None,
            user_agent: None,
            request_url: None,
            referer: None,
        }
    }

    /// Context for an administrator
    pub fn admin(admin_id: AdminId) -> Self {
        Self {
            caller_id: admin_id.to_string(),
            caller_type: CallerType::Admin,
            agent_id: None,
            admin_id: Some(admin_id),
            ip_address: None,
            user_agent: None,
            request_url: None,
            referer: None,
        }
    }

    /// Context for scheduled jobs and internal callers
    pub fn system(name: impl Into<String>) -> Self {
        Self {
            caller_id: name.into(),
            caller_type: CallerType::System,
            agent_id: None,
            admin_id: None,
            ip_address: None,
            user_agent: None,
            request_url: None,
            referer: None,
        }
    }

    /// Attaches HTTP metadata captured by the request layer
    pub fn with_http(
        mut self,
        ip_address: Option<String>,
        user_agent: Option<String>,
        request_url: Option<String>,
        referer: Option<String>,
    ) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self.request_url = request_url;
        self.referer = referer;
        self
    }

    /// Actor name stored on ledger rows
    pub fn actor(&self) -> &str {
        &self.caller_id
    }

    pub fn is_admin(&self) -> bool {
        self.caller_type == CallerType::Admin
    }

    /// Fails unless the caller is an administrator
    pub fn require_admin(&self) -> Result<AdminId, CreditError> {
        match (self.caller_type, self.admin_id) {
            (CallerType::Admin, Some(admin_id)) => Ok(admin_id),
            _ => Err(CreditError::forbidden(format!(
                "{} is not an administrator",
                self.caller_id
            ))),
        }
    }

    /// Agents may only touch their own account; admins and system callers any
    pub fn require_access(&self, agent_id: AgentId) -> Result<(), CreditError> {
        match self.caller_type {
            CallerType::Admin | CallerType::System => Ok(()),
            CallerType::Agent if self.agent_id == Some(agent_id) => Ok(()),
            CallerType::Agent => Err(CreditError::forbidden(format!(
                "{} may not act on the account of {}",
                self.caller_id, agent_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_can_only_access_own_account() {
        let ctx = RequestContext::agent(AgentId::new(1));
        assert!(ctx.require_access(AgentId::new(1)).is_ok());
        assert!(matches!(
            ctx.require_access(AgentId::new(2)),
            Err(CreditError::Forbidden(_))
        ));
        assert!(ctx.require_admin().is_err());
    }

    #[test]
    fn test_admin_has_access_everywhere() {
        let ctx = RequestContext::admin(AdminId::new(9));
        assert!(ctx.require_access(AgentId::new(1)).is_ok());
        assert_eq!(ctx.require_admin().unwrap(), AdminId::new(9));
        assert_eq!(ctx.actor(), "ADM-9");
    }
}
