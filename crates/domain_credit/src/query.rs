//! Read-side query and paging types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::AgentId;

use crate::application::ApplicationStatus;
use crate::error::CreditError;
use crate::policy::CreditPolicy;
use crate::transaction::TransactionType;

/// One-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    pub fn first(page_size: u32) -> Self {
        Self::new(1, page_size)
    }

    /// Clamps page to at least 1 and size into `1..=max_page_size`
    ///
    /// A zero page size falls back to the policy default.
    pub fn normalized(self, policy: &CreditPolicy) -> Self {
        let page_size = if self.page_size == 0 {
            policy.default_page_size
        } else {
            self.page_size.min(policy.max_page_size)
        };
        Self {
            page: self.page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

/// A page of results with the total match count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            page: request.page,
            page_size: request.page_size,
            total,
        }
    }

    /// Slices an already filtered and ordered collection
    pub fn from_all(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit() as usize)
            .collect();
        Self::new(items, request, total)
    }

    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total: self.total,
        }
    }
}

/// Half-open time window `[from, to)`; either end may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at < to)
    }

    pub fn validate(&self) -> Result<(), CreditError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(CreditError::validation(format!(
                "date range start {} is after end {}",
                from, to
            ))),
            _ => Ok(()),
        }
    }
}

/// Filter for an agent's transaction history (newest first)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    pub agent_id: AgentId,
    pub transaction_type: Option<TransactionType>,
    pub range: DateRange,
    pub page: PageRequest,
}

/// Filter for credit applications (newest first)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationQuery {
    pub agent_id: Option<AgentId>,
    pub status: Option<ApplicationStatus>,
    pub page: PageRequest,
}

/// Filter for payment audit logs (newest first)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    pub agent_id: Option<AgentId>,
    pub operation: Option<String>,
    pub range: DateRange,
    pub page: PageRequest,
}
