//! Credit Service Layer
//!
//! The facade the surrounding booking system calls into. Every operation
//! takes an explicit [`RequestContext`](domain_credit::RequestContext)
//! carrying the caller identity and HTTP metadata.
//!
//! # Architecture
//!
//! - **Service**: [`CreditService`] wires the engine, application workflow
//!   and audit logger over injected ports
//! - **DTOs**: Request/response types with `validator` rules
//! - **Error Handling**: [`ServiceError`] with stable codes for callers
//! - **Config / Telemetry**: layered configuration and tracing setup
//!
//! # Example
//!
//! ```rust,ignore
//! use credit_service::{CreditService, ServiceConfig};
//!
//! let config = ServiceConfig::load()?;
//! let service = CreditService::connect(&config).await?;
//! let info = service.get_credit_info(agent_id, &ctx).await?;
//! ```

pub mod cli;
pub mod config;
pub mod dto;
pub mod error;
pub mod service;
pub mod telemetry;

pub use config::{LogFormat, LogSettings, ServiceConfig};
pub use error::{ErrorResponse, ServiceError};
pub use service::{CreditService, ServiceHealth};
