//! Service configuration
//!
//! Defaults, overridden by `CREDIT_`-prefixed environment variables. Nested
//! keys use a double underscore, e.g. `CREDIT_DATABASE__URL` or
//! `CREDIT_CREDIT__OVERDRAFT__ENABLED`.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use domain_credit::CreditPolicy;
use infra_db::DatabaseConfig;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Plain,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Plain,
        }
    }
}

/// Service configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub database: DatabaseConfig,
    pub log: LogSettings,
    pub credit: CreditPolicy,
}

impl ServiceConfig {
    /// Loads `.env` (if present) and then the environment
    ///
    /// # Errors
    ///
    /// Returns an error when a variable cannot be parsed into its field
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_source(
            Environment::with_prefix("CREDIT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
    }

    /// Builds the configuration from a single environment source
    pub fn from_source(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()
    }
}
