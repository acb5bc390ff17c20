//! Strongly-typed identifiers for domain entities
//!
//! Agents, bookings and administrators are owned by the surrounding system
//! and keyed by its numeric primary keys. Newtype wrappers keep them from
//! being mixed up. Transaction and application numbers are business keys
//! generated here and guaranteed unique by the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps an existing numeric key
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the underlying numeric key
            pub const fn value(&self) -> i64 {
                self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let raw = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                raw.parse::<i64>()
                    .map(Self)
                    .map_err(|_| CoreError::malformed(stringify!($name), s))
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

macro_rules! define_number {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Generates a new globally unique, time-ordered number
            pub fn generate() -> Self {
                Self(format!("{}{}", $prefix, Uuid::now_v7().simple()).to_uppercase())
            }

            /// Accepts a caller-supplied number
            ///
            /// # Errors
            ///
            /// Returns `CoreError::MalformedIdentifier` when the value is empty, longer
            /// than 64 characters, or contains characters other than ASCII
            /// letters, digits, `-` and `_`.
            pub fn parse(value: impl Into<String>) -> Result<Self, CoreError> {
                let value = value.into();
                let valid = !value.is_empty()
                    && value.len() <= 64
                    && value
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
                if !valid {
                    return Err(CoreError::malformed(stringify!($name), value));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns the prefix used by generated numbers
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(number: $name) -> String {
                number.0
            }
        }
    };
}

// Keys owned by the surrounding system
define_id!(AgentId, "AGT");
define_id!(BookingId, "BKG");
define_id!(AdminId, "ADM");

// Keys owned by the credit ledger
define_id!(ApplicationId, "APP");

// Business numbers
define_number!(TransactionNo, "CT");
define_number!(ApplicationNo, "CA");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_display() {
        let id = AgentId::new(42);
        assert_eq!(id.to_string(), "AGT-42");
    }

    #[test]
    fn test_id_parsing() {
        let parsed: AgentId = "AGT-7".parse().unwrap();
        assert_eq!(parsed, AgentId::new(7));
        let bare: BookingId = "99".parse().unwrap();
        assert_eq!(bare.value(), 99);
        assert!("AGT-x".parse::<AgentId>().is_err());
    }

    #[test]
    fn test_generated_numbers_are_unique() {
        let a = TransactionNo::generate();
        let b = TransactionNo::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("CT"));
    }
}
