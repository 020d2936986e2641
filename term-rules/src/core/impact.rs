//! Rule impact levels.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TermError;

/// Severity of a rule, consulted only when a session is evaluated.
///
/// Only [`Impact::High`] failures make
/// [`ValidationSession::evaluate`](crate::core::ValidationSession::evaluate)
/// return an error. Medium and low failures are reported through logs.
///
/// # Examples
///
/// ```rust
/// use term_rules::core::Impact;
///
/// assert!(Impact::High.is_blocking());
/// assert!(!Impact::Medium.is_blocking());
/// assert_eq!("medium".parse::<Impact>().unwrap(), Impact::Medium);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    /// Logged at error level, never escalated
    Low,
    /// Logged at warning level, never escalated
    Medium,
    /// Escalated into an aggregate failure
    High,
}

impl Default for Impact {
    fn default() -> Self {
        Impact::Low
    }
}

impl Impact {
    /// Returns the lowercase name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Low => "low",
            Impact::Medium => "medium",
            Impact::High => "high",
        }
    }

    /// Returns `true` if a failure at this impact fails the whole evaluation.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Impact::High)
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Impact {
    type Err = TermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Impact::Low),
            "medium" => Ok(Impact::Medium),
            "high" => Ok(Impact::High),
            other => Err(TermError::Configuration(format!(
                "Unknown impact '{other}', expected one of low, medium, high"
            ))),
        }
    }
}

// Accepts any casing, like `FromStr`.
impl<'de> Deserialize<'de> for Impact {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
