//! Prelude for commonly used types and traits in term-rules.

pub use crate::catalogue::{RuleCategory, RuleSpec};
pub use crate::core::{
    Impact, Rule, RuleOptions, RuleResult, RuleStatus, Validation, ValidationReport,
    ValidationSession, ValidationSessionConfig,
};
pub use crate::error::{Result, TermError};
pub use crate::formatters::{FormatterConfig, ResultFormatter};
pub use crate::logging::LogConfig;
