//! Error types for the term-rules validation library.
//!
//! Every fallible operation in this crate returns [`Result`], whose error side is
//! [`TermError`]. Data-quality failures are *not* errors: a rule that finds
//! violating rows still produces a [`RuleResult`](crate::core::RuleResult). Errors
//! are reserved for misconfiguration, query execution problems and the final
//! escalation performed by [`ValidationSession::evaluate`](crate::core::ValidationSession::evaluate).

use thiserror::Error;

/// Message used when a session is evaluated without any recorded rule.
pub const NO_VALIDATIONS_MESSAGE: &str = "No validation checks were added.";

/// The main error type for the term-rules library.
#[derive(Error, Debug)]
pub enum TermError {
    /// A rule or session was constructed with invalid parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A rule name or category is not present in the rule catalogue.
    #[error("Unknown rule '{rule}' in category '{category}'")]
    UnknownRule {
        /// Category that was searched
        category: String,
        /// Rule name that was requested
        rule: String,
    },

    /// `evaluate` was called before any rule was attached.
    #[error("{}", NO_VALIDATIONS_MESSAGE)]
    EmptyValidationSet,

    /// At least one high-impact rule failed.
    ///
    /// The display form lists the failed rule-instance names. When the session was
    /// evaluated with `raise_results`, the JSON report of the failed entries follows
    /// on the next line.
    #[error("FAILED VALIDATION(S): [{}]{}", .failed.join(", "), report_suffix(.report))]
    AggregateValidationFailure {
        /// Rule-instance names that failed with high impact, in attachment order
        failed: Vec<String>,
        /// Pretty-printed JSON report restricted to the failed entries
        report: Option<String>,
    },

    /// A rule's violation query returned something the rule could not interpret.
    #[error("Rule evaluation failed for '{rule}': {message}")]
    RuleEvaluation {
        /// Name of the rule
        rule: String,
        /// Detailed error message
        message: String,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Identifier or pattern rejected before being embedded in SQL.
    #[error("Security error: {0}")]
    SecurityError(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn report_suffix(report: &Option<String>) -> String {
    report
        .as_deref()
        .map(|r| format!("\n{r}"))
        .unwrap_or_default()
}

/// A type alias for `Result<T, TermError>`.
pub type Result<T> = std::result::Result<T, TermError>;

impl TermError {
    /// Creates a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a new rule evaluation error.
    pub fn rule_evaluation(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleEvaluation {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Creates a new unknown-rule error.
    pub fn unknown_rule(category: impl Into<String>, rule: impl Into<String>) -> Self {
        Self::UnknownRule {
            category: category.into(),
            rule: rule.into(),
        }
    }

    /// Returns `true` for errors raised while constructing rules or sessions.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::UnknownRule { .. })
    }

    /// Returns the failed rule-instance names if this is an aggregate failure.
    pub fn failed_validations(&self) -> Option<&[String]> {
        match self {
            Self::AggregateValidationFailure { failed, .. } => Some(failed),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TermError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_validation_set_message() {
        let err = TermError::EmptyValidationSet;
        assert_eq!(err.to_string(), "No validation checks were added.");
    }

    #[test]
    fn test_aggregate_failure_without_report_has_no_braces() {
        let err = TermError::AggregateValidationFailure {
            failed: vec!["ColumnNotBeNull_a".to_string(), "PatternMatch_b".to_string()],
            report: None,
        };
        let message = err.to_string();
        assert_eq!(
            message,
            "FAILED VALIDATION(S): [ColumnNotBeNull_a, PatternMatch_b]"
        );
        assert!(!message.contains('{'));
        assert_eq!(err.failed_validations().map(<[String]>::len), Some(2));
    }

    #[test]
    fn test_aggregate_failure_with_report() {
        let err = TermError::AggregateValidationFailure {
            failed: vec!["X_a".to_string()],
            report: Some("{\"Summary\": {}}".to_string()),
        };
        assert_eq!(err.to_string(), "FAILED VALIDATION(S): [X_a]\n{\"Summary\": {}}");
    }

    #[test]
    fn test_unknown_rule() {
        let err = TermError::unknown_rule("NullValidation", "ColumnBeBlue");
        assert_eq!(
            err.to_string(),
            "Unknown rule 'ColumnBeBlue' in category 'NullValidation'"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_serde_json_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: TermError = parse.unwrap_err().into();
        assert!(matches!(err, TermError::Serialization(_)));
    }
}
