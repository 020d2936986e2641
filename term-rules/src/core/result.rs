//! Per-rule result records.
//!
//! A [`RuleResult`] is produced once for every executed rule and stored in the
//! session's [`ValidationReport`](crate::core::ValidationReport). Its JSON form is
//! part of the public contract:
//!
//! ```json
//! {
//!     "validation": "ColumnValuesToBeBetween",
//!     "impact": "low",
//!     "timestamp": "2026-01-01T00:00:00+00:00",
//!     "column": "A",
//!     "result": {
//!         "status": "Fail",
//!         "threshold_pass": false,
//!         "message": "...",
//!         "failing_items": [3, 4, 5],
//!         "failed_number": 3,
//!         "frame_row_number": 5,
//!         "threshold": 0.0,
//!         "failed_percentage": 0.6
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::impact::Impact;
use super::rule::ViolationSet;

/// Message recorded for rules without violations beyond their threshold.
pub const PASS_MESSAGE: &str = "All items passed the validation.";

/// Outcome of a single rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleStatus {
    /// Violations, if any, stayed within the threshold
    Success,
    /// Violations exceeded the threshold, or the rule could not run
    Fail,
}

impl RuleStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RuleStatus::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RuleStatus::Fail)
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleStatus::Success => f.write_str("Success"),
            RuleStatus::Fail => f.write_str("Fail"),
        }
    }
}

/// The nested `result` object of a [`RuleResult`].
///
/// Numeric fields are `None` for synthetic failures (rules that errored or
/// validations that could not be run), which carry only a status and a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub status: RuleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_pass: Option<bool>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failing_items: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_row_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_percentage: Option<f64>,
}

impl RuleOutcome {
    /// Applies the threshold decision to a set of violations.
    ///
    /// The failing fraction is `failed_number / frame_row_number`, defined as `0`
    /// for an empty denominator. The rule passes when nothing failed or when the
    /// fraction does not exceed `threshold`.
    pub fn decide(
        violations: &ViolationSet,
        frame_row_number: u64,
        threshold: f64,
        fail_message: impl Into<String>,
    ) -> Self {
        let failed_number = violations.failed_number();
        let failed_percentage = if frame_row_number == 0 {
            0.0
        } else {
            failed_number as f64 / frame_row_number as f64
        };
        let threshold_pass = failed_percentage <= threshold;
        let status = if failed_number == 0 || threshold_pass {
            RuleStatus::Success
        } else {
            RuleStatus::Fail
        };
        let message = match status {
            RuleStatus::Success => PASS_MESSAGE.to_string(),
            RuleStatus::Fail => fail_message.into(),
        };

        Self {
            status,
            threshold_pass: Some(threshold_pass),
            message,
            failing_items: Some(violations.failing_items()),
            failed_number: Some(failed_number),
            frame_row_number: Some(frame_row_number),
            threshold: Some(threshold),
            failed_percentage: Some(failed_percentage),
        }
    }

    /// Creates a failure carrying only a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: RuleStatus::Fail,
            threshold_pass: None,
            message: message.into(),
            failing_items: None,
            failed_number: None,
            frame_row_number: None,
            threshold: None,
            failed_percentage: None,
        }
    }
}

/// The record produced by executing one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    /// Rule type name, e.g. `ColumnValuesToBeBetween`
    #[serde(rename = "validation")]
    pub rule_name: String,
    /// Missing impacts are read back as high
    #[serde(default = "missing_impact")]
    pub impact: Impact,
    /// RFC 3339 execution timestamp
    pub timestamp: String,
    /// Column name or composite identifier the rule checked
    #[serde(rename = "column")]
    pub target_identifier: String,
    pub result: RuleOutcome,
}

fn missing_impact() -> Impact {
    Impact::High
}

impl RuleResult {
    /// Creates a result stamped with the current time.
    pub fn new(
        rule_name: impl Into<String>,
        target_identifier: impl Into<String>,
        impact: Impact,
        result: RuleOutcome,
    ) -> Self {
        Self {
            rule_name: rule_name.into(),
            impact,
            timestamp: chrono::Utc::now().to_rfc3339(),
            target_identifier: target_identifier.into(),
            result,
        }
    }

    pub fn status(&self) -> RuleStatus {
        self.result.status
    }

    pub fn is_success(&self) -> bool {
        self.result.status.is_success()
    }

    pub fn is_failure(&self) -> bool {
        self.result.status.is_failure()
    }

    pub fn message(&self) -> &str {
        &self.result.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rule::ViolationGroup;
    use serde_json::json;

    fn violations(counts: &[u64]) -> ViolationSet {
        counts
            .iter()
            .enumerate()
            .map(|(i, count)| ViolationGroup::new(json!(i), *count))
            .collect()
    }

    #[test]
    fn test_decide_fail_at_zero_threshold() {
        let outcome = RuleOutcome::decide(&violations(&[1, 1, 1]), 5, 0.0, "too many");
        assert_eq!(outcome.status, RuleStatus::Fail);
        assert_eq!(outcome.failed_number, Some(3));
        assert_eq!(outcome.failed_percentage, Some(0.6));
        assert_eq!(outcome.threshold_pass, Some(false));
        assert_eq!(outcome.message, "too many");
    }

    #[test]
    fn test_decide_threshold_is_inclusive() {
        let outcome = RuleOutcome::decide(&violations(&[1, 1, 1]), 5, 0.6, "too many");
        assert_eq!(outcome.status, RuleStatus::Success);
        assert_eq!(outcome.threshold_pass, Some(true));
        assert_eq!(outcome.message, PASS_MESSAGE);
    }

    #[test]
    fn test_decide_without_violations() {
        let outcome = RuleOutcome::decide(&ViolationSet::default(), 10, 0.0, "unused");
        assert_eq!(outcome.status, RuleStatus::Success);
        assert_eq!(outcome.failing_items, Some(vec![]));
        assert_eq!(outcome.failed_percentage, Some(0.0));
    }

    #[test]
    fn test_decide_empty_frame() {
        let outcome = RuleOutcome::decide(&ViolationSet::default(), 0, 0.0, "unused");
        assert_eq!(outcome.status, RuleStatus::Success);
        assert_eq!(outcome.frame_row_number, Some(0));
        assert_eq!(outcome.failed_percentage, Some(0.0));
    }

    #[test]
    fn test_failure_outcome_serialization_omits_counts() {
        let result = RuleResult::new(
            "FailValidation",
            "N/A",
            Impact::High,
            RuleOutcome::failure("not a validation"),
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["validation"], "FailValidation");
        assert_eq!(value["column"], "N/A");
        assert_eq!(value["impact"], "high");
        assert_eq!(value["result"]["status"], "Fail");
        assert!(value["result"].get("failed_number").is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let outcome = RuleOutcome::decide(&violations(&[2, 1]), 8, 0.25, "duplicates");
        let result = RuleResult::new("ColumnUniquePair", "a - b", Impact::Medium, outcome);

        let json = serde_json::to_string(&result).unwrap();
        let parsed: RuleResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }

    #[test]
    fn test_missing_impact_reads_as_high() {
        let parsed: RuleResult = serde_json::from_value(json!({
            "validation": "Custom",
            "timestamp": "2026-01-01T00:00:00+00:00",
            "column": "x",
            "result": {"status": "Success", "message": "ok"}
        }))
        .unwrap();
        assert_eq!(parsed.impact, Impact::High);
        assert!(parsed.is_success());
    }
}
