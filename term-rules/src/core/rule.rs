//! The [`Rule`] trait and the shared execution logic every rule goes through.
//!
//! A rule describes *which* rows or groups of a table violate it; the decision
//! of whether that amount of violation is acceptable is made once, in
//! [`Rule::execute`], by comparing the failing fraction against the rule's
//! threshold.
//!
//! # Implementing a rule
//!
//! ```rust
//! use async_trait::async_trait;
//! use datafusion::prelude::SessionContext;
//! use term_rules::core::{current_validation_context, query_violations, Rule, ViolationSet};
//! use term_rules::prelude::*;
//! use term_rules::security::SqlSecurity;
//!
//! #[derive(Debug)]
//! struct NoNegativeTemperatures;
//!
//! #[async_trait]
//! impl Rule for NoNegativeTemperatures {
//!     fn name(&self) -> &str {
//!         "NoNegativeTemperatures"
//!     }
//!
//!     fn target(&self) -> &str {
//!         "temperature"
//!     }
//!
//!     fn fail_message(&self) -> String {
//!         "Temperatures below zero were recorded.".to_string()
//!     }
//!
//!     async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
//!         let table = current_validation_context();
//!         let sql = format!(
//!             "SELECT temperature AS failing_key, COUNT(*) AS failing_count \
//!              FROM {} WHERE temperature < 0 GROUP BY temperature",
//!             SqlSecurity::quote_identifier(table.table_name())?
//!         );
//!         query_violations(ctx, &sql).await
//!     }
//! }
//! ```

use arrow::array::{Array, ArrayRef, Int64Array};
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use datafusion::scalar::ScalarValue;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use super::impact::Impact;
use super::result::{RuleOutcome, RuleResult};
use super::validation_context::current_validation_context;
use crate::prelude::*;
use crate::security::SqlSecurity;

/// Column name rules use for the group key in violation queries.
pub const FAILING_KEY_COLUMN: &str = "failing_key";

/// Column name rules use for the per-group count in violation queries.
pub const FAILING_COUNT_COLUMN: &str = "failing_count";

/// Impact and threshold shared by every rule.
///
/// Deserializes with defaults (`low`, `0.0`), so rule parameter objects can
/// flatten it in and omit either field.
///
/// ```rust
/// use term_rules::core::{Impact, RuleOptions};
///
/// let options = RuleOptions::new().with_impact(Impact::High).with_threshold(0.1);
/// assert!(options.validate().is_ok());
/// assert!(RuleOptions::new().with_threshold(1.5).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleOptions {
    #[serde(default)]
    pub impact: Impact,
    #[serde(default)]
    pub threshold: f64,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleOptions {
    /// Built-in defaults: low impact, zero tolerance.
    pub fn new() -> Self {
        Self {
            impact: Impact::Low,
            threshold: 0.0,
        }
    }

    /// Defaults for user-defined rules that do not declare options: high impact,
    /// zero tolerance.
    pub fn custom() -> Self {
        Self {
            impact: Impact::High,
            threshold: 0.0,
        }
    }

    pub fn with_impact(mut self, impact: Impact) -> Self {
        self.impact = impact;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Checks that the threshold lies in `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(TermError::Configuration(format!(
                "Threshold must be between 0.0 and 1.0, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// One violating group: its key and how many rows (or columns) it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationGroup {
    pub key: serde_json::Value,
    pub count: u64,
}

impl ViolationGroup {
    pub fn new(key: impl Into<serde_json::Value>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}

/// The violating groups returned by a rule's failure predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViolationSet {
    groups: Vec<ViolationGroup>,
}

impl ViolationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, group: ViolationGroup) {
        self.groups.push(group);
    }

    pub fn groups(&self) -> &[ViolationGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Sum of the per-group counts.
    pub fn failed_number(&self) -> u64 {
        self.groups.iter().map(|g| g.count).sum()
    }

    /// Distinct group keys, in query order.
    pub fn failing_items(&self) -> Vec<serde_json::Value> {
        let mut items: Vec<serde_json::Value> = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            if !items.contains(&group.key) {
                items.push(group.key.clone());
            }
        }
        items
    }
}

impl FromIterator<ViolationGroup> for ViolationSet {
    fn from_iter<I: IntoIterator<Item = ViolationGroup>>(iter: I) -> Self {
        Self {
            groups: iter.into_iter().collect(),
        }
    }
}

/// A validation check that can be attached to a
/// [`ValidationSession`](crate::core::ValidationSession).
///
/// Implementors supply the failure predicate ([`violations`](Rule::violations))
/// and the fail message. Threshold handling, result construction and the
/// failing-fraction denominator have defaults shared by all rules.
#[async_trait]
pub trait Rule: Debug + Send + Sync {
    /// Rule type name, used as the first half of the rule-instance name.
    fn name(&self) -> &str;

    /// Column name or composite identifier the rule checks.
    fn target(&self) -> &str;

    /// Impact and threshold. User-defined rules default to high impact.
    fn options(&self) -> RuleOptions {
        RuleOptions::custom()
    }

    /// Message recorded when the rule fails.
    fn fail_message(&self) -> String;

    /// Returns the violating groups of the table in the current validation context.
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet>;

    /// Denominator of the failing fraction; the table's row count by default.
    async fn frame_size(&self, ctx: &SessionContext) -> Result<u64> {
        count_rows(ctx).await
    }

    /// Runs the rule and applies the threshold decision.
    ///
    /// Data-quality failures are reported through the returned result; an `Err`
    /// means the rule could not be evaluated at all.
    async fn execute(&self, ctx: &SessionContext) -> Result<RuleResult> {
        let options = self.options();
        let violations = self.violations(ctx).await?;
        let frame_row_number = self.frame_size(ctx).await?;
        let outcome = RuleOutcome::decide(
            &violations,
            frame_row_number,
            options.threshold,
            self.fail_message(),
        );
        Ok(RuleResult::new(
            self.name(),
            self.target(),
            options.impact,
            outcome,
        ))
    }
}

/// A boxed rule, as stored by the catalogue and the session.
pub type BoxedRule = Box<dyn Rule>;

/// Counts the rows of the table in the current validation context.
pub async fn count_rows(ctx: &SessionContext) -> Result<u64> {
    let validation_ctx = current_validation_context();
    let table = SqlSecurity::quote_identifier(validation_ctx.table_name())?;
    let sql = format!("SELECT COUNT(*) AS row_count FROM {table}");

    let batches = ctx.sql(&sql).await?.collect().await?;
    let mut total = 0u64;
    for batch in &batches {
        if batch.num_rows() == 0 {
            continue;
        }
        let counts = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| TermError::Internal("Failed to extract row count".to_string()))?;
        total += counts.value(0).max(0) as u64;
    }
    Ok(total)
}

/// Executes a violation query and collects its groups.
///
/// The query must return the group key as its first column and an `Int64`
/// count as its second (see [`FAILING_KEY_COLUMN`] and [`FAILING_COUNT_COLUMN`]).
pub async fn query_violations(ctx: &SessionContext, sql: &str) -> Result<ViolationSet> {
    let batches = ctx.sql(sql).await?.collect().await?;

    let mut violations = ViolationSet::new();
    for batch in &batches {
        if batch.num_columns() < 2 {
            return Err(TermError::rule_evaluation(
                "violation query",
                format!(
                    "expected a key and a count column, got {} column(s)",
                    batch.num_columns()
                ),
            ));
        }
        let keys = batch.column(0);
        let counts = batch
            .column(1)
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| {
                TermError::rule_evaluation(
                    "violation query",
                    format!(
                        "count column must be Int64, got {}",
                        batch.column(1).data_type()
                    ),
                )
            })?;

        for row in 0..batch.num_rows() {
            let count = if counts.is_null(row) {
                0
            } else {
                counts.value(row).max(0) as u64
            };
            violations.push(ViolationGroup::new(scalar_to_json(keys, row)?, count));
        }
    }
    Ok(violations)
}

/// Converts one cell of an Arrow array into a JSON scalar.
///
/// Integers, floats, booleans and strings keep their JSON type; anything else
/// (dates, decimals, nested values) is rendered through its display form.
pub fn scalar_to_json(array: &ArrayRef, row: usize) -> Result<serde_json::Value> {
    use serde_json::Value;

    if array.is_null(row) {
        return Ok(Value::Null);
    }

    let value = match ScalarValue::try_from_array(array, row)? {
        ScalarValue::Boolean(Some(v)) => Value::Bool(v),
        ScalarValue::Int8(Some(v)) => Value::from(v),
        ScalarValue::Int16(Some(v)) => Value::from(v),
        ScalarValue::Int32(Some(v)) => Value::from(v),
        ScalarValue::Int64(Some(v)) => Value::from(v),
        ScalarValue::UInt8(Some(v)) => Value::from(v),
        ScalarValue::UInt16(Some(v)) => Value::from(v),
        ScalarValue::UInt32(Some(v)) => Value::from(v),
        ScalarValue::UInt64(Some(v)) => Value::from(v),
        ScalarValue::Float32(Some(v)) => float_to_json(f64::from(v)),
        ScalarValue::Float64(Some(v)) => float_to_json(v),
        ScalarValue::Utf8(Some(v))
        | ScalarValue::LargeUtf8(Some(v))
        | ScalarValue::Utf8View(Some(v)) => Value::String(v),
        other if other.is_null() => Value::Null,
        other => Value::String(other.to_string()),
    };
    Ok(value)
}

fn float_to_json(v: f64) -> serde_json::Value {
    serde_json::Number::from_f64(v)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(v.to_string()))
}

#[cfg(test)]
mod tests {
    use super::super::validation_context::{ValidationContext, CURRENT_CONTEXT};
    use super::*;
    use crate::test_helpers::{execute_rule_with_context, int_batch};
    use serde_json::json;

    #[derive(Debug)]
    struct AboveTen;

    #[async_trait]
    impl Rule for AboveTen {
        fn name(&self) -> &str {
            "AboveTen"
        }

        fn target(&self) -> &str {
            "value"
        }

        fn fail_message(&self) -> String {
            "values above ten".to_string()
        }

        async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
            let table = current_validation_context();
            let sql = format!(
                "SELECT value AS failing_key, COUNT(*) AS failing_count FROM {} \
                 WHERE value > 10 GROUP BY value ORDER BY failing_key",
                SqlSecurity::quote_identifier(table.table_name())?
            );
            query_violations(ctx, &sql).await
        }
    }

    #[test]
    fn test_rule_options_validation() {
        assert!(RuleOptions::new().validate().is_ok());
        assert!(RuleOptions::new().with_threshold(1.0).validate().is_ok());
        assert!(RuleOptions::new().with_threshold(-0.1).validate().is_err());
        assert!(RuleOptions::new().with_threshold(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_rule_options_deserialize_defaults() {
        let options: RuleOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(options, RuleOptions::new());

        let options: RuleOptions = serde_json::from_value(json!({"impact": "high"})).unwrap();
        assert_eq!(options.impact, Impact::High);
        assert_eq!(options.threshold, 0.0);
    }

    #[test]
    fn test_violation_set_counts() {
        let set: ViolationSet = vec![
            ViolationGroup::new("a", 3),
            ViolationGroup::new("b", 2),
            ViolationGroup::new("a", 1),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.failed_number(), 6);
        assert_eq!(set.failing_items(), vec![json!("a"), json!("b")]);
    }

    #[tokio::test]
    async fn test_custom_rule_execute_defaults_to_high_impact() {
        let ctx = SessionContext::new();
        ctx.register_batch("data", int_batch("value", vec![Some(1), Some(11), Some(12), None]))
            .unwrap();

        let result = execute_rule_with_context(&AboveTen, &ctx, "data").await.unwrap();
        assert_eq!(result.rule_name, "AboveTen");
        assert_eq!(result.target_identifier, "value");
        assert_eq!(result.impact, Impact::High);
        assert!(result.is_failure());
        assert_eq!(result.result.failed_number, Some(2));
        assert_eq!(result.result.frame_row_number, Some(4));
        assert_eq!(result.result.failing_items, Some(vec![json!(11), json!(12)]));
        assert_eq!(result.message(), "values above ten");
    }

    #[tokio::test]
    async fn test_count_rows_uses_context_table() {
        let ctx = SessionContext::new();
        ctx.register_batch("orders", int_batch("value", vec![Some(1), Some(2)]))
            .unwrap();

        let rows = CURRENT_CONTEXT
            .scope(ValidationContext::new("orders"), count_rows(&ctx))
            .await
            .unwrap();
        assert_eq!(rows, 2);
    }
}
