//! Equality between two columns of the same row.

use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use serde::Deserialize;
use tracing::instrument;

use super::common::{boxed, context_table, grouped_violations_sql, parse_params};
use crate::catalogue::{RuleCatalogue, RuleCategory, RuleDescriptor};
use crate::core::{query_violations, Rule, RuleOptions, ViolationSet};
use crate::prelude::*;
use crate::security::SqlSecurity;

/// Two columns must hold equal values in every row.
///
/// Rows where either side is null are not compared. With `group_by_combined`
/// (the default) each failing item names both values, e.g.
/// `"1 - column a - column b - 2"`; otherwise it is the value of `column`.
#[derive(Debug, Clone)]
pub struct PairColumnEquality {
    column: String,
    target_column: String,
    target: String,
    group_by_combined: bool,
    options: RuleOptions,
}

fn default_group_by_combined() -> bool {
    true
}

#[derive(Deserialize)]
struct PairParams {
    column: String,
    target_column: String,
    #[serde(default = "default_group_by_combined")]
    group_by_combined: bool,
    #[serde(flatten)]
    options: RuleOptions,
}

impl PairColumnEquality {
    pub fn new(
        column: impl Into<String>,
        target_column: impl Into<String>,
        options: RuleOptions,
    ) -> Result<Self> {
        options.validate()?;
        let column = column.into();
        let target_column = target_column.into();
        let target = format!("{column}-{target_column}");
        Ok(Self {
            column,
            target_column,
            target,
            group_by_combined: true,
            options,
        })
    }

    /// Reports failing items by the value of `column` alone when `false`.
    pub fn with_group_by_combined(mut self, group_by_combined: bool) -> Self {
        self.group_by_combined = group_by_combined;
        self
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: PairParams = parse_params("PairColumnEquality", params)?;
        Ok(Self::new(p.column, p.target_column, p.options)?
            .with_group_by_combined(p.group_by_combined))
    }

    fn key_expr(&self, column: &str, target_column: &str) -> String {
        if !self.group_by_combined {
            return column.to_string();
        }
        let separator = SqlSecurity::quote_literal(&format!(
            " - column {} - column {} - ",
            self.column, self.target_column
        ));
        format!("concat(CAST({column} AS VARCHAR), {separator}, CAST({target_column} AS VARCHAR))")
    }
}

#[async_trait]
impl Rule for PairColumnEquality {
    fn name(&self) -> &str {
        "PairColumnEquality"
    }

    fn target(&self) -> &str {
        &self.target
    }

    fn options(&self) -> RuleOptions {
        self.options
    }

    fn fail_message(&self) -> String {
        format!(
            "The column '{}' is not equal to the column '{}'.",
            self.column, self.target_column
        )
    }

    #[instrument(skip(self, ctx), fields(column = %self.column, target_column = %self.target_column))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        let table = context_table()?;
        let column = SqlSecurity::quote_identifier(&self.column)?;
        let target_column = SqlSecurity::quote_identifier(&self.target_column)?;
        let predicate = format!("{column} <> {target_column}");
        let sql = grouped_violations_sql(
            &table,
            &self.key_expr(&column, &target_column),
            &predicate,
            None,
        );
        query_violations(ctx, &sql).await
    }
}

pub(crate) fn register(catalogue: &mut RuleCatalogue) {
    catalogue.register(RuleDescriptor::new(
        "PairColumnEquality",
        RuleCategory::EqualityValidation,
        "Two columns hold equal values in every row",
        |p| boxed(PairColumnEquality::from_params(p)),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RuleStatus;
    use crate::test_helpers::{batch, execute_on, int_array};
    use serde_json::json;

    fn pairs() -> arrow::record_batch::RecordBatch {
        batch(vec![
            ("a", int_array(vec![Some(1), Some(2), Some(3), Some(3), None])),
            ("b", int_array(vec![Some(1), Some(5), Some(4), Some(4), Some(7)])),
        ])
    }

    #[tokio::test]
    async fn test_pair_equality_combined() {
        let rule = PairColumnEquality::new("a", "b", RuleOptions::new()).unwrap();
        assert_eq!(rule.target(), "a-b");

        let result = execute_on(&rule, pairs()).await;
        assert_eq!(result.status(), RuleStatus::Fail);
        assert_eq!(result.result.failed_number, Some(3));
        assert_eq!(
            result.result.failing_items,
            Some(vec![
                json!("2 - column a - column b - 5"),
                json!("3 - column a - column b - 4"),
            ])
        );
    }

    #[tokio::test]
    async fn test_pair_equality_by_column() {
        let rule = PairColumnEquality::from_params(json!({
            "column": "a",
            "target_column": "b",
            "group_by_combined": false,
            "threshold": 0.6,
        }))
        .unwrap();

        let result = execute_on(&rule, pairs()).await;
        assert_eq!(result.status(), RuleStatus::Success);
        assert_eq!(result.result.failing_items, Some(vec![json!(2), json!(3)]));
        assert_eq!(result.result.failed_percentage, Some(0.6));
    }
}
