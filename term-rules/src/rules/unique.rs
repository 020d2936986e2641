//! Uniqueness rules: duplicate combinations, occurrence counts and allowed values.

use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use super::common::{
    boxed, concat_key, context_table, grouped_violations_sql, parse_params, quote_columns, Bounds,
};
use crate::catalogue::{RuleCatalogue, RuleCategory, RuleDescriptor};
use crate::core::{query_violations, Rule, RuleOptions, ViolationSet};
use crate::prelude::*;
use crate::security::SqlSecurity;

/// Combinations of the listed columns must not repeat.
///
/// Every row of a repeated combination counts as a violation; the failing item
/// is the combination's values joined by ` - `.
#[derive(Debug, Clone)]
pub struct ColumnUniquePair {
    columns: Vec<String>,
    target: String,
    options: RuleOptions,
}

#[derive(Deserialize)]
struct PairParams {
    column_list: Vec<String>,
    #[serde(flatten)]
    options: RuleOptions,
}

impl ColumnUniquePair {
    pub fn new(columns: Vec<String>, options: RuleOptions) -> Result<Self> {
        options.validate()?;
        quote_columns("ColumnUniquePair", &columns)?;
        let target = columns.join(" - ");
        Ok(Self {
            columns,
            target,
            options,
        })
    }

    pub fn from_params(params: Value) -> Result<Self> {
        let p: PairParams = parse_params("ColumnUniquePair", params)?;
        Self::new(p.column_list, p.options)
    }
}

#[async_trait]
impl Rule for ColumnUniquePair {
    fn name(&self) -> &str {
        "ColumnUniquePair"
    }

    fn target(&self) -> &str {
        &self.target
    }

    fn options(&self) -> RuleOptions {
        self.options
    }

    fn fail_message(&self) -> String {
        format!(
            "The combination of columns [{}] has duplicated values.",
            self.columns.join(", ")
        )
    }

    #[instrument(skip(self, ctx), fields(columns = %self.target))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        let table = context_table()?;
        let quoted = quote_columns("ColumnUniquePair", &self.columns)?;
        let sql = grouped_violations_sql(&table, &concat_key(&quoted), "TRUE", Some("COUNT(*) > 1"));
        query_violations(ctx, &sql).await
    }
}

/// Each distinct value must occur a number of times within inclusive bounds.
///
/// Nulls are not counted as a value.
#[derive(Debug, Clone)]
pub struct ColumnUniqueValueCountToBeBetween {
    column: String,
    bounds: Bounds<u64>,
    options: RuleOptions,
}

#[derive(Deserialize)]
struct CountParams {
    column: String,
    #[serde(default)]
    min_value: Option<u64>,
    #[serde(default)]
    max_value: Option<u64>,
    #[serde(flatten)]
    options: RuleOptions,
}

impl ColumnUniqueValueCountToBeBetween {
    pub fn new(
        column: impl Into<String>,
        min_value: Option<u64>,
        max_value: Option<u64>,
        options: RuleOptions,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            column: column.into(),
            bounds: Bounds::new(min_value, max_value)?,
            options,
        })
    }

    pub fn from_params(params: Value) -> Result<Self> {
        let p: CountParams = parse_params("ColumnUniqueValueCountToBeBetween", params)?;
        Self::new(p.column, p.min_value, p.max_value, p.options)
    }
}

#[async_trait]
impl Rule for ColumnUniqueValueCountToBeBetween {
    fn name(&self) -> &str {
        "ColumnUniqueValueCountToBeBetween"
    }

    fn target(&self) -> &str {
        &self.column
    }

    fn options(&self) -> RuleOptions {
        self.options
    }

    fn fail_message(&self) -> String {
        format!(
            "The column '{}' has values whose occurrence count is not {}.",
            self.column,
            self.bounds.describe()
        )
    }

    #[instrument(skip(self, ctx), fields(column = %self.column))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        let table = context_table()?;
        let column = SqlSecurity::quote_identifier(&self.column)?;
        let having = self.bounds.violation_predicate("COUNT(*)");
        let sql = grouped_violations_sql(
            &table,
            &column,
            &format!("{column} IS NOT NULL"),
            Some(&having),
        );
        query_violations(ctx, &sql).await
    }
}

/// Every non-null value must belong to a list of allowed values.
///
/// Nulls in the list are ignored; an empty list rejects every non-null value.
#[derive(Debug, Clone)]
pub struct ColumnUniqueValuesToBeInList {
    column: String,
    values: Vec<Value>,
    options: RuleOptions,
}

#[derive(Deserialize)]
struct InListParams {
    column: String,
    values: Vec<Value>,
    #[serde(flatten)]
    options: RuleOptions,
}

impl ColumnUniqueValuesToBeInList {
    pub fn new(column: impl Into<String>, values: Vec<Value>, options: RuleOptions) -> Result<Self> {
        options.validate()?;
        for value in &values {
            sql_literal(value)?;
        }
        Ok(Self {
            column: column.into(),
            values,
            options,
        })
    }

    pub fn from_params(params: Value) -> Result<Self> {
        let p: InListParams = parse_params("ColumnUniqueValuesToBeInList", params)?;
        Self::new(p.column, p.values, p.options)
    }

    fn allowed_literals(&self) -> Result<Vec<String>> {
        let mut literals = Vec::with_capacity(self.values.len());
        for value in &self.values {
            if let Some(literal) = sql_literal(value)? {
                literals.push(literal);
            }
        }
        Ok(literals)
    }
}

/// Renders a JSON scalar as a SQL literal; `null` has no literal.
fn sql_literal(value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(if *b { "TRUE" } else { "FALSE" }.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::String(s) => Ok(Some(SqlSecurity::quote_literal(s))),
        other => Err(TermError::Configuration(format!(
            "Allowed values must be scalars, got {other}"
        ))),
    }
}

#[async_trait]
impl Rule for ColumnUniqueValuesToBeInList {
    fn name(&self) -> &str {
        "ColumnUniqueValuesToBeInList"
    }

    fn target(&self) -> &str {
        &self.column
    }

    fn options(&self) -> RuleOptions {
        self.options
    }

    fn fail_message(&self) -> String {
        let allowed = self
            .values
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "The column '{}' has values that are not in the list [{allowed}].",
            self.column
        )
    }

    #[instrument(skip(self, ctx), fields(column = %self.column, allowed = self.values.len()))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        let table = context_table()?;
        let column = SqlSecurity::quote_identifier(&self.column)?;
        let literals = self.allowed_literals()?;
        let predicate = if literals.is_empty() {
            format!("{column} IS NOT NULL")
        } else {
            format!(
                "{column} IS NOT NULL AND {column} NOT IN ({})",
                literals.join(", ")
            )
        };
        let sql = grouped_violations_sql(&table, &column, &predicate, None);
        query_violations(ctx, &sql).await
    }
}

pub(crate) fn register(catalogue: &mut RuleCatalogue) {
    let category = RuleCategory::UniqueValidation;
    catalogue.register(RuleDescriptor::new(
        "ColumnUniquePair",
        category,
        "Combinations of the listed columns are unique",
        |p| boxed(ColumnUniquePair::from_params(p)),
    ));
    catalogue.register(RuleDescriptor::new(
        "ColumnUniqueValueCountToBeBetween",
        category,
        "Each distinct value occurs a bounded number of times",
        |p| boxed(ColumnUniqueValueCountToBeBetween::from_params(p)),
    ));
    catalogue.register(RuleDescriptor::new(
        "ColumnUniqueValuesToBeInList",
        category,
        "Every value belongs to a list of allowed values",
        |p| boxed(ColumnUniqueValuesToBeInList::from_params(p)),
    ));
}
