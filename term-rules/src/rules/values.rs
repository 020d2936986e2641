//! Numeric value rules: single-column ranges and row-wise column sums.

use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use serde::Deserialize;
use tracing::instrument;

use super::common::{
    boxed, concat_key, context_table, grouped_violations_sql, parse_params, quote_columns, Bounds,
};
use crate::catalogue::{RuleCatalogue, RuleCategory, RuleDescriptor};
use crate::core::{query_violations, Rule, RuleOptions, ViolationSet};
use crate::prelude::*;
use crate::security::SqlSecurity;

/// Values of a column must lie within inclusive bounds.
#[derive(Debug, Clone)]
pub struct ColumnValuesToBeBetween {
    column: String,
    bounds: Bounds<f64>,
    options: RuleOptions,
}

#[derive(Deserialize)]
struct BetweenParams {
    column: String,
    #[serde(default)]
    min_value: Option<f64>,
    #[serde(default)]
    max_value: Option<f64>,
    #[serde(flatten)]
    options: RuleOptions,
}

impl ColumnValuesToBeBetween {
    pub fn new(
        column: impl Into<String>,
        min_value: Option<f64>,
        max_value: Option<f64>,
        options: RuleOptions,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            column: column.into(),
            bounds: Bounds::new(min_value, max_value)?.ensure_finite()?,
            options,
        })
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: BetweenParams = parse_params("ColumnValuesToBeBetween", params)?;
        Self::new(p.column, p.min_value, p.max_value, p.options)
    }
}

#[async_trait]
impl Rule for ColumnValuesToBeBetween {
    fn name(&self) -> &str {
        "ColumnValuesToBeBetween"
    }

    fn target(&self) -> &str {
        &self.column
    }

    fn options(&self) -> RuleOptions {
        self.options
    }

    fn fail_message(&self) -> String {
        format!(
            "The column '{}' has values that are not {}.",
            self.column,
            self.bounds.describe()
        )
    }

    #[instrument(skip(self, ctx), fields(column = %self.column))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        let table = context_table()?;
        let column = SqlSecurity::quote_identifier(&self.column)?;
        let predicate = format!(
            "{column} IS NOT NULL AND {}",
            self.bounds.violation_predicate(&column)
        );
        let sql = grouped_violations_sql(&table, &column, &predicate, None);
        query_violations(ctx, &sql).await
    }
}

/// Row-wise sum over a list of columns, with nulls counted as zero.
///
/// Shared by the four `ColumnsSum*` rules, which differ only in their bounds.
#[derive(Debug, Clone)]
struct ColumnsSum {
    columns: Vec<String>,
    target: String,
    bounds: Bounds<f64>,
    options: RuleOptions,
}

impl ColumnsSum {
    fn new(rule: &str, columns: Vec<String>, bounds: Bounds<f64>, options: RuleOptions) -> Result<Self> {
        options.validate()?;
        quote_columns(rule, &columns)?;
        let target = format!("{}-combined", columns.join("-"));
        Ok(Self {
            columns,
            target,
            bounds: bounds.ensure_finite()?,
            options,
        })
    }

    fn fail_message(&self, relation: &str) -> String {
        format!(
            "The sum of columns [{}] is not {relation}.",
            self.columns.join(", ")
        )
    }

    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        let table = context_table()?;
        let quoted = quote_columns("ColumnsSum", &self.columns)?;
        let sum = quoted
            .iter()
            .map(|c| format!("COALESCE(CAST({c} AS DOUBLE), 0)"))
            .collect::<Vec<_>>()
            .join(" + ");
        let predicate = self.bounds.violation_predicate(&format!("({sum})"));
        let sql = grouped_violations_sql(&table, &concat_key(&quoted), &predicate, None);
        query_violations(ctx, &sql).await
    }
}

#[derive(Deserialize)]
struct SumBetweenParams {
    columns_list: Vec<String>,
    #[serde(default)]
    min_sum_value: Option<f64>,
    #[serde(default)]
    max_sum_value: Option<f64>,
    #[serde(flatten)]
    options: RuleOptions,
}

#[derive(Deserialize)]
struct SumEqualParams {
    columns_list: Vec<String>,
    sum_value: f64,
    #[serde(flatten)]
    options: RuleOptions,
}

#[derive(Deserialize)]
struct SumMinParams {
    columns_list: Vec<String>,
    min_sum_value: f64,
    #[serde(flatten)]
    options: RuleOptions,
}

#[derive(Deserialize)]
struct SumMaxParams {
    columns_list: Vec<String>,
    max_sum_value: f64,
    #[serde(flatten)]
    options: RuleOptions,
}

/// The row-wise sum of several columns must lie within inclusive bounds.
///
/// The target identifier is the column names joined by `-` with a `-combined`
/// suffix; failing items are the offending rows' values joined by ` - `.
#[derive(Debug, Clone)]
pub struct ColumnsSumToBeBetween {
    sum: ColumnsSum,
}

impl ColumnsSumToBeBetween {
    pub fn new(
        columns: Vec<String>,
        min_sum_value: Option<f64>,
        max_sum_value: Option<f64>,
        options: RuleOptions,
    ) -> Result<Self> {
        let bounds = Bounds::new(min_sum_value, max_sum_value)?;
        Ok(Self {
            sum: ColumnsSum::new("ColumnsSumToBeBetween", columns, bounds, options)?,
        })
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: SumBetweenParams = parse_params("ColumnsSumToBeBetween", params)?;
        Self::new(p.columns_list, p.min_sum_value, p.max_sum_value, p.options)
    }
}

/// The row-wise sum of several columns must equal a value.
#[derive(Debug, Clone)]
pub struct ColumnsSumToBeEqualTo {
    sum: ColumnsSum,
}

impl ColumnsSumToBeEqualTo {
    pub fn new(columns: Vec<String>, sum_value: f64, options: RuleOptions) -> Result<Self> {
        Ok(Self {
            sum: ColumnsSum::new("ColumnsSumToBeEqualTo", columns, Bounds::exactly(sum_value), options)?,
        })
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: SumEqualParams = parse_params("ColumnsSumToBeEqualTo", params)?;
        Self::new(p.columns_list, p.sum_value, p.options)
    }
}

/// The row-wise sum of several columns must be at least a value.
#[derive(Debug, Clone)]
pub struct ColumnsSumToBeGreaterEqualTo {
    sum: ColumnsSum,
}

impl ColumnsSumToBeGreaterEqualTo {
    pub fn new(columns: Vec<String>, min_sum_value: f64, options: RuleOptions) -> Result<Self> {
        Ok(Self {
            sum: ColumnsSum::new(
                "ColumnsSumToBeGreaterEqualTo",
                columns,
                Bounds::at_least(min_sum_value),
                options,
            )?,
        })
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: SumMinParams = parse_params("ColumnsSumToBeGreaterEqualTo", params)?;
        Self::new(p.columns_list, p.min_sum_value, p.options)
    }
}

/// The row-wise sum of several columns must be at most a value.
#[derive(Debug, Clone)]
pub struct ColumnsSumToBeLessEqualTo {
    sum: ColumnsSum,
}

impl ColumnsSumToBeLessEqualTo {
    pub fn new(columns: Vec<String>, max_sum_value: f64, options: RuleOptions) -> Result<Self> {
        Ok(Self {
            sum: ColumnsSum::new(
                "ColumnsSumToBeLessEqualTo",
                columns,
                Bounds::at_most(max_sum_value),
                options,
            )?,
        })
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: SumMaxParams = parse_params("ColumnsSumToBeLessEqualTo", params)?;
        Self::new(p.columns_list, p.max_sum_value, p.options)
    }
}

#[async_trait]
impl Rule for ColumnsSumToBeBetween {
    fn name(&self) -> &str {
        "ColumnsSumToBeBetween"
    }

    fn target(&self) -> &str {
        &self.sum.target
    }

    fn options(&self) -> RuleOptions {
        self.sum.options
    }

    fn fail_message(&self) -> String {
        self.sum.fail_message(&self.sum.bounds.describe())
    }

    #[instrument(skip(self, ctx), fields(target = %self.sum.target))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        self.sum.violations(ctx).await
    }
}

#[async_trait]
impl Rule for ColumnsSumToBeEqualTo {
    fn name(&self) -> &str {
        "ColumnsSumToBeEqualTo"
    }

    fn target(&self) -> &str {
        &self.sum.target
    }

    fn options(&self) -> RuleOptions {
        self.sum.options
    }

    fn fail_message(&self) -> String {
        let value = self.sum.bounds.min().unwrap_or_default();
        self.sum.fail_message(&format!("equal to {value}"))
    }

    #[instrument(skip(self, ctx), fields(target = %self.sum.target))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        self.sum.violations(ctx).await
    }
}

#[async_trait]
impl Rule for ColumnsSumToBeGreaterEqualTo {
    fn name(&self) -> &str {
        "ColumnsSumToBeGreaterEqualTo"
    }

    fn target(&self) -> &str {
        &self.sum.target
    }

    fn options(&self) -> RuleOptions {
        self.sum.options
    }

    fn fail_message(&self) -> String {
        let value = self.sum.bounds.min().unwrap_or_default();
        self.sum.fail_message(&format!("greater than or equal to {value}"))
    }

    #[instrument(skip(self, ctx), fields(target = %self.sum.target))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        self.sum.violations(ctx).await
    }
}

#[async_trait]
impl Rule for ColumnsSumToBeLessEqualTo {
    fn name(&self) -> &str {
        "ColumnsSumToBeLessEqualTo"
    }

    fn target(&self) -> &str {
        &self.sum.target
    }

    fn options(&self) -> RuleOptions {
        self.sum.options
    }

    fn fail_message(&self) -> String {
        let value = self.sum.bounds.max().unwrap_or_default();
        self.sum.fail_message(&format!("less than or equal to {value}"))
    }

    #[instrument(skip(self, ctx), fields(target = %self.sum.target))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        self.sum.violations(ctx).await
    }
}

pub(crate) fn register(catalogue: &mut RuleCatalogue) {
    let category = RuleCategory::ValuesValidation;
    catalogue.register(RuleDescriptor::new(
        "ColumnValuesToBeBetween",
        category,
        "Column values lie within inclusive bounds",
        |p| boxed(ColumnValuesToBeBetween::from_params(p)),
    ));
    catalogue.register(RuleDescriptor::new(
        "ColumnsSumToBeBetween",
        category,
        "Row-wise sum of columns lies within inclusive bounds",
        |p| boxed(ColumnsSumToBeBetween::from_params(p)),
    ));
    catalogue.register(RuleDescriptor::new(
        "ColumnsSumToBeEqualTo",
        category,
        "Row-wise sum of columns equals a value",
        |p| boxed(ColumnsSumToBeEqualTo::from_params(p)),
    ));
    catalogue.register(RuleDescriptor::new(
        "ColumnsSumToBeGreaterEqualTo",
        category,
        "Row-wise sum of columns is at least a value",
        |p| boxed(ColumnsSumToBeGreaterEqualTo::from_params(p)),
    ));
    catalogue.register(RuleDescriptor::new(
        "ColumnsSumToBeLessEqualTo",
        category,
        "Row-wise sum of columns is at most a value",
        |p| boxed(ColumnsSumToBeLessEqualTo::from_params(p)),
    ));
}
