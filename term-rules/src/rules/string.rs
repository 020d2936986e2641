//! String rules: value lengths and regular-expression matching.
//!
//! Lengths are counted in characters of the value's string form, so numeric
//! columns can be checked too. Patterns use the `regex` crate syntax and match
//! anywhere in the value unless anchored.

use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use serde::Deserialize;
use tracing::instrument;

use super::common::{boxed, context_table, grouped_violations_sql, parse_params, Bounds};
use crate::catalogue::{RuleCatalogue, RuleCategory, RuleDescriptor};
use crate::core::{query_violations, Rule, RuleOptions, ViolationSet};
use crate::prelude::*;
use crate::security::SqlSecurity;

#[derive(Debug, Clone)]
struct LengthCheck {
    column: String,
    bounds: Bounds<u64>,
    options: RuleOptions,
}

impl LengthCheck {
    fn new(column: String, bounds: Bounds<u64>, options: RuleOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            column,
            bounds,
            options,
        })
    }

    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        let table = context_table()?;
        let column = SqlSecurity::quote_identifier(&self.column)?;
        let length = format!("character_length(CAST({column} AS VARCHAR))");
        let predicate = format!(
            "{column} IS NOT NULL AND {}",
            self.bounds.violation_predicate(&length)
        );
        let sql = grouped_violations_sql(&table, &column, &predicate, None);
        query_violations(ctx, &sql).await
    }
}

#[derive(Deserialize)]
struct LengthBetweenParams {
    column: String,
    #[serde(default)]
    min_value: Option<u64>,
    #[serde(default)]
    max_value: Option<u64>,
    #[serde(flatten)]
    options: RuleOptions,
}

#[derive(Deserialize)]
struct LengthEqualParams {
    column: String,
    value: u64,
    #[serde(flatten)]
    options: RuleOptions,
}

#[derive(Deserialize)]
struct LengthMinParams {
    column: String,
    min_value: u64,
    #[serde(flatten)]
    options: RuleOptions,
}

#[derive(Deserialize)]
struct LengthMaxParams {
    column: String,
    max_value: u64,
    #[serde(flatten)]
    options: RuleOptions,
}

/// String lengths must lie within inclusive bounds.
#[derive(Debug, Clone)]
pub struct LengthToBeBetween {
    check: LengthCheck,
}

impl LengthToBeBetween {
    pub fn new(
        column: impl Into<String>,
        min_value: Option<u64>,
        max_value: Option<u64>,
        options: RuleOptions,
    ) -> Result<Self> {
        let bounds = Bounds::new(min_value, max_value)?;
        Ok(Self {
            check: LengthCheck::new(column.into(), bounds, options)?,
        })
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: LengthBetweenParams = parse_params("LengthToBeBetween", params)?;
        Self::new(p.column, p.min_value, p.max_value, p.options)
    }
}

/// String lengths must equal a value.
#[derive(Debug, Clone)]
pub struct LengthToBeEqualTo {
    check: LengthCheck,
}

impl LengthToBeEqualTo {
    pub fn new(column: impl Into<String>, value: u64, options: RuleOptions) -> Result<Self> {
        Ok(Self {
            check: LengthCheck::new(column.into(), Bounds::exactly(value), options)?,
        })
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: LengthEqualParams = parse_params("LengthToBeEqualTo", params)?;
        Self::new(p.column, p.value, p.options)
    }
}

/// String lengths must be at least a value.
#[derive(Debug, Clone)]
pub struct LengthToBeGreaterThanOrEqualTo {
    check: LengthCheck,
}

impl LengthToBeGreaterThanOrEqualTo {
    pub fn new(column: impl Into<String>, min_value: u64, options: RuleOptions) -> Result<Self> {
        Ok(Self {
            check: LengthCheck::new(column.into(), Bounds::at_least(min_value), options)?,
        })
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: LengthMinParams = parse_params("LengthToBeGreaterThanOrEqualTo", params)?;
        Self::new(p.column, p.min_value, p.options)
    }
}

/// String lengths must be at most a value.
#[derive(Debug, Clone)]
pub struct LengthToBeLessThanOrEqualTo {
    check: LengthCheck,
}

impl LengthToBeLessThanOrEqualTo {
    pub fn new(column: impl Into<String>, max_value: u64, options: RuleOptions) -> Result<Self> {
        Ok(Self {
            check: LengthCheck::new(column.into(), Bounds::at_most(max_value), options)?,
        })
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: LengthMaxParams = parse_params("LengthToBeLessThanOrEqualTo", params)?;
        Self::new(p.column, p.max_value, p.options)
    }
}

#[async_trait]
impl Rule for LengthToBeBetween {
    fn name(&self) -> &str {
        "LengthToBeBetween"
    }

    fn target(&self) -> &str {
        &self.check.column
    }

    fn options(&self) -> RuleOptions {
        self.check.options
    }

    fn fail_message(&self) -> String {
        format!(
            "The column '{}' has string lengths that are not {}.",
            self.check.column,
            self.check.bounds.describe()
        )
    }

    #[instrument(skip(self, ctx), fields(column = %self.check.column))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        self.check.violations(ctx).await
    }
}

#[async_trait]
impl Rule for LengthToBeEqualTo {
    fn name(&self) -> &str {
        "LengthToBeEqualTo"
    }

    fn target(&self) -> &str {
        &self.check.column
    }

    fn options(&self) -> RuleOptions {
        self.check.options
    }

    fn fail_message(&self) -> String {
        format!(
            "The column '{}' has string lengths that are not equal to {}.",
            self.check.column,
            self.check.bounds.min().unwrap_or_default()
        )
    }

    #[instrument(skip(self, ctx), fields(column = %self.check.column))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        self.check.violations(ctx).await
    }
}

#[async_trait]
impl Rule for LengthToBeGreaterThanOrEqualTo {
    fn name(&self) -> &str {
        "LengthToBeGreaterThanOrEqualTo"
    }

    fn target(&self) -> &str {
        &self.check.column
    }

    fn options(&self) -> RuleOptions {
        self.check.options
    }

    fn fail_message(&self) -> String {
        format!(
            "The column '{}' has string lengths shorter than {}.",
            self.check.column,
            self.check.bounds.min().unwrap_or_default()
        )
    }

    #[instrument(skip(self, ctx), fields(column = %self.check.column))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        self.check.violations(ctx).await
    }
}

#[async_trait]
impl Rule for LengthToBeLessThanOrEqualTo {
    fn name(&self) -> &str {
        "LengthToBeLessThanOrEqualTo"
    }

    fn target(&self) -> &str {
        &self.check.column
    }

    fn options(&self) -> RuleOptions {
        self.check.options
    }

    fn fail_message(&self) -> String {
        format!(
            "The column '{}' has string lengths longer than {}.",
            self.check.column,
            self.check.bounds.max().unwrap_or_default()
        )
    }

    #[instrument(skip(self, ctx), fields(column = %self.check.column))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        self.check.violations(ctx).await
    }
}

#[derive(Deserialize)]
struct PatternParams {
    column: String,
    pattern: String,
    #[serde(flatten)]
    options: RuleOptions,
}

#[derive(Debug, Clone)]
struct PatternCheck {
    column: String,
    pattern: String,
    escaped: String,
    options: RuleOptions,
}

impl PatternCheck {
    fn new(column: String, pattern: String, options: RuleOptions) -> Result<Self> {
        options.validate()?;
        let escaped = SqlSecurity::validate_regex_pattern(&pattern)?;
        Ok(Self {
            column,
            pattern,
            escaped,
            options,
        })
    }

    /// Values whose match result equals `violating_match` are violations.
    async fn violations(&self, ctx: &SessionContext, violating_match: bool) -> Result<ViolationSet> {
        let table = context_table()?;
        let column = SqlSecurity::quote_identifier(&self.column)?;
        let matches = format!("CAST({column} AS VARCHAR) ~ '{}'", self.escaped);
        let predicate = if violating_match {
            format!("{column} IS NOT NULL AND {matches}")
        } else {
            format!("{column} IS NOT NULL AND NOT ({matches})")
        };
        let sql = grouped_violations_sql(&table, &column, &predicate, None);
        query_violations(ctx, &sql).await
    }
}

/// Every value must match a regular expression.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    check: PatternCheck,
}

impl PatternMatch {
    pub fn new(
        column: impl Into<String>,
        pattern: impl Into<String>,
        options: RuleOptions,
    ) -> Result<Self> {
        Ok(Self {
            check: PatternCheck::new(column.into(), pattern.into(), options)?,
        })
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: PatternParams = parse_params("PatternMatch", params)?;
        Self::new(p.column, p.pattern, p.options)
    }
}

/// No value may match a regular expression.
#[derive(Debug, Clone)]
pub struct NotPatternMatch {
    check: PatternCheck,
}

impl NotPatternMatch {
    pub fn new(
        column: impl Into<String>,
        pattern: impl Into<String>,
        options: RuleOptions,
    ) -> Result<Self> {
        Ok(Self {
            check: PatternCheck::new(column.into(), pattern.into(), options)?,
        })
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: PatternParams = parse_params("NotPatternMatch", params)?;
        Self::new(p.column, p.pattern, p.options)
    }
}

#[async_trait]
impl Rule for PatternMatch {
    fn name(&self) -> &str {
        "PatternMatch"
    }

    fn target(&self) -> &str {
        &self.check.column
    }

    fn options(&self) -> RuleOptions {
        self.check.options
    }

    fn fail_message(&self) -> String {
        format!(
            "The column '{}' has entries that do not match the pattern '{}'.",
            self.check.column, self.check.pattern
        )
    }

    #[instrument(skip(self, ctx), fields(column = %self.check.column, pattern = %self.check.pattern))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        self.check.violations(ctx, false).await
    }
}

#[async_trait]
impl Rule for NotPatternMatch {
    fn name(&self) -> &str {
        "NotPatternMatch"
    }

    fn target(&self) -> &str {
        &self.check.column
    }

    fn options(&self) -> RuleOptions {
        self.check.options
    }

    fn fail_message(&self) -> String {
        format!(
            "The column '{}' has entries that match the pattern '{}'.",
            self.check.column, self.check.pattern
        )
    }

    #[instrument(skip(self, ctx), fields(column = %self.check.column, pattern = %self.check.pattern))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        self.check.violations(ctx, true).await
    }
}

pub(crate) fn register(catalogue: &mut RuleCatalogue) {
    let category = RuleCategory::StringValidation;
    catalogue.register(RuleDescriptor::new(
        "LengthToBeBetween",
        category,
        "String lengths lie within inclusive bounds",
        |p| boxed(LengthToBeBetween::from_params(p)),
    ));
    catalogue.register(RuleDescriptor::new(
        "LengthToBeEqualTo",
        category,
        "String lengths equal a value",
        |p| boxed(LengthToBeEqualTo::from_params(p)),
    ));
    catalogue.register(RuleDescriptor::new(
        "LengthToBeGreaterThanOrEqualTo",
        category,
        "String lengths are at least a value",
        |p| boxed(LengthToBeGreaterThanOrEqualTo::from_params(p)),
    ));
    catalogue.register(RuleDescriptor::new(
        "LengthToBeLessThanOrEqualTo",
        category,
        "String lengths are at most a value",
        |p| boxed(LengthToBeLessThanOrEqualTo::from_params(p)),
    ));
    catalogue.register(RuleDescriptor::new(
        "PatternMatch",
        category,
        "Values match a regular expression",
        |p| boxed(PatternMatch::from_params(p)),
    ));
    catalogue.register(RuleDescriptor::new(
        "NotPatternMatch",
        category,
        "Values do not match a regular expression",
        |p| boxed(NotPatternMatch::from_params(p)),
    ));
}
