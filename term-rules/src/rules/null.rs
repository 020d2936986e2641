//! Null-presence rules.

use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use serde::Deserialize;
use tracing::instrument;

use super::common::{boxed, context_table, grouped_violations_sql, parse_params};
use crate::catalogue::{RuleCatalogue, RuleCategory, RuleDescriptor};
use crate::core::{query_violations, Rule, RuleOptions, ViolationSet};
use crate::prelude::*;
use crate::security::SqlSecurity;

#[derive(Deserialize)]
struct ColumnParams {
    column: String,
    #[serde(flatten)]
    options: RuleOptions,
}

/// Every value of the column must be null.
#[derive(Debug, Clone)]
pub struct ColumnBeNull {
    column: String,
    options: RuleOptions,
}

impl ColumnBeNull {
    pub fn new(column: impl Into<String>, options: RuleOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            column: column.into(),
            options,
        })
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: ColumnParams = parse_params("ColumnBeNull", params)?;
        Self::new(p.column, p.options)
    }
}

#[async_trait]
impl Rule for ColumnBeNull {
    fn name(&self) -> &str {
        "ColumnBeNull"
    }

    fn target(&self) -> &str {
        &self.column
    }

    fn options(&self) -> RuleOptions {
        self.options
    }

    fn fail_message(&self) -> String {
        format!("The column '{}' has values that are not null.", self.column)
    }

    #[instrument(skip(self, ctx), fields(column = %self.column))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        let table = context_table()?;
        let column = SqlSecurity::quote_identifier(&self.column)?;
        let sql = grouped_violations_sql(&table, &column, &format!("{column} IS NOT NULL"), None);
        query_violations(ctx, &sql).await
    }
}

/// No value of the column may be null.
///
/// All null rows form a single violating group whose key is JSON `null`.
#[derive(Debug, Clone)]
pub struct ColumnNotBeNull {
    column: String,
    options: RuleOptions,
}

impl ColumnNotBeNull {
    pub fn new(column: impl Into<String>, options: RuleOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            column: column.into(),
            options,
        })
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: ColumnParams = parse_params("ColumnNotBeNull", params)?;
        Self::new(p.column, p.options)
    }
}

#[async_trait]
impl Rule for ColumnNotBeNull {
    fn name(&self) -> &str {
        "ColumnNotBeNull"
    }

    fn target(&self) -> &str {
        &self.column
    }

    fn options(&self) -> RuleOptions {
        self.options
    }

    fn fail_message(&self) -> String {
        format!("The column '{}' has values that are null.", self.column)
    }

    #[instrument(skip(self, ctx), fields(column = %self.column))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        let table = context_table()?;
        let column = SqlSecurity::quote_identifier(&self.column)?;
        let sql = grouped_violations_sql(&table, &column, &format!("{column} IS NULL"), None);
        query_violations(ctx, &sql).await
    }
}

pub(crate) fn register(catalogue: &mut RuleCatalogue) {
    catalogue.register(RuleDescriptor::new(
        "ColumnBeNull",
        RuleCategory::NullValidation,
        "Every value of the column is null",
        |p| boxed(ColumnBeNull::from_params(p)),
    ));
    catalogue.register(RuleDescriptor::new(
        "ColumnNotBeNull",
        RuleCategory::NullValidation,
        "No value of the column is null",
        |p| boxed(ColumnNotBeNull::from_params(p)),
    ));
}
