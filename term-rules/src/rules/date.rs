//! Date rules: textual date formats and date ranges.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use datafusion::prelude::SessionContext;
use serde::Deserialize;
use tracing::instrument;

use super::common::{boxed, context_table, grouped_violations_sql, parse_params};
use crate::catalogue::{RuleCatalogue, RuleCategory, RuleDescriptor};
use crate::core::{query_violations, Rule, RuleOptions, ViolationSet};
use crate::prelude::*;
use crate::security::SqlSecurity;

const DATE_FORMAT_SYMBOLS: &[char] = &['Y', 'm', 'd'];

/// Values must be written in a date format such as `YYYY-mm-dd`.
///
/// Each run of `Y`, `m` or `d` matches that many digits; every other character
/// is a literal separator. The whole value must match.
#[derive(Debug, Clone)]
pub struct ColumnMatchDateFormat {
    column: String,
    date_format: String,
    pattern: String,
    options: RuleOptions,
}

#[derive(Deserialize)]
struct DateFormatParams {
    column: String,
    date_format: String,
    #[serde(flatten)]
    options: RuleOptions,
}

impl ColumnMatchDateFormat {
    pub fn new(
        column: impl Into<String>,
        date_format: impl Into<String>,
        options: RuleOptions,
    ) -> Result<Self> {
        options.validate()?;
        let date_format = date_format.into();
        let pattern = date_format_pattern(&date_format)?;
        SqlSecurity::validate_regex_pattern(&pattern)?;
        Ok(Self {
            column: column.into(),
            date_format,
            pattern,
            options,
        })
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: DateFormatParams = parse_params("ColumnMatchDateFormat", params)?;
        Self::new(p.column, p.date_format, p.options)
    }

    /// The anchored regular expression derived from the date format.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Translates a `YYYY-mm-dd` style format into an anchored regex.
fn date_format_pattern(date_format: &str) -> Result<String> {
    if !date_format.contains(DATE_FORMAT_SYMBOLS) {
        return Err(TermError::Configuration(format!(
            "Date format '{date_format}' contains none of Y, m or d"
        )));
    }

    let mut pattern = String::from("^");
    let mut rest = date_format;
    while !rest.is_empty() {
        let is_symbol = rest.starts_with(DATE_FORMAT_SYMBOLS);
        let run_end = rest
            .char_indices()
            .find(|(_, c)| DATE_FORMAT_SYMBOLS.contains(c) != is_symbol)
            .map_or(rest.len(), |(i, _)| i);
        let (run, tail) = rest.split_at(run_end);
        if is_symbol {
            pattern.push_str(&format!("[0-9]{{{}}}", run.chars().count()));
        } else {
            pattern.push_str(&regex::escape(run));
        }
        rest = tail;
    }
    pattern.push('$');
    Ok(pattern)
}

#[async_trait]
impl Rule for ColumnMatchDateFormat {
    fn name(&self) -> &str {
        "ColumnMatchDateFormat"
    }

    fn target(&self) -> &str {
        &self.column
    }

    fn options(&self) -> RuleOptions {
        self.options
    }

    fn fail_message(&self) -> String {
        format!(
            "The column '{}' has values that do not match the date format '{}'.",
            self.column, self.date_format
        )
    }

    #[instrument(skip(self, ctx), fields(column = %self.column, format = %self.date_format))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        let table = context_table()?;
        let column = SqlSecurity::quote_identifier(&self.column)?;
        let pattern = SqlSecurity::validate_regex_pattern(&self.pattern)?;
        let predicate =
            format!("{column} IS NOT NULL AND NOT (CAST({column} AS VARCHAR) ~ '{pattern}')");
        let sql = grouped_violations_sql(&table, &column, &predicate, None);
        query_violations(ctx, &sql).await
    }
}

/// Dates must lie within inclusive bounds.
///
/// Bounds are given as `YYYY-MM-DD` dates or ISO 8601 datetimes; a bare date
/// means midnight. Values are compared as timestamps.
#[derive(Debug, Clone)]
pub struct DateToBeBetween {
    column: String,
    min_date: Option<NaiveDateTime>,
    max_date: Option<NaiveDateTime>,
    options: RuleOptions,
}

#[derive(Deserialize)]
struct DateBetweenParams {
    column: String,
    #[serde(default)]
    min_date: Option<String>,
    #[serde(default)]
    max_date: Option<String>,
    #[serde(flatten)]
    options: RuleOptions,
}

impl DateToBeBetween {
    pub fn new(
        column: impl Into<String>,
        min_date: Option<&str>,
        max_date: Option<&str>,
        options: RuleOptions,
    ) -> Result<Self> {
        options.validate()?;
        let min_date = min_date.map(parse_date_bound).transpose()?;
        let max_date = max_date.map(parse_date_bound).transpose()?;
        match (min_date, max_date) {
            (None, None) => {
                return Err(TermError::Configuration(
                    "Either a minimum or a maximum date must be provided".to_string(),
                ))
            }
            (Some(lo), Some(hi)) if lo > hi => {
                return Err(TermError::Configuration(format!(
                    "Minimum date {lo} is after maximum date {hi}"
                )))
            }
            _ => {}
        }
        Ok(Self {
            column: column.into(),
            min_date,
            max_date,
            options,
        })
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: DateBetweenParams = parse_params("DateToBeBetween", params)?;
        Self::new(
            p.column,
            p.min_date.as_deref(),
            p.max_date.as_deref(),
            p.options,
        )
    }
}

fn parse_date_bound(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    let value = value.trim();
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(datetime);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| TermError::Configuration(format!("Invalid date bound '{value}'")))
}

fn timestamp_literal(value: &NaiveDateTime) -> String {
    format!("CAST('{}' AS TIMESTAMP)", value.format("%Y-%m-%dT%H:%M:%S%.f"))
}

#[async_trait]
impl Rule for DateToBeBetween {
    fn name(&self) -> &str {
        "DateToBeBetween"
    }

    fn target(&self) -> &str {
        &self.column
    }

    fn options(&self) -> RuleOptions {
        self.options
    }

    fn fail_message(&self) -> String {
        let end = |d: Option<NaiveDateTime>| d.map_or_else(|| "None".to_string(), |d| d.to_string());
        format!(
            "The column '{}' has date range outside [{}, {}].",
            self.column,
            end(self.min_date),
            end(self.max_date)
        )
    }

    #[instrument(skip(self, ctx), fields(column = %self.column))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        let table = context_table()?;
        let column = SqlSecurity::quote_identifier(&self.column)?;
        let value = format!("CAST({column} AS TIMESTAMP)");
        let outside = match (&self.min_date, &self.max_date) {
            (Some(lo), Some(hi)) => format!(
                "({value} < {} OR {value} > {})",
                timestamp_literal(lo),
                timestamp_literal(hi)
            ),
            (Some(lo), None) => format!("{value} < {}", timestamp_literal(lo)),
            (None, Some(hi)) => format!("{value} > {}", timestamp_literal(hi)),
            (None, None) => "FALSE".to_string(),
        };
        let predicate = format!("{column} IS NOT NULL AND {outside}");
        let sql = grouped_violations_sql(&table, &column, &predicate, None);
        query_violations(ctx, &sql).await
    }
}

pub(crate) fn register(catalogue: &mut RuleCatalogue) {
    catalogue.register(RuleDescriptor::new(
        "ColumnMatchDateFormat",
        RuleCategory::DateValidation,
        "Values are written in a given date format",
        |p| boxed(ColumnMatchDateFormat::from_params(p)),
    ));
    catalogue.register(RuleDescriptor::new(
        "DateToBeBetween",
        RuleCategory::DateValidation,
        "Dates lie within inclusive bounds",
        |p| boxed(DateToBeBetween::from_params(p)),
    ));
}
