//! Building blocks shared by the built-in rules.

use serde::de::DeserializeOwned;
use std::fmt::Display;

use crate::core::{current_validation_context, BoxedRule, Rule};
use crate::prelude::*;
use crate::security::SqlSecurity;

/// An inclusive range where either end may be open.
///
/// Values strictly below `min` or strictly above `max` violate the bounds. A
/// range needs at least one end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    min: Option<T>,
    max: Option<T>,
}

impl<T> Bounds<T>
where
    T: Copy + PartialOrd + Display,
{
    /// Creates bounds from optional ends.
    ///
    /// Fails when both ends are missing or when `min > max`.
    pub fn new(min: Option<T>, max: Option<T>) -> Result<Self> {
        match (min, max) {
            (None, None) => Err(TermError::Configuration(
                "Either a minimum or a maximum value must be provided".to_string(),
            )),
            (Some(lo), Some(hi)) if lo > hi => Err(TermError::Configuration(format!(
                "Minimum value {lo} is greater than maximum value {hi}"
            ))),
            _ => Ok(Self { min, max }),
        }
    }

    /// Bounds admitting exactly one value.
    pub fn exactly(value: T) -> Self {
        Self {
            min: Some(value),
            max: Some(value),
        }
    }

    pub fn at_least(value: T) -> Self {
        Self {
            min: Some(value),
            max: None,
        }
    }

    pub fn at_most(value: T) -> Self {
        Self {
            min: None,
            max: Some(value),
        }
    }

    pub fn min(&self) -> Option<T> {
        self.min
    }

    pub fn max(&self) -> Option<T> {
        self.max
    }

    /// SQL predicate that is true when `expr` lies outside the bounds.
    pub fn violation_predicate(&self, expr: &str) -> String {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) => format!("({expr} < {lo} OR {expr} > {hi})"),
            (Some(lo), None) => format!("{expr} < {lo}"),
            (None, Some(hi)) => format!("{expr} > {hi}"),
            (None, None) => "FALSE".to_string(),
        }
    }

    /// Renders the bounds for fail messages, with `None` for an open end.
    pub fn describe(&self) -> String {
        fn end<T: Display>(value: Option<T>) -> String {
            value.map_or_else(|| "None".to_string(), |v| v.to_string())
        }
        format!("between {} and {}", end(self.min), end(self.max))
    }
}

impl Bounds<f64> {
    /// Rejects NaN and infinite ends, which have no SQL literal form.
    pub fn ensure_finite(self) -> Result<Self> {
        for value in [self.min, self.max].into_iter().flatten() {
            if !value.is_finite() {
                return Err(TermError::Configuration(format!(
                    "Bound values must be finite, got {value}"
                )));
            }
        }
        Ok(self)
    }
}

/// Boxes a freshly constructed rule for the catalogue.
pub(crate) fn boxed<R: Rule + 'static>(rule: Result<R>) -> Result<BoxedRule> {
    Ok(Box::new(rule?))
}

/// The quoted name of the table in the current validation context.
pub fn context_table() -> Result<String> {
    let validation_ctx = current_validation_context();
    SqlSecurity::quote_identifier(validation_ctx.table_name())
}

/// Builds the standard grouped violation query.
///
/// Rows of `table` matching `predicate` are keyed by `key_expr`, grouped, and
/// counted; `having` optionally filters the groups by `COUNT(*)`.
pub fn grouped_violations_sql(
    table: &str,
    key_expr: &str,
    predicate: &str,
    having: Option<&str>,
) -> String {
    let having = having
        .map(|condition| format!(" HAVING {condition}"))
        .unwrap_or_default();
    format!(
        "SELECT failing_key, COUNT(*) AS failing_count \
         FROM (SELECT {key_expr} AS failing_key FROM {table} WHERE {predicate}) AS violations \
         GROUP BY failing_key{having} \
         ORDER BY failing_key"
    )
}

/// Quotes every column and rejects an empty list.
pub fn quote_columns(rule: &str, columns: &[String]) -> Result<Vec<String>> {
    if columns.is_empty() {
        return Err(TermError::Configuration(format!(
            "{rule} requires at least one column"
        )));
    }
    columns
        .iter()
        .map(|c| SqlSecurity::quote_identifier(c))
        .collect()
}

/// `concat_ws(' - ', ...)` over the string form of each quoted column.
pub fn concat_key(quoted_columns: &[String]) -> String {
    let parts = quoted_columns
        .iter()
        .map(|c| format!("CAST({c} AS VARCHAR)"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("concat_ws(' - ', {parts})")
}

/// Deserializes rule parameters, treating `null` as an empty object.
pub fn parse_params<P: DeserializeOwned>(rule: &str, params: serde_json::Value) -> Result<P> {
    let params = if params.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        params
    };
    serde_json::from_value(params)
        .map_err(|e| TermError::Configuration(format!("Invalid parameters for {rule}: {e}")))
}
