//! Test helpers for building tables and running rules inside a validation context.

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use std::sync::Arc;

use crate::core::{Rule, RuleResult, ValidationContext, CURRENT_CONTEXT};
use crate::prelude::*;

/// Builds a batch from named columns; nullability follows the arrays.
pub fn batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let arrays: Vec<ArrayRef> = columns.into_iter().map(|(_, array)| array).collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
}

pub fn int_array(values: Vec<Option<i64>>) -> ArrayRef {
    Arc::new(Int64Array::from(values))
}

pub fn float_array(values: Vec<Option<f64>>) -> ArrayRef {
    Arc::new(Float64Array::from(values))
}

pub fn str_array(values: Vec<Option<&str>>) -> ArrayRef {
    Arc::new(StringArray::from(values))
}

pub fn bool_array(values: Vec<Option<bool>>) -> ArrayRef {
    Arc::new(BooleanArray::from(values))
}

pub fn int_batch(name: &str, values: Vec<Option<i64>>) -> RecordBatch {
    batch(vec![(name, int_array(values))])
}

pub fn str_batch(name: &str, values: Vec<Option<&str>>) -> RecordBatch {
    batch(vec![(name, str_array(values))])
}

/// Executes a rule with the given table name in the validation context.
pub async fn execute_rule_with_context(
    rule: &dyn Rule,
    ctx: &SessionContext,
    table_name: &str,
) -> Result<RuleResult> {
    CURRENT_CONTEXT
        .scope(ValidationContext::new(table_name), rule.execute(ctx))
        .await
}

/// Registers `data` as the table `data` and executes the rule against it.
pub async fn execute_on(rule: &dyn Rule, data: RecordBatch) -> RuleResult {
    let ctx = SessionContext::new();
    ctx.register_batch("data", data).unwrap();
    execute_rule_with_context(rule, &ctx, "data").await.unwrap()
}
