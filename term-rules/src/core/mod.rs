//! Core validation types: rules, results, reports and sessions.
//!
//! ## Overview
//!
//! - **[`Rule`]**: one data-quality check against the table in a session
//! - **[`ValidationSession`]**: owns the table, executes attached rules and keeps the report
//! - **[`RuleResult`]**: what one rule execution produced
//! - **[`ValidationReport`]**: the ordered map of results plus a [`Summary`]
//! - **[`Impact`]**: how much a failure matters when the session is evaluated
//!
//! ## Architecture
//!
//! ```text
//! ValidationSession ("data")
//!     ├── add_validation(rule)  ──► Rule::execute ──► RuleResult
//!     │                                              └── recorded as "{Rule}_{target}"
//!     └── evaluate(raise_results)
//!             ├── logs every entry by status and impact
//!             └── Err(AggregateValidationFailure) if a high-impact rule failed
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use term_rules::prelude::*;
//! use term_rules::rules::ColumnValuesToBeBetween;
//! use arrow::array::Int64Array;
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use std::sync::Arc;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let schema = Arc::new(Schema::new(vec![Field::new("A", DataType::Int64, false)]));
//! let batch = RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5]))])?;
//!
//! let mut session = ValidationSession::new(batch)?;
//! session
//!     .add_validation(ColumnValuesToBeBetween::new(
//!         "A",
//!         Some(1.0),
//!         Some(2.0),
//!         RuleOptions::new().with_threshold(0.6),
//!     )?)
//!     .await;
//!
//! let result = session.results().get("ColumnValuesToBeBetween_A").unwrap();
//! assert_eq!(result.result.failed_percentage, Some(0.6));
//! session.evaluate(false)?;
//! # Ok(())
//! # }
//! ```

mod dataset;
mod impact;
mod report;
mod result;
mod rule;
mod session;
pub mod validation_context;

pub use dataset::{IntoTable, ValidationSessionConfig};
pub use impact::Impact;
pub use report::{Summary, ValidationReport, SUMMARY_KEY};
pub use result::{RuleOutcome, RuleResult, RuleStatus, PASS_MESSAGE};
pub use rule::{
    count_rows, query_violations, scalar_to_json, BoxedRule, Rule, RuleOptions, ViolationGroup,
    ViolationSet, FAILING_COUNT_COLUMN, FAILING_KEY_COLUMN,
};
pub use session::{Validation, ValidationSession, EXECUTION_ERROR_PREFIX, UNSUPPORTED_TARGET};
pub use validation_context::{
    current_validation_context, ValidationContext, CURRENT_CONTEXT, DEFAULT_TABLE_NAME,
};
