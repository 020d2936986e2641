//! # term-rules - declarative data-quality rules for Arrow tables
//!
//! term-rules checks a table against a list of data-quality rules and collects
//! one structured result per rule into an ordered report. Tables are registered
//! in a DataFusion [`SessionContext`](datafusion::prelude::SessionContext); every
//! rule is a SQL query that finds the offending rows, groups them by value and
//! counts them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use term_rules::prelude::*;
//! use term_rules::rules::ColumnUniqueValuesToBeInList;
//! use arrow::array::StringArray;
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let schema = Arc::new(Schema::new(vec![Field::new("city", DataType::Utf8, true)]));
//! let cities = StringArray::from(vec!["Berlin", "Rome", "Paris", "Rome"]);
//! let batch = RecordBatch::try_new(schema, vec![Arc::new(cities)])?;
//!
//! let mut session = ValidationSession::new(batch)?;
//! session
//!     .add_validation(ColumnUniqueValuesToBeInList::new(
//!         "city",
//!         vec![json!("Berlin"), json!("Rome")],
//!         RuleOptions::new().with_impact(Impact::High),
//!     )?)
//!     .await
//!     .null()
//!     .column_not_be_null("city", RuleOptions::new())
//!     .await?;
//!
//! match session.evaluate(true) {
//!     Ok(_) => println!("All validations passed"),
//!     Err(TermError::AggregateValidationFailure { failed, report }) => {
//!         println!("Failed: {failed:?}");
//!         if let Some(report) = report {
//!             println!("{report}");
//!         }
//!     }
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Results
//!
//! Each rule execution yields a [`RuleResult`](core::RuleResult): status, the
//! number of violating rows, the row count used as denominator, the violating
//! fraction, the threshold and the distinct failing values. A rule passes when
//! nothing violates it or when the violating fraction does not exceed its
//! threshold. Results are keyed `"{RuleName}_{target}"` in the session's
//! [`ValidationReport`](core::ValidationReport).
//!
//! ## Impact
//!
//! Every rule carries an [`Impact`](core::Impact). Built-in rules default to
//! `low`, custom [`Rule`](core::Rule) implementations to `high`. Only failing
//! high-impact rules make [`evaluate`](core::ValidationSession::evaluate) return
//! an error; medium and low failures are logged.
//!
//! ## Architecture
//!
//! - **`core`**: `Rule`, `ValidationSession`, results and the report
//! - **`rules`**: the built-in rules, one module per category
//! - **`catalogue`**: rule lookup by category and name, and typed namespaces
//! - **`formatters`**: JSON and console rendering of reports
//! - **`logging`**: `tracing` configuration
//! - **`security`**: identifier and pattern checks for generated SQL

pub mod catalogue;
pub mod core;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod rules;
pub mod security;

#[cfg(test)]
pub(crate) mod test_helpers;
