//! Validation sessions: one table, many rules, one report.
//!
//! A [`ValidationSession`] owns the DataFusion context holding the table under
//! validation. Rules are attached one at a time; each attachment executes the
//! rule immediately and records its [`RuleResult`] in the session's
//! [`ValidationReport`] under `"{RuleName}_{target}"`. Nothing a rule does can
//! abort the session: query errors and panics become failing results.
//!
//! ```rust,no_run
//! use term_rules::prelude::*;
//! use term_rules::rules::{ColumnNotBeNull, ColumnValuesToBeBetween};
//! # use arrow::record_batch::RecordBatch;
//! # async fn example(batch: RecordBatch) -> Result<()> {
//! let mut session = ValidationSession::new(batch)?;
//! session
//!     .add_validation(ColumnNotBeNull::new("id", RuleOptions::new().with_impact(Impact::High))?)
//!     .await
//!     .add_validation(ColumnValuesToBeBetween::new("age", Some(0.0), Some(120.0), RuleOptions::new())?)
//!     .await;
//! session.evaluate(true)?;
//! # Ok(())
//! # }
//! ```

use datafusion::prelude::{CsvReadOptions, SessionContext};
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::dataset::{IntoTable, ValidationSessionConfig};
use super::impact::Impact;
use super::report::ValidationReport;
use super::result::{RuleOutcome, RuleResult, RuleStatus};
use super::rule::{BoxedRule, Rule};
use super::validation_context::{ValidationContext, CURRENT_CONTEXT};
use crate::catalogue::{RuleCatalogue, RuleSpec};
use crate::formatters::{JsonFormatter, ResultFormatter};
use crate::logging::truncate_field;
use crate::prelude::*;
use crate::{log_rule, perf_debug};

/// Prefix of the message recorded when a rule fails to execute.
pub const EXECUTION_ERROR_PREFIX: &str = "An error occurred while executing the validation";

/// Target identifier recorded for unsupported validations.
pub const UNSUPPORTED_TARGET: &str = "N/A";

/// Something that can be attached to a session.
#[derive(Debug)]
pub enum Validation {
    /// An executable rule.
    Rule(BoxedRule),
    /// A value that turned out not to be a rule, such as a rule name missing from
    /// the catalogue. It is recorded as a high-impact failure under `name`.
    Unsupported { name: String },
}

impl Validation {
    pub fn unsupported(name: impl Into<String>) -> Self {
        Validation::Unsupported { name: name.into() }
    }

    /// An unsupported validation named after a Rust type.
    pub fn unsupported_type<T: ?Sized>() -> Self {
        let full = std::any::type_name::<T>();
        let short = full.rsplit("::").next().unwrap_or(full);
        Validation::unsupported(short)
    }
}

impl<R: Rule + 'static> From<R> for Validation {
    fn from(rule: R) -> Self {
        Validation::Rule(Box::new(rule))
    }
}

impl From<BoxedRule> for Validation {
    fn from(rule: BoxedRule) -> Self {
        Validation::Rule(rule)
    }
}

/// A table under validation together with the report of every attached rule.
pub struct ValidationSession {
    ctx: SessionContext,
    table_name: Arc<str>,
    config: ValidationSessionConfig,
    report: ValidationReport,
}

impl fmt::Debug for ValidationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationSession")
            .field("table_name", &self.table_name)
            .field("config", &self.config)
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl ValidationSession {
    /// Creates a session over `table` with the default configuration.
    pub fn new(table: impl IntoTable) -> Result<Self> {
        Self::with_config(table, ValidationSessionConfig::default())
    }

    /// Creates a session over `table`, registered as `config.table_name`.
    pub fn with_config(table: impl IntoTable, config: ValidationSessionConfig) -> Result<Self> {
        let ctx = config.build_context()?;
        ctx.register_table(config.table_name.as_str(), table.into_table_provider()?)?;
        Ok(Self::assemble(ctx, config))
    }

    /// Wraps a context in which `table_name` is already registered.
    pub fn from_context(ctx: SessionContext, table_name: impl Into<String>) -> Result<Self> {
        let config = ValidationSessionConfig::default().with_table_name(table_name);
        config.validate()?;
        Ok(Self::assemble(ctx, config))
    }

    /// Creates a session over a CSV file with a header row.
    #[instrument(skip(path, config), fields(path = %path.as_ref().display()))]
    pub async fn from_csv(
        path: impl AsRef<Path>,
        config: ValidationSessionConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        let location = path.to_str().ok_or_else(|| {
            TermError::Configuration(format!("Path is not valid UTF-8: {}", path.display()))
        })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();

        let ctx = config.build_context()?;
        let options = CsvReadOptions::new().file_extension(&extension);
        ctx.register_csv(config.table_name.as_str(), location, options)
            .await?;
        Ok(Self::assemble(ctx, config))
    }

    fn assemble(ctx: SessionContext, config: ValidationSessionConfig) -> Self {
        debug!(table = %config.table_name, "Created validation session");
        Self {
            ctx,
            table_name: Arc::from(config.table_name.as_str()),
            config,
            report: ValidationReport::new(),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn config(&self) -> &ValidationSessionConfig {
        &self.config
    }

    /// The report of every result recorded so far.
    pub fn results(&self) -> &ValidationReport {
        &self.report
    }

    /// Executes a rule and records its result.
    ///
    /// Errors and panics raised while executing the rule are recorded as
    /// failures carrying the rule's impact; they are never returned.
    #[instrument(skip(self, validation), fields(table = %self.table_name))]
    pub async fn add_validation(&mut self, validation: impl Into<Validation>) -> &mut Self {
        match validation.into() {
            Validation::Rule(rule) => {
                let name = format!("{}_{}", rule.name(), rule.target());
                let result = self.run_rule(rule.as_ref()).await;
                log_rule!(
                    self.config.log,
                    validation = %name,
                    status = %result.status(),
                    failed = ?result.result.failed_number,
                    rows = ?result.result.frame_row_number,
                    "Rule executed"
                );
                if self.config.log.log_failing_items {
                    if let Some(items) = &result.result.failing_items {
                        let rendered = serde_json::Value::Array(items.clone()).to_string();
                        debug!(
                            validation = %name,
                            failing_items = %truncate_field(&rendered, self.config.log.max_field_length),
                            "Failing items"
                        );
                    }
                }
                self.record_result(name, result);
            }
            Validation::Unsupported { name } => {
                warn!(validation = %name, "Attached value is not a validation");
                let outcome = RuleOutcome::failure(format!(
                    "{name} is not a valid validation. Validations must implement the Rule trait."
                ));
                let result = RuleResult::new(name.clone(), UNSUPPORTED_TARGET, Impact::High, outcome);
                self.record_result(name, result);
            }
        }
        self
    }

    async fn run_rule(&self, rule: &dyn Rule) -> RuleResult {
        let options = rule.options();
        perf_debug!(
            self.config.log,
            rule = rule.name(),
            target = rule.target(),
            threshold = options.threshold,
            "Executing rule"
        );

        let outcome = match options.validate() {
            Ok(()) => self.execute_in_context(rule).await,
            Err(e) => Err(e),
        };

        outcome.unwrap_or_else(|e| {
            warn!(
                rule = rule.name(),
                target = rule.target(),
                error = %e,
                "Rule execution failed"
            );
            RuleResult::new(
                rule.name(),
                rule.target(),
                options.impact,
                RuleOutcome::failure(format!("{EXECUTION_ERROR_PREFIX}: {e}")),
            )
        })
    }

    async fn execute_in_context(&self, rule: &dyn Rule) -> Result<RuleResult> {
        let validation_ctx = ValidationContext::new(self.table_name.clone());
        let execution = CURRENT_CONTEXT.scope(validation_ctx, rule.execute(&self.ctx));

        if !self.config.capture_panics {
            return execution.await;
        }
        match AssertUnwindSafe(execution).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(TermError::Internal(format!(
                "rule panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }

    /// Records a result under a rule-instance name.
    ///
    /// A failing result turns the summary's `passed` to `false` for good; the
    /// name is appended to the summary even when it is already present, and the
    /// entry is overwritten in place.
    pub fn record_result(&mut self, name: impl Into<String>, result: RuleResult) {
        self.report.record(name, result);
    }

    /// Builds and attaches a rule described by a [`RuleSpec`].
    ///
    /// Rules missing from the catalogue are recorded as unsupported validations.
    /// Invalid parameters are returned as a configuration error.
    pub async fn apply(&mut self, spec: &RuleSpec) -> Result<&mut Self> {
        match RuleCatalogue::global().create(spec.category, &spec.rule, spec.params.clone()) {
            Ok(rule) => Ok(self.add_validation(rule).await),
            Err(TermError::UnknownRule { category, rule }) => {
                warn!(%category, %rule, "Rule not found in catalogue");
                Ok(self.add_validation(Validation::unsupported(rule)).await)
            }
            Err(e) => Err(e),
        }
    }

    /// Applies a list of rule specs in order, stopping at the first error.
    pub async fn apply_all(&mut self, specs: &[RuleSpec]) -> Result<&mut Self> {
        for spec in specs {
            self.apply(spec).await?;
        }
        Ok(self)
    }

    /// Logs every recorded result and escalates high-impact failures.
    ///
    /// Failing results are logged at a level matching their impact and passing
    /// ones at info. If any high-impact result failed, the call returns
    /// [`TermError::AggregateValidationFailure`] naming them; with
    /// `raise_results` the error also carries the JSON report of every failed
    /// entry.
    pub fn evaluate(&self, raise_results: bool) -> Result<&Self> {
        if self.report.is_empty() {
            return Err(TermError::EmptyValidationSet);
        }

        let max_length = self.config.log.max_field_length;
        let mut failed = Vec::new();
        for (name, result) in self.report.iter() {
            let message = truncate_field(result.message(), max_length);
            match (result.status(), result.impact) {
                (RuleStatus::Success, _) => {
                    info!(validation = %name, "Passed validation");
                }
                (RuleStatus::Fail, Impact::High) => {
                    error!(
                        validation = %name,
                        severity = "critical",
                        message = %message,
                        "Failed validation"
                    );
                    failed.push(name.to_string());
                }
                (RuleStatus::Fail, Impact::Medium) => {
                    warn!(validation = %name, message = %message, "Failed validation");
                }
                (RuleStatus::Fail, Impact::Low) => {
                    error!(validation = %name, message = %message, "Failed validation");
                }
            }
        }

        if failed.is_empty() {
            return Ok(self);
        }

        let report = if raise_results {
            Some(JsonFormatter::new().format(&self.report.failed_only())?)
        } else {
            None
        };
        Err(TermError::AggregateValidationFailure { failed, report })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
