//! Task-local context carrying the name of the table under validation.
//!
//! Rules receive only a `SessionContext`; the table they should query is read
//! from [`current_validation_context`], which the session scopes around each rule
//! execution.

use std::sync::Arc;

/// Name of the table rules query when no context has been scoped.
pub const DEFAULT_TABLE_NAME: &str = "data";

/// Runtime context for one rule execution.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    table_name: Arc<str>,
}

impl ValidationContext {
    /// Creates a validation context for the given table.
    ///
    /// ```rust
    /// use term_rules::core::ValidationContext;
    ///
    /// let ctx = ValidationContext::new("orders");
    /// assert_eq!(ctx.table_name(), "orders");
    /// ```
    pub fn new(table_name: impl Into<Arc<str>>) -> Self {
        Self {
            table_name: table_name.into(),
        }
    }

    /// Returns the name of the table being validated.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE_NAME)
    }
}

tokio::task_local! {
    pub static CURRENT_CONTEXT: ValidationContext;
}

/// Gets the current validation context, or the default one outside a scope.
pub fn current_validation_context() -> ValidationContext {
    CURRENT_CONTEXT
        .try_with(|ctx| ctx.clone())
        .unwrap_or_default()
}
