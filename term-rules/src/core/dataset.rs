//! Adapting caller tables into DataFusion.
//!
//! Every dataset a session validates is registered as a table in a
//! [`SessionContext`]; rules then see the same relational interface regardless of
//! whether the data came from an in-memory batch, a `DataFrame` or a file.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use datafusion::dataframe::DataFrame;
use datafusion::datasource::{MemTable, TableProvider};
use datafusion::execution::context::{SessionConfig, SessionContext};
use datafusion::execution::memory_pool::{FairSpillPool, MemoryPool};
use datafusion::execution::runtime_env::RuntimeEnvBuilder;
use std::sync::Arc;
use tracing::instrument;

use super::validation_context::DEFAULT_TABLE_NAME;
use crate::logging::LogConfig;
use crate::prelude::*;
use crate::security::SqlSecurity;

/// Anything that can be registered as the table under validation.
///
/// Implemented for single batches, batch vectors (non-empty), a schema paired
/// with batches (possibly empty), DataFusion `DataFrame`s and table providers.
pub trait IntoTable {
    fn into_table_provider(self) -> Result<Arc<dyn TableProvider>>;
}

impl IntoTable for RecordBatch {
    fn into_table_provider(self) -> Result<Arc<dyn TableProvider>> {
        let schema = self.schema();
        (schema, vec![self]).into_table_provider()
    }
}

impl IntoTable for Vec<RecordBatch> {
    fn into_table_provider(self) -> Result<Arc<dyn TableProvider>> {
        let schema = self
            .first()
            .map(RecordBatch::schema)
            .ok_or_else(|| {
                TermError::Configuration(
                    "Cannot infer a schema from an empty list of record batches".to_string(),
                )
            })?;
        (schema, self).into_table_provider()
    }
}

impl IntoTable for (SchemaRef, Vec<RecordBatch>) {
    fn into_table_provider(self) -> Result<Arc<dyn TableProvider>> {
        let (schema, batches) = self;
        let table = MemTable::try_new(schema, vec![batches])?;
        Ok(Arc::new(table))
    }
}

impl IntoTable for DataFrame {
    fn into_table_provider(self) -> Result<Arc<dyn TableProvider>> {
        Ok(self.into_view())
    }
}

impl IntoTable for Arc<dyn TableProvider> {
    fn into_table_provider(self) -> Result<Arc<dyn TableProvider>> {
        Ok(self)
    }
}

/// Configuration of a [`ValidationSession`](crate::core::ValidationSession).
#[derive(Debug, Clone)]
pub struct ValidationSessionConfig {
    /// Name the dataset is registered under
    pub table_name: String,
    /// Batch size for query execution
    pub batch_size: usize,
    /// Partitions DataFusion may use for one query
    pub target_partitions: usize,
    /// Memory limit in bytes for query execution
    pub max_memory: usize,
    /// Fraction of `max_memory` handed to the spill pool
    pub memory_fraction: f64,
    /// Whether panics inside rules are recorded as failures instead of unwinding
    pub capture_panics: bool,
    /// Logging behaviour for rule execution
    pub log: LogConfig,
}

impl Default for ValidationSessionConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            batch_size: 8192,
            target_partitions: num_cpus::get(),
            max_memory: 2 * 1024 * 1024 * 1024, // 2GB
            memory_fraction: 0.9,
            capture_panics: true,
            log: LogConfig::default(),
        }
    }
}

impl ValidationSessionConfig {
    /// A configuration for small tables and tests.
    pub fn small() -> Self {
        Self {
            batch_size: 1024,
            target_partitions: 1,
            max_memory: 256 * 1024 * 1024,
            ..Self::default()
        }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_target_partitions(mut self, target_partitions: usize) -> Self {
        self.target_partitions = target_partitions;
        self
    }

    pub fn with_max_memory(mut self, max_memory: usize) -> Self {
        self.max_memory = max_memory;
        self
    }

    pub fn with_capture_panics(mut self, capture_panics: bool) -> Self {
        self.capture_panics = capture_panics;
        self
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Checks that the configuration can build a session.
    pub fn validate(&self) -> Result<()> {
        SqlSecurity::validate_table_name(&self.table_name)?;
        if self.batch_size == 0 {
            return Err(TermError::Configuration(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        if self.target_partitions == 0 {
            return Err(TermError::Configuration(
                "target_partitions must be greater than zero".to_string(),
            ));
        }
        if !(self.memory_fraction > 0.0 && self.memory_fraction <= 1.0) {
            return Err(TermError::Configuration(format!(
                "memory_fraction must be in (0, 1], got {}",
                self.memory_fraction
            )));
        }
        Ok(())
    }

    /// Builds a `SessionContext` with a fair spill pool sized from this configuration.
    #[instrument(skip(self), fields(table = %self.table_name))]
    pub fn build_context(&self) -> Result<SessionContext> {
        self.validate()?;

        let session_config = SessionConfig::new()
            .with_batch_size(self.batch_size)
            .with_target_partitions(self.target_partitions);

        let pool_size = (self.max_memory as f64 * self.memory_fraction) as usize;
        let memory_pool = Arc::new(FairSpillPool::new(pool_size)) as Arc<dyn MemoryPool>;

        let runtime_env = RuntimeEnvBuilder::new()
            .with_memory_pool(memory_pool)
            .with_temp_file_path(std::env::temp_dir())
            .build()
            .map(Arc::new)?;

        Ok(SessionContext::new_with_config_rt(session_config, runtime_env))
    }
}
