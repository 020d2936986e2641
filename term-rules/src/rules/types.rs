//! Schema type rules.

use arrow::datatypes::{DataType, SchemaRef};
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use datafusion::sql::TableReference;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::instrument;

use super::common::{boxed, parse_params};
use crate::catalogue::{RuleCatalogue, RuleCategory, RuleDescriptor};
use crate::core::{current_validation_context, Rule, RuleOptions, ViolationGroup, ViolationSet};
use crate::prelude::*;

/// Target identifier used when a whole schema definition is checked.
pub const SCHEMA_TARGET: &str = "DataTypeColumnValidation";

/// A family of Arrow data types a column may be required to belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// Any signed or unsigned integer width.
    Integer,
    SignedInteger,
    UnsignedInteger,
    Float,
    /// Integers, floats and decimals.
    Numeric,
    Decimal,
    String,
    Boolean,
    Date,
    /// Timestamps of any unit and time zone.
    Datetime,
    Duration,
    List,
    Struct,
    /// Dictionary-encoded columns.
    Categorical,
}

impl ColumnType {
    /// Whether `data_type` belongs to this family.
    pub fn matches(&self, data_type: &DataType) -> bool {
        use DataType as D;

        let signed = matches!(data_type, D::Int8 | D::Int16 | D::Int32 | D::Int64);
        let unsigned = matches!(data_type, D::UInt8 | D::UInt16 | D::UInt32 | D::UInt64);
        let float = matches!(data_type, D::Float16 | D::Float32 | D::Float64);
        let decimal = matches!(data_type, D::Decimal128(..) | D::Decimal256(..));

        match self {
            ColumnType::Integer => signed || unsigned,
            ColumnType::SignedInteger => signed,
            ColumnType::UnsignedInteger => unsigned,
            ColumnType::Float => float,
            ColumnType::Numeric => signed || unsigned || float || decimal,
            ColumnType::Decimal => decimal,
            ColumnType::String => matches!(data_type, D::Utf8 | D::LargeUtf8 | D::Utf8View),
            ColumnType::Boolean => matches!(data_type, D::Boolean),
            ColumnType::Date => matches!(data_type, D::Date32 | D::Date64),
            ColumnType::Datetime => matches!(data_type, D::Timestamp(..)),
            ColumnType::Duration => matches!(data_type, D::Duration(_)),
            ColumnType::List => {
                matches!(data_type, D::List(_) | D::LargeList(_) | D::FixedSizeList(..))
            }
            ColumnType::Struct => matches!(data_type, D::Struct(_)),
            ColumnType::Categorical => matches!(data_type, D::Dictionary(..)),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Columns must exist and have the expected type family.
///
/// Each missing or mistyped column is one violation. The denominator is the
/// number of columns in the table, not its row count.
#[derive(Debug, Clone)]
pub struct TypeCheck {
    target: String,
    definition: IndexMap<String, ColumnType>,
    single_column: Option<ColumnType>,
    options: RuleOptions,
}

#[derive(Deserialize)]
struct TypeCheckParams {
    #[serde(default)]
    column: Option<String>,
    #[serde(default)]
    column_type: Option<ColumnType>,
    #[serde(default)]
    frame_schema_definition: Option<IndexMap<String, ColumnType>>,
    #[serde(flatten)]
    options: RuleOptions,
}

impl TypeCheck {
    /// Checks one column against one type family.
    pub fn column(
        column: impl Into<String>,
        column_type: ColumnType,
        options: RuleOptions,
    ) -> Result<Self> {
        options.validate()?;
        let column = column.into();
        if column.is_empty() {
            return Err(TermError::Configuration(
                "TypeCheck requires a non-empty column name".to_string(),
            ));
        }
        let mut definition = IndexMap::new();
        definition.insert(column.clone(), column_type);
        Ok(Self {
            target: column,
            definition,
            single_column: Some(column_type),
            options,
        })
    }

    /// Checks every column of a schema definition.
    pub fn schema(definition: IndexMap<String, ColumnType>, options: RuleOptions) -> Result<Self> {
        options.validate()?;
        if definition.is_empty() {
            return Err(TermError::Configuration(
                "TypeCheck requires a non-empty schema definition".to_string(),
            ));
        }
        Ok(Self {
            target: SCHEMA_TARGET.to_string(),
            definition,
            single_column: None,
            options,
        })
    }

    pub fn from_params(params: serde_json::Value) -> Result<Self> {
        let p: TypeCheckParams = parse_params("TypeCheck", params)?;
        match (p.column, p.column_type, p.frame_schema_definition) {
            (Some(column), Some(column_type), None) => Self::column(column, column_type, p.options),
            (None, None, Some(definition)) => Self::schema(definition, p.options),
            _ => Err(TermError::Configuration(
                "Either `column` and `column_type` or `frame_schema_definition` must be provided"
                    .to_string(),
            )),
        }
    }

    async fn table_schema(&self, ctx: &SessionContext) -> Result<SchemaRef> {
        let validation_ctx = current_validation_context();
        let provider = ctx
            .table_provider(TableReference::bare(validation_ctx.table_name()))
            .await?;
        Ok(provider.schema())
    }
}

#[async_trait]
impl Rule for TypeCheck {
    fn name(&self) -> &str {
        "TypeCheck"
    }

    fn target(&self) -> &str {
        &self.target
    }

    fn options(&self) -> RuleOptions {
        self.options
    }

    fn fail_message(&self) -> String {
        match self.single_column {
            Some(column_type) => format!(
                "The column '{}' has failed the Validation, expected type: {column_type}.",
                self.target
            ),
            None => "The data type of the column(s) is not correct. \
                     Please check `frame_schema_definition`."
                .to_string(),
        }
    }

    #[instrument(skip(self, ctx), fields(target = %self.target, columns = self.definition.len()))]
    async fn violations(&self, ctx: &SessionContext) -> Result<ViolationSet> {
        let schema = self.table_schema(ctx).await?;
        let violations = self
            .definition
            .iter()
            .filter(|(name, expected)| match schema.field_with_name(name) {
                Ok(field) => !expected.matches(field.data_type()),
                Err(_) => true,
            })
            .map(|(name, _)| ViolationGroup::new(name.as_str(), 1))
            .collect();
        Ok(violations)
    }

    async fn frame_size(&self, ctx: &SessionContext) -> Result<u64> {
        Ok(self.table_schema(ctx).await?.fields().len() as u64)
    }
}

pub(crate) fn register(catalogue: &mut RuleCatalogue) {
    catalogue.register(RuleDescriptor::new(
        "TypeCheck",
        RuleCategory::TypeValidation,
        "Columns exist and have the expected type family",
        |p| boxed(TypeCheck::from_params(p)),
    ));
}
