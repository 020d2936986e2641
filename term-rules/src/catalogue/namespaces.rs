//! Typed, per-category access to the built-in rules from a session.
//!
//! Each namespace borrows the session mutably; its methods build the rule,
//! attach it and hand the session back so calls can be chained:
//!
//! ```rust,no_run
//! use term_rules::prelude::*;
//! # async fn example(session: &mut ValidationSession) -> Result<()> {
//! session
//!     .null()
//!     .column_not_be_null("id", RuleOptions::new().with_impact(Impact::High))
//!     .await?
//!     .values()
//!     .column_values_to_be_between("age", Some(0.0), Some(120.0), RuleOptions::new())
//!     .await?
//!     .string()
//!     .pattern_match("email", r"^[^@]+@[^@]+$", RuleOptions::new().with_threshold(0.05))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Construction errors (bad bounds, invalid patterns, thresholds outside
//! `[0, 1]`) are returned before anything is recorded. Execution problems are
//! recorded as failing results, exactly as with
//! [`ValidationSession::add_validation`].

use indexmap::IndexMap;
use serde_json::Value;

use crate::core::{RuleOptions, ValidationSession};
use crate::error::Result;
use crate::rules::{
    ColumnBeNull, ColumnMatchDateFormat, ColumnNotBeNull, ColumnType, ColumnUniquePair,
    ColumnUniqueValueCountToBeBetween, ColumnUniqueValuesToBeInList, ColumnValuesToBeBetween,
    ColumnsSumToBeBetween, ColumnsSumToBeEqualTo, ColumnsSumToBeGreaterEqualTo,
    ColumnsSumToBeLessEqualTo, DateToBeBetween, LengthToBeBetween, LengthToBeEqualTo,
    LengthToBeGreaterThanOrEqualTo, LengthToBeLessThanOrEqualTo, NotPatternMatch,
    PairColumnEquality, PatternMatch, TypeCheck,
};

fn column_list<I, S>(columns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    columns.into_iter().map(Into::into).collect()
}

macro_rules! namespace {
    ($(#[$doc:meta])* $name:ident, $accessor:ident) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name<'a> {
            session: &'a mut ValidationSession,
        }

        impl ValidationSession {
            $(#[$doc])*
            pub fn $accessor(&mut self) -> $name<'_> {
                $name { session: self }
            }
        }
    };
}

namespace!(
    /// Date rules.
    DateRules,
    date
);
namespace!(
    /// Column equality rules.
    EqualityRules,
    equality
);
namespace!(
    /// Null-presence rules.
    NullRules,
    null
);
namespace!(
    /// String length and pattern rules.
    StringRules,
    string
);
namespace!(
    /// Schema type rules.
    TypeRules,
    types
);
namespace!(
    /// Uniqueness rules.
    UniqueRules,
    unique
);
namespace!(
    /// Numeric value rules.
    ValuesRules,
    values
);

impl<'a> DateRules<'a> {
    pub async fn column_match_date_format(
        self,
        column: &str,
        date_format: &str,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession> {
        let rule = ColumnMatchDateFormat::new(column, date_format, options)?;
        Ok(self.session.add_validation(rule).await)
    }

    pub async fn date_to_be_between(
        self,
        column: &str,
        min_date: Option<&str>,
        max_date: Option<&str>,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession> {
        let rule = DateToBeBetween::new(column, min_date, max_date, options)?;
        Ok(self.session.add_validation(rule).await)
    }
}

impl<'a> EqualityRules<'a> {
    /// Compares `column` with `target_column`; see [`PairColumnEquality`].
    pub async fn pair_column_equality(
        self,
        column: &str,
        target_column: &str,
        group_by_combined: bool,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession> {
        let rule = PairColumnEquality::new(column, target_column, options)?
            .with_group_by_combined(group_by_combined);
        Ok(self.session.add_validation(rule).await)
    }
}

impl<'a> NullRules<'a> {
    pub async fn column_be_null(
        self,
        column: &str,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession> {
        let rule = ColumnBeNull::new(column, options)?;
        Ok(self.session.add_validation(rule).await)
    }

    pub async fn column_not_be_null(
        self,
        column: &str,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession> {
        let rule = ColumnNotBeNull::new(column, options)?;
        Ok(self.session.add_validation(rule).await)
    }
}

impl<'a> StringRules<'a> {
    pub async fn length_to_be_between(
        self,
        column: &str,
        min_value: Option<u64>,
        max_value: Option<u64>,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession> {
        let rule = LengthToBeBetween::new(column, min_value, max_value, options)?;
        Ok(self.session.add_validation(rule).await)
    }

    pub async fn length_to_be_equal_to(
        self,
        column: &str,
        value: u64,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession> {
        let rule = LengthToBeEqualTo::new(column, value, options)?;
        Ok(self.session.add_validation(rule).await)
    }

    pub async fn length_to_be_greater_than_or_equal_to(
        self,
        column: &str,
        min_value: u64,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession> {
        let rule = LengthToBeGreaterThanOrEqualTo::new(column, min_value, options)?;
        Ok(self.session.add_validation(rule).await)
    }

    pub async fn length_to_be_less_than_or_equal_to(
        self,
        column: &str,
        max_value: u64,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession> {
        let rule = LengthToBeLessThanOrEqualTo::new(column, max_value, options)?;
        Ok(self.session.add_validation(rule).await)
    }

    pub async fn pattern_match(
        self,
        column: &str,
        pattern: &str,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession> {
        let rule = PatternMatch::new(column, pattern, options)?;
        Ok(self.session.add_validation(rule).await)
    }

    pub async fn not_pattern_match(
        self,
        column: &str,
        pattern: &str,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession> {
        let rule = NotPatternMatch::new(column, pattern, options)?;
        Ok(self.session.add_validation(rule).await)
    }
}

impl<'a> TypeRules<'a> {
    pub async fn type_check(
        self,
        column: &str,
        column_type: ColumnType,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession> {
        let rule = TypeCheck::column(column, column_type, options)?;
        Ok(self.session.add_validation(rule).await)
    }

    /// Checks a whole schema definition, recorded as `TypeCheck_DataTypeColumnValidation`.
    pub async fn schema_type_check(
        self,
        definition: IndexMap<String, ColumnType>,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession> {
        let rule = TypeCheck::schema(definition, options)?;
        Ok(self.session.add_validation(rule).await)
    }
}

impl<'a> UniqueRules<'a> {
    pub async fn column_unique_pair<I, S>(
        self,
        columns: I,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rule = ColumnUniquePair::new(column_list(columns), options)?;
        Ok(self.session.add_validation(rule).await)
    }

    pub async fn column_unique_value_count_to_be_between(
        self,
        column: &str,
        min_value: Option<u64>,
        max_value: Option<u64>,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession> {
        let rule = ColumnUniqueValueCountToBeBetween::new(column, min_value, max_value, options)?;
        Ok(self.session.add_validation(rule).await)
    }

    pub async fn column_unique_values_to_be_in_list(
        self,
        column: &str,
        values: Vec<Value>,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession> {
        let rule = ColumnUniqueValuesToBeInList::new(column, values, options)?;
        Ok(self.session.add_validation(rule).await)
    }
}

impl<'a> ValuesRules<'a> {
    pub async fn column_values_to_be_between(
        self,
        column: &str,
        min_value: Option<f64>,
        max_value: Option<f64>,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession> {
        let rule = ColumnValuesToBeBetween::new(column, min_value, max_value, options)?;
        Ok(self.session.add_validation(rule).await)
    }

    pub async fn columns_sum_to_be_between<I, S>(
        self,
        columns: I,
        min_sum_value: Option<f64>,
        max_sum_value: Option<f64>,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rule =
            ColumnsSumToBeBetween::new(column_list(columns), min_sum_value, max_sum_value, options)?;
        Ok(self.session.add_validation(rule).await)
    }

    pub async fn columns_sum_to_be_equal_to<I, S>(
        self,
        columns: I,
        sum_value: f64,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rule = ColumnsSumToBeEqualTo::new(column_list(columns), sum_value, options)?;
        Ok(self.session.add_validation(rule).await)
    }

    pub async fn columns_sum_to_be_greater_equal_to<I, S>(
        self,
        columns: I,
        min_sum_value: f64,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rule = ColumnsSumToBeGreaterEqualTo::new(column_list(columns), min_sum_value, options)?;
        Ok(self.session.add_validation(rule).await)
    }

    pub async fn columns_sum_to_be_less_equal_to<I, S>(
        self,
        columns: I,
        max_sum_value: f64,
        options: RuleOptions,
    ) -> Result<&'a mut ValidationSession>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rule = ColumnsSumToBeLessEqualTo::new(column_list(columns), max_sum_value, options)?;
        Ok(self.session.add_validation(rule).await)
    }
}
