//! Built-in rules, one module per catalogue category.
//!
//! Every rule follows the same shape: a constructor that validates its
//! parameters and [`RuleOptions`](crate::core::RuleOptions), a `from_params`
//! factory for the [catalogue](crate::catalogue), and a
//! [`Rule`](crate::core::Rule) implementation whose violation query groups the
//! offending rows by key. Null values never violate a rule unless the rule is
//! about nulls.

pub mod common;
pub mod date;
pub mod equality;
pub mod null;
pub mod string;
pub mod types;
pub mod unique;
pub mod values;

pub use date::{ColumnMatchDateFormat, DateToBeBetween};
pub use equality::PairColumnEquality;
pub use null::{ColumnBeNull, ColumnNotBeNull};
pub use string::{
    LengthToBeBetween, LengthToBeEqualTo, LengthToBeGreaterThanOrEqualTo,
    LengthToBeLessThanOrEqualTo, NotPatternMatch, PatternMatch,
};
pub use types::{ColumnType, TypeCheck};
pub use unique::{ColumnUniquePair, ColumnUniqueValueCountToBeBetween, ColumnUniqueValuesToBeInList};
pub use values::{
    ColumnValuesToBeBetween, ColumnsSumToBeBetween, ColumnsSumToBeEqualTo,
    ColumnsSumToBeGreaterEqualTo, ColumnsSumToBeLessEqualTo,
};

use crate::catalogue::RuleCatalogue;

/// Registers every built-in rule, category by category.
pub fn register_all(catalogue: &mut RuleCatalogue) {
    date::register(catalogue);
    equality::register(catalogue);
    null::register(catalogue);
    string::register(catalogue);
    types::register(catalogue);
    unique::register(catalogue);
    values::register(catalogue);
}
