//! The rule catalogue: every built-in rule, grouped by category.
//!
//! Rules are registered explicitly by the modules under [`crate::rules`]; there
//! is no discovery step that can partially fail. One immutable catalogue is
//! shared process-wide through [`RuleCatalogue::global`].
//!
//! The catalogue is reached two ways from a
//! [`ValidationSession`](crate::core::ValidationSession):
//!
//! - typed, through category namespaces such as `session.values()` (see
//!   [`namespaces`]);
//! - by name, through a [`RuleSpec`] passed to `session.apply`.
//!
//! ```rust
//! use term_rules::catalogue::{RuleCatalogue, RuleCategory};
//!
//! let catalogue = RuleCatalogue::global();
//! let names: Vec<_> = catalogue
//!     .rules_in(RuleCategory::NullValidation)
//!     .map(|d| d.name)
//!     .collect();
//! assert_eq!(names, ["ColumnBeNull", "ColumnNotBeNull"]);
//! ```

pub mod namespaces;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::core::BoxedRule;
use crate::prelude::*;

/// Category a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleCategory {
    DateValidation,
    EqualityValidation,
    NullValidation,
    StringValidation,
    TypeValidation,
    UniqueValidation,
    ValuesValidation,
}

impl RuleCategory {
    /// All categories in catalogue order.
    pub const ALL: [RuleCategory; 7] = [
        RuleCategory::DateValidation,
        RuleCategory::EqualityValidation,
        RuleCategory::NullValidation,
        RuleCategory::StringValidation,
        RuleCategory::TypeValidation,
        RuleCategory::UniqueValidation,
        RuleCategory::ValuesValidation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::DateValidation => "DateValidation",
            RuleCategory::EqualityValidation => "EqualityValidation",
            RuleCategory::NullValidation => "NullValidation",
            RuleCategory::StringValidation => "StringValidation",
            RuleCategory::TypeValidation => "TypeValidation",
            RuleCategory::UniqueValidation => "UniqueValidation",
            RuleCategory::ValuesValidation => "ValuesValidation",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleCategory {
    type Err = TermError;

    fn from_str(s: &str) -> Result<Self> {
        RuleCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| TermError::Configuration(format!("Unknown rule category '{s}'")))
    }
}

/// Builds a rule from its JSON parameters.
///
/// Parameters are the rule's constructor arguments by name, plus the optional
/// `impact` and `threshold` fields.
pub type RuleFactory = fn(serde_json::Value) -> Result<BoxedRule>;

/// A catalogue entry.
#[derive(Clone, Copy)]
pub struct RuleDescriptor {
    pub name: &'static str,
    pub category: RuleCategory,
    pub summary: &'static str,
    pub factory: RuleFactory,
}

impl fmt::Debug for RuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDescriptor")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl RuleDescriptor {
    pub fn new(
        name: &'static str,
        category: RuleCategory,
        summary: &'static str,
        factory: RuleFactory,
    ) -> Self {
        Self {
            name,
            category,
            summary,
            factory,
        }
    }

    /// Builds the rule from JSON parameters.
    pub fn create(&self, params: serde_json::Value) -> Result<BoxedRule> {
        (self.factory)(params)
    }
}

/// Registry of rule descriptors, in registration order.
#[derive(Debug, Default)]
pub struct RuleCatalogue {
    rules: IndexMap<&'static str, RuleDescriptor>,
    categories: IndexMap<RuleCategory, Vec<&'static str>>,
}

static BUILTIN: Lazy<RuleCatalogue> = Lazy::new(RuleCatalogue::builtin);

impl RuleCatalogue {
    /// Creates an empty catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalogue holding every built-in rule.
    pub fn builtin() -> Self {
        let mut catalogue = Self::new();
        crate::rules::register_all(&mut catalogue);
        catalogue
    }

    /// The process-wide built-in catalogue.
    pub fn global() -> &'static RuleCatalogue {
        &BUILTIN
    }

    /// Registers a rule. A second registration under the same name replaces the first.
    pub fn register(&mut self, descriptor: RuleDescriptor) {
        if let Some(previous) = self.rules.insert(descriptor.name, descriptor) {
            warn!(
                rule.name = descriptor.name,
                "Rule registered twice, replacing previous entry"
            );
            if let Some(names) = self.categories.get_mut(&previous.category) {
                names.retain(|n| *n != previous.name);
            }
        }
        self.categories
            .entry(descriptor.category)
            .or_default()
            .push(descriptor.name);
    }

    /// Looks up a rule within a category.
    pub fn get(&self, category: RuleCategory, name: &str) -> Result<&RuleDescriptor> {
        self.rules
            .get(name)
            .filter(|d| d.category == category)
            .ok_or_else(|| TermError::unknown_rule(category.as_str(), name))
    }

    /// Looks up a rule by name alone.
    pub fn find(&self, name: &str) -> Option<&RuleDescriptor> {
        self.rules.get(name)
    }

    /// Builds a rule from the catalogue.
    pub fn create(
        &self,
        category: RuleCategory,
        name: &str,
        params: serde_json::Value,
    ) -> Result<BoxedRule> {
        self.get(category, name)?.create(params)
    }

    /// Descriptors registered under a category.
    pub fn rules_in(&self, category: RuleCategory) -> impl Iterator<Item = &RuleDescriptor> {
        self.categories
            .get(&category)
            .into_iter()
            .flatten()
            .filter_map(|name| self.rules.get(name))
    }

    /// Categories that have at least one rule, in registration order.
    pub fn categories(&self) -> impl Iterator<Item = RuleCategory> + '_ {
        self.categories
            .iter()
            .filter(|(_, names)| !names.is_empty())
            .map(|(category, _)| *category)
    }

    /// All descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RuleDescriptor> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A rule named by category and rule name, with JSON parameters.
///
/// ```rust
/// use term_rules::catalogue::RuleSpec;
///
/// let specs = RuleSpec::from_json_list(r#"[
///     {"category": "ValuesValidation", "rule": "ColumnValuesToBeBetween",
///      "params": {"column": "A", "min_value": 1, "max_value": 2, "threshold": 0.6}}
/// ]"#).unwrap();
/// assert_eq!(specs[0].rule, "ColumnValuesToBeBetween");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub category: RuleCategory,
    pub rule: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl RuleSpec {
    pub fn new(category: RuleCategory, rule: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            category,
            rule: rule.into(),
            params,
        }
    }

    /// Parses a JSON array of rule specs.
    pub fn from_json_list(json: &str) -> Result<Vec<RuleSpec>> {
        serde_json::from_str(json)
            .map_err(|e| TermError::Configuration(format!("Invalid rule specification: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_catalogue_contents() {
        let catalogue = RuleCatalogue::builtin();
        assert_eq!(catalogue.len(), 20);
        assert_eq!(catalogue.categories().count(), 7);

        let counts: Vec<(RuleCategory, usize)> = RuleCategory::ALL
            .into_iter()
            .map(|c| (c, catalogue.rules_in(c).count()))
            .collect();
        assert_eq!(
            counts,
            vec![
                (RuleCategory::DateValidation, 2),
                (RuleCategory::EqualityValidation, 1),
                (RuleCategory::NullValidation, 2),
                (RuleCategory::StringValidation, 6),
                (RuleCategory::TypeValidation, 1),
                (RuleCategory::UniqueValidation, 3),
                (RuleCategory::ValuesValidation, 5),
            ]
        );
    }

    #[test]
    fn test_lookup_requires_matching_category() {
        let catalogue = RuleCatalogue::global();
        assert!(catalogue
            .get(RuleCategory::NullValidation, "ColumnNotBeNull")
            .is_ok());
        let err = catalogue
            .get(RuleCategory::StringValidation, "ColumnNotBeNull")
            .unwrap_err();
        assert!(matches!(err, TermError::UnknownRule { .. }));
        assert!(catalogue.find("NoSuchRule").is_none());
    }

    #[test]
    fn test_create_from_params() {
        let rule = RuleCatalogue::global()
            .create(
                RuleCategory::ValuesValidation,
                "ColumnValuesToBeBetween",
                json!({"column": "A", "min_value": 1, "max_value": 2}),
            )
            .unwrap();
        assert_eq!(rule.name(), "ColumnValuesToBeBetween");
        assert_eq!(rule.target(), "A");
    }

    #[test]
    fn test_create_with_bad_params_is_configuration_error() {
        let err = RuleCatalogue::global()
            .create(
                RuleCategory::ValuesValidation,
                "ColumnValuesToBeBetween",
                json!({"column": "A"}),
            )
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_register_replaces_duplicates() {
        let mut catalogue = RuleCatalogue::new();
        let descriptor = *RuleCatalogue::global().find("ColumnBeNull").unwrap();
        catalogue.register(descriptor);
        catalogue.register(descriptor);
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue.rules_in(RuleCategory::NullValidation).count(), 1);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(
            "UniqueValidation".parse::<RuleCategory>().unwrap(),
            RuleCategory::UniqueValidation
        );
        assert!("Unique".parse::<RuleCategory>().is_err());
    }

    #[test]
    fn test_rule_spec_params_default_to_null() {
        let specs =
            RuleSpec::from_json_list(r#"[{"category": "NullValidation", "rule": "ColumnBeNull"}]"#)
                .unwrap();
        assert!(specs[0].params.is_null());
        assert!(RuleSpec::from_json_list("not json").is_err());
    }
}
