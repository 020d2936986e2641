//! The session-wide report: a [`Summary`] plus one [`RuleResult`] per rule instance.
//!
//! Serialized, a report is a single JSON object whose first key is `"Summary"`,
//! followed by the rule-instance entries in attachment order:
//!
//! ```json
//! {
//!     "Summary": {
//!         "passed": false,
//!         "validations": ["ColumnNotBeNull_id", "PatternMatch_email"],
//!         "failed_validation": ["PatternMatch_email"]
//!     },
//!     "ColumnNotBeNull_id": { "...": "..." },
//!     "PatternMatch_email": { "...": "..." }
//! }
//! ```
//!
//! Before anything is recorded, `passed` is `null` and `validations` holds the
//! sentinel string `"No validation checks were added."`.

use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::result::RuleResult;
use crate::error::NO_VALIDATIONS_MESSAGE;

/// Key of the summary object in a serialized report.
pub const SUMMARY_KEY: &str = "Summary";

/// Rolled-up status of every rule recorded so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    passed: Option<bool>,
    #[serde(
        serialize_with = "serialize_validations",
        deserialize_with = "deserialize_validations"
    )]
    validations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    failed_validation: Vec<String>,
}

impl Summary {
    /// `None` until the first rule is recorded; `Some(false)` once any rule failed.
    pub fn passed(&self) -> Option<bool> {
        self.passed
    }

    /// Rule-instance names in attachment order, duplicates included.
    pub fn validations(&self) -> &[String] {
        &self.validations
    }

    /// Names of the rule instances recorded with a failing status.
    pub fn failed_validations(&self) -> &[String] {
        &self.failed_validation
    }

    fn record(&mut self, name: &str, success: bool) {
        if !success {
            self.passed = Some(false);
            self.failed_validation.push(name.to_string());
        } else if self.passed.is_none() {
            self.passed = Some(true);
        }
        self.validations.push(name.to_string());
    }
}

#[allow(clippy::ptr_arg)]
fn serialize_validations<S: Serializer>(
    validations: &Vec<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    if validations.is_empty() {
        serializer.serialize_str(NO_VALIDATIONS_MESSAGE)
    } else {
        validations.serialize(serializer)
    }
}

fn deserialize_validations<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Validations {
        Sentinel(String),
        Names(Vec<String>),
    }

    match Validations::deserialize(deserializer)? {
        Validations::Sentinel(_) => Ok(Vec::new()),
        Validations::Names(names) => Ok(names),
    }
}

/// Ordered report of a validation session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    summary: Summary,
    entries: IndexMap<String, RuleResult>,
}

impl ValidationReport {
    /// Creates an empty report with the "no validations" sentinel summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a result under a rule-instance name.
    ///
    /// The summary is updated first: a failure sets `passed` to `false`
    /// permanently, the first success sets it to `true` only if it was unset,
    /// and the name is appended to `validations` even when it is already
    /// present. The entry itself is inserted, or overwritten in place.
    pub fn record(&mut self, name: impl Into<String>, result: RuleResult) {
        let name = name.into();
        self.summary.record(&name, result.is_success());
        self.entries.insert(name, result);
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn get(&self, name: &str) -> Option<&RuleResult> {
        self.entries.get(name)
    }

    /// Iterates over `(name, result)` pairs in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleResult)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entry names in first-insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of distinct rule-instance entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A copy holding the summary and only the entries whose current result failed.
    ///
    /// An entry overwritten by a later passing result is left out even though
    /// its name stays in `failed_validation`.
    pub fn failed_only(&self) -> ValidationReport {
        Self {
            summary: self.summary.clone(),
            entries: self
                .entries
                .iter()
                .filter(|(_, result)| result.is_failure())
                .map(|(name, result)| (name.clone(), result.clone()))
                .collect(),
        }
    }

    /// Serializes the report to a JSON value.
    pub fn to_json_value(&self) -> crate::error::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Serialize for ValidationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len() + 1))?;
        map.serialize_entry(SUMMARY_KEY, &self.summary)?;
        for (name, result) in &self.entries {
            map.serialize_entry(name, result)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ValidationReport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ReportVisitor;

        impl<'de> Visitor<'de> for ReportVisitor {
            type Value = ValidationReport;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a validation report object with a Summary key")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut summary = None;
                let mut entries = IndexMap::new();
                while let Some(key) = access.next_key::<String>()? {
                    if key == SUMMARY_KEY {
                        summary = Some(access.next_value::<Summary>()?);
                    } else {
                        let result = access.next_value::<RuleResult>()?;
                        entries.insert(key, result);
                    }
                }
                let summary = summary.ok_or_else(|| de::Error::missing_field(SUMMARY_KEY))?;
                Ok(ValidationReport { summary, entries })
            }
        }

        deserializer.deserialize_map(ReportVisitor)
    }
}
