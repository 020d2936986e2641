//! Every built-in rule, created by name and executed against one table.

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use serde_json::{json, Value};
use std::sync::Arc;
use term_rules::catalogue::{RuleCatalogue, RuleSpec};
use term_rules::core::{RuleStatus, ValidationSession};
use term_rules::prelude::*;

fn people() -> RecordBatch {
    let columns: Vec<(&str, ArrayRef)> = vec![
        ("id", Arc::new(Int64Array::from(vec![1, 2, 3, 4]))),
        ("name", Arc::new(StringArray::from(vec!["ann", "bob", "cyd", "dan"]))),
        (
            "joined",
            Arc::new(StringArray::from(vec![
                "2024-01-05",
                "2024-02-10",
                "2024-03-15",
                "2024-04-20",
            ])),
        ),
        ("a", Arc::new(Int64Array::from(vec![1, 2, 3, 4]))),
        ("b", Arc::new(Int64Array::from(vec![1, 2, 3, 4]))),
        ("note", Arc::new(StringArray::from(vec![None::<&str>; 4]))),
    ];
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let arrays = columns.into_iter().map(|(_, array)| array).collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
}

fn spec(category: RuleCategory, rule: &str, params: Value) -> RuleSpec {
    RuleSpec::new(category, rule, params)
}

/// One spec per built-in rule with the key it is recorded under and the
/// expected status.
fn every_rule() -> Vec<(RuleSpec, &'static str, RuleStatus)> {
    use RuleCategory::*;
    use RuleStatus::*;

    vec![
        (
            spec(
                DateValidation,
                "ColumnMatchDateFormat",
                json!({"column": "joined", "date_format": "YYYY-mm-dd"}),
            ),
            "ColumnMatchDateFormat_joined",
            Success,
        ),
        (
            spec(
                DateValidation,
                "DateToBeBetween",
                json!({"column": "joined", "min_date": "2024-01-01", "max_date": "2024-03-31"}),
            ),
            "DateToBeBetween_joined",
            Fail,
        ),
        (
            spec(
                EqualityValidation,
                "PairColumnEquality",
                json!({"column": "a", "target_column": "b"}),
            ),
            "PairColumnEquality_a-b",
            Success,
        ),
        (
            spec(NullValidation, "ColumnBeNull", json!({"column": "note"})),
            "ColumnBeNull_note",
            Success,
        ),
        (
            spec(NullValidation, "ColumnNotBeNull", json!({"column": "note"})),
            "ColumnNotBeNull_note",
            Fail,
        ),
        (
            spec(
                StringValidation,
                "LengthToBeBetween",
                json!({"column": "name", "min_value": 1, "max_value": 5}),
            ),
            "LengthToBeBetween_name",
            Success,
        ),
        (
            spec(
                StringValidation,
                "LengthToBeEqualTo",
                json!({"column": "name", "value": 3}),
            ),
            "LengthToBeEqualTo_name",
            Success,
        ),
        (
            spec(
                StringValidation,
                "LengthToBeGreaterThanOrEqualTo",
                json!({"column": "name", "min_value": 4}),
            ),
            "LengthToBeGreaterThanOrEqualTo_name",
            Fail,
        ),
        (
            spec(
                StringValidation,
                "LengthToBeLessThanOrEqualTo",
                json!({"column": "name", "max_value": 3}),
            ),
            "LengthToBeLessThanOrEqualTo_name",
            Success,
        ),
        (
            spec(
                StringValidation,
                "PatternMatch",
                json!({"column": "name", "pattern": "^[a-z]+$"}),
            ),
            "PatternMatch_name",
            Success,
        ),
        (
            spec(
                StringValidation,
                "NotPatternMatch",
                json!({"column": "name", "pattern": "^b"}),
            ),
            "NotPatternMatch_name",
            Fail,
        ),
        (
            spec(
                TypeValidation,
                "TypeCheck",
                json!({"column": "id", "column_type": "Integer"}),
            ),
            "TypeCheck_id",
            Success,
        ),
        (
            spec(
                UniqueValidation,
                "ColumnUniquePair",
                json!({"column_list": ["id", "name"]}),
            ),
            "ColumnUniquePair_id - name",
            Success,
        ),
        (
            spec(
                UniqueValidation,
                "ColumnUniqueValueCountToBeBetween",
                json!({"column": "name", "min_value": 1, "max_value": 1}),
            ),
            "ColumnUniqueValueCountToBeBetween_name",
            Success,
        ),
        (
            spec(
                UniqueValidation,
                "ColumnUniqueValuesToBeInList",
                json!({"column": "name", "values": ["ann", "bob", "cyd"]}),
            ),
            "ColumnUniqueValuesToBeInList_name",
            Fail,
        ),
        (
            spec(
                ValuesValidation,
                "ColumnValuesToBeBetween",
                json!({"column": "id", "min_value": 0, "max_value": 10}),
            ),
            "ColumnValuesToBeBetween_id",
            Success,
        ),
        (
            spec(
                ValuesValidation,
                "ColumnsSumToBeBetween",
                json!({"columns_list": ["a", "b"], "min_sum_value": 0, "max_sum_value": 10}),
            ),
            "ColumnsSumToBeBetween_a-b-combined",
            Success,
        ),
        (
            spec(
                ValuesValidation,
                "ColumnsSumToBeEqualTo",
                json!({"columns_list": ["a", "b"], "sum_value": 2}),
            ),
            "ColumnsSumToBeEqualTo_a-b-combined",
            Fail,
        ),
        (
            spec(
                ValuesValidation,
                "ColumnsSumToBeGreaterEqualTo",
                json!({"columns_list": ["a", "b"], "min_sum_value": 2}),
            ),
            "ColumnsSumToBeGreaterEqualTo_a-b-combined",
            Success,
        ),
        (
            spec(
                ValuesValidation,
                "ColumnsSumToBeLessEqualTo",
                json!({"columns_list": ["a", "b"], "max_sum_value": 8}),
            ),
            "ColumnsSumToBeLessEqualTo_a-b-combined",
            Success,
        ),
    ]
}

#[test]
fn test_every_builtin_rule_has_a_case() {
    let cases = every_rule();
    let catalogue = RuleCatalogue::global();
    assert_eq!(cases.len(), catalogue.len());
    for descriptor in catalogue.iter() {
        assert!(
            cases
                .iter()
                .any(|(s, _, _)| s.rule == descriptor.name && s.category == descriptor.category),
            "no case for {}",
            descriptor.name
        );
    }
}

#[tokio::test]
async fn test_every_builtin_rule_executes() {
    let cases = every_rule();
    let specs: Vec<RuleSpec> = cases.iter().map(|(s, _, _)| s.clone()).collect();

    let mut session = ValidationSession::new(people()).unwrap();
    session.apply_all(&specs).await.unwrap();
    assert_eq!(session.results().len(), cases.len());

    for (_, key, expected) in &cases {
        let result = session
            .results()
            .get(key)
            .unwrap_or_else(|| panic!("missing result for {key}"));
        assert!(
            !result.message().contains("An error occurred"),
            "{key} errored: {}",
            result.message()
        );
        assert_eq!(result.status(), *expected, "{key}: {}", result.message());
        assert_eq!(result.impact, Impact::Low, "{key}");
    }

    // Built-in rules default to low impact, so nothing escalates.
    assert!(session.evaluate(false).is_ok());
}

#[tokio::test]
async fn test_failing_items_from_catalogue_rules() {
    let mut session = ValidationSession::new(people()).unwrap();
    for (spec, _, _) in every_rule() {
        session.apply(&spec).await.unwrap();
    }

    let report = session.results();
    let items = |key: &str| report.get(key).unwrap().result.failing_items.clone();

    assert_eq!(items("DateToBeBetween_joined"), Some(vec![json!("2024-04-20")]));
    assert_eq!(items("NotPatternMatch_name"), Some(vec![json!("bob")]));
    assert_eq!(items("ColumnUniqueValuesToBeInList_name"), Some(vec![json!("dan")]));
    assert_eq!(
        report
            .get("ColumnNotBeNull_note")
            .unwrap()
            .result
            .failed_number,
        Some(4)
    );
    assert_eq!(
        report
            .get("ColumnsSumToBeEqualTo_a-b-combined")
            .unwrap()
            .result
            .failed_number,
        Some(3)
    );
}

#[tokio::test]
async fn test_impact_and_threshold_flow_through_params() {
    let mut session = ValidationSession::new(people()).unwrap();
    session
        .apply(&spec(
            RuleCategory::NullValidation,
            "ColumnNotBeNull",
            json!({"column": "note", "impact": "HIGH", "threshold": 0.5}),
        ))
        .await
        .unwrap();

    let result = session.results().get("ColumnNotBeNull_note").unwrap();
    assert_eq!(result.impact, Impact::High);
    assert_eq!(result.result.threshold, Some(0.5));
    assert_eq!(result.status(), RuleStatus::Fail);
    assert!(session.evaluate(false).is_err());
}

#[test]
fn test_lookup_errors() {
    let catalogue = RuleCatalogue::global();

    let err = catalogue
        .create(RuleCategory::ValuesValidation, "ColumnNotBeNull", json!({"column": "a"}))
        .unwrap_err();
    assert!(matches!(err, TermError::UnknownRule { .. }));

    let err = catalogue
        .create(RuleCategory::NullValidation, "ColumnBeShiny", json!({}))
        .unwrap_err();
    assert!(matches!(err, TermError::UnknownRule { .. }));

    assert!(catalogue.find("ColumnBeShiny").is_none());
    assert_eq!(
        catalogue.find("TypeCheck").map(|d| d.category),
        Some(RuleCategory::TypeValidation)
    );
}

#[test]
fn test_specs_round_trip_through_json() {
    let specs: Vec<RuleSpec> = every_rule().into_iter().map(|(s, _, _)| s).collect();
    let json = serde_json::to_string(&specs).unwrap();
    let parsed = RuleSpec::from_json_list(&json).unwrap();
    assert_eq!(parsed, specs);
}

#[tokio::test]
async fn test_schema_definition_keeps_declared_column_order() {
    let specs = RuleSpec::from_json_list(
        r#"[{"category": "TypeValidation", "rule": "TypeCheck",
             "params": {"frame_schema_definition":
                 {"zeta": "String", "name": "Integer", "id": "Integer", "alpha": "String"}}}]"#,
    )
    .unwrap();

    let mut session = ValidationSession::new(people()).unwrap();
    session.apply_all(&specs).await.unwrap();

    let result = session
        .results()
        .get("TypeCheck_DataTypeColumnValidation")
        .unwrap();
    assert_eq!(
        result.result.failing_items,
        Some(vec![json!("zeta"), json!("name"), json!("alpha")])
    );
    assert_eq!(result.result.failed_number, Some(3));
    assert_eq!(result.result.frame_row_number, Some(6));
}
