//! Integration tests for validation sessions: recording, evaluation and input sources.

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use term_rules::catalogue::RuleSpec;
use term_rules::core::{RuleStatus, ValidationSession};
use term_rules::prelude::*;
use term_rules::rules::{
    ColumnNotBeNull, ColumnUniqueValuesToBeInList, ColumnValuesToBeBetween, PatternMatch,
};

fn table(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let arrays = columns.into_iter().map(|(_, array)| array).collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
}

fn one_to_five() -> RecordBatch {
    table(vec![("A", Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5])))])
}

fn cities() -> RecordBatch {
    let mut values = vec!["Berlin"; 4];
    values.extend(["Rome"; 5]);
    values.push("Paris");
    table(vec![("city", Arc::new(StringArray::from(values)))])
}

#[tokio::test]
async fn test_threshold_decides_between_rule() {
    let mut session = ValidationSession::new(one_to_five()).unwrap();
    session
        .add_validation(
            ColumnValuesToBeBetween::new("A", Some(1.0), Some(2.0), RuleOptions::new()).unwrap(),
        )
        .await;

    let result = session.results().get("ColumnValuesToBeBetween_A").unwrap();
    assert_eq!(result.status(), RuleStatus::Fail);
    assert_eq!(result.result.failed_number, Some(3));
    assert_eq!(result.result.frame_row_number, Some(5));
    assert_eq!(result.result.failed_percentage, Some(0.6));
    assert_eq!(result.result.threshold_pass, Some(false));
    assert_eq!(
        result.result.failing_items,
        Some(vec![json!(3), json!(4), json!(5)])
    );

    let mut lenient = ValidationSession::new(one_to_five()).unwrap();
    lenient
        .add_validation(
            ColumnValuesToBeBetween::new(
                "A",
                Some(1.0),
                Some(2.0),
                RuleOptions::new().with_threshold(0.6),
            )
            .unwrap(),
        )
        .await;

    let result = lenient.results().get("ColumnValuesToBeBetween_A").unwrap();
    assert_eq!(result.status(), RuleStatus::Success);
    assert_eq!(result.result.threshold_pass, Some(true));
    assert_eq!(result.message(), "All items passed the validation.");
}

#[tokio::test]
async fn test_values_in_list_with_thresholds() {
    for (threshold, expected) in [(0.01, RuleStatus::Fail), (0.5, RuleStatus::Success)] {
        let mut session = ValidationSession::new(cities()).unwrap();
        session
            .unique()
            .column_unique_values_to_be_in_list(
                "city",
                vec![json!("Berlin"), json!("Rome")],
                RuleOptions::new().with_threshold(threshold),
            )
            .await
            .unwrap();

        let result = session
            .results()
            .get("ColumnUniqueValuesToBeInList_city")
            .unwrap();
        assert_eq!(result.status(), expected, "threshold {threshold}");
        assert_eq!(result.result.failing_items, Some(vec![json!("Paris")]));
        assert_eq!(result.result.failed_number, Some(1));
        assert_eq!(result.result.frame_row_number, Some(10));
    }
}

#[tokio::test]
async fn test_same_rule_twice_keeps_one_entry() {
    let mut session = ValidationSession::new(one_to_five()).unwrap();
    for _ in 0..2 {
        session
            .add_validation(ColumnNotBeNull::new("A", RuleOptions::new()).unwrap())
            .await;
    }

    let report = session.results();
    assert_eq!(report.len(), 1);
    assert_eq!(
        report.summary().validations(),
        &["ColumnNotBeNull_A".to_string(), "ColumnNotBeNull_A".to_string()]
    );
    assert_eq!(report.summary().passed(), Some(true));
}

#[tokio::test]
async fn test_failure_is_sticky_in_summary() {
    let mut session = ValidationSession::new(one_to_five()).unwrap();
    session
        .add_validation(
            ColumnValuesToBeBetween::new("A", None, Some(3.0), RuleOptions::new()).unwrap(),
        )
        .await
        .add_validation(ColumnNotBeNull::new("A", RuleOptions::new()).unwrap())
        .await;

    let summary = session.results().summary();
    assert_eq!(summary.passed(), Some(false));
    assert_eq!(summary.failed_validations(), &["ColumnValuesToBeBetween_A".to_string()]);
}

#[test]
fn test_evaluate_empty_session() {
    let session = ValidationSession::new(one_to_five()).unwrap();
    let err = session.evaluate(false).unwrap_err();
    assert!(matches!(err, TermError::EmptyValidationSet));
    assert_eq!(err.to_string(), "No validation checks were added.");
}

#[tokio::test]
async fn test_evaluate_only_escalates_high_impact() {
    let mut session = ValidationSession::new(one_to_five()).unwrap();
    session
        .add_validation(
            ColumnValuesToBeBetween::new(
                "A",
                Some(10.0),
                None,
                RuleOptions::new().with_impact(Impact::Low),
            )
            .unwrap(),
        )
        .await
        .add_validation(
            ColumnValuesToBeBetween::new(
                "A",
                None,
                Some(0.0),
                RuleOptions::new().with_impact(Impact::Medium),
            )
            .unwrap(),
        )
        .await;
    assert!(session.evaluate(false).is_ok());

    session
        .add_validation(
            PatternMatch::new("A", "^9$", RuleOptions::new().with_impact(Impact::High)).unwrap(),
        )
        .await;
    let err = session.evaluate(false).unwrap_err();
    assert_eq!(err.failed_validations(), Some(&["PatternMatch_A".to_string()][..]));
    assert_eq!(err.to_string(), "FAILED VALIDATION(S): [PatternMatch_A]");
}

#[tokio::test]
async fn test_apply_specs_from_json() {
    let specs = RuleSpec::from_json_list(
        r#"[
            {"category": "ValuesValidation", "rule": "ColumnValuesToBeBetween",
             "params": {"column": "A", "min_value": 1, "max_value": 2, "threshold": 0.6}},
            {"category": "NullValidation", "rule": "ColumnNotBeNull",
             "params": {"column": "A", "impact": "high"}}
        ]"#,
    )
    .unwrap();

    let mut session = ValidationSession::new(one_to_five()).unwrap();
    session.apply_all(&specs).await.unwrap();

    let names: Vec<_> = session.results().names().collect();
    assert_eq!(names, ["ColumnValuesToBeBetween_A", "ColumnNotBeNull_A"]);
    assert_eq!(
        session.results().get("ColumnNotBeNull_A").unwrap().impact,
        Impact::High
    );
    assert!(session.evaluate(false).is_ok());
}

#[tokio::test]
async fn test_apply_unknown_rule_is_recorded_as_unsupported() {
    let mut session = ValidationSession::new(one_to_five()).unwrap();
    let spec = RuleSpec::new(RuleCategory::NullValidation, "ColumnBeFancy", json!({}));
    session.apply(&spec).await.unwrap();

    let result = session.results().get("ColumnBeFancy").unwrap();
    assert_eq!(result.status(), RuleStatus::Fail);
    assert_eq!(result.impact, Impact::High);
    assert_eq!(result.target_identifier, "N/A");
    assert!(session.evaluate(false).is_err());
}

#[tokio::test]
async fn test_apply_invalid_params_is_an_error() {
    let mut session = ValidationSession::new(one_to_five()).unwrap();
    let spec = RuleSpec::new(
        RuleCategory::ValuesValidation,
        "ColumnValuesToBeBetween",
        json!({"column": "A"}),
    );
    let err = session.apply(&spec).await.unwrap_err();
    assert!(err.is_configuration());
    assert!(session.results().is_empty());
}

#[tokio::test]
async fn test_session_from_context() {
    let ctx = SessionContext::new();
    ctx.register_batch("events", cities()).unwrap();
    let mut session = ValidationSession::from_context(ctx, "events").unwrap();
    session
        .add_validation(
            ColumnUniqueValuesToBeInList::new(
                "city",
                vec![json!("Berlin"), json!("Rome"), json!("Paris")],
                RuleOptions::new(),
            )
            .unwrap(),
        )
        .await;

    let result = session
        .results()
        .get("ColumnUniqueValuesToBeInList_city")
        .unwrap();
    assert_eq!(result.status(), RuleStatus::Success);
    assert_eq!(result.result.frame_row_number, Some(10));
}

#[tokio::test]
async fn test_session_from_csv() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "id,score").unwrap();
    writeln!(file, "1,10").unwrap();
    writeln!(file, "2,20").unwrap();
    writeln!(file, "3,300").unwrap();
    file.flush().unwrap();

    let mut session = ValidationSession::from_csv(file.path(), ValidationSessionConfig::small())
        .await
        .unwrap();
    session
        .values()
        .column_values_to_be_between("score", Some(0.0), Some(100.0), RuleOptions::new())
        .await
        .unwrap();

    let result = session
        .results()
        .get("ColumnValuesToBeBetween_score")
        .unwrap();
    assert_eq!(result.status(), RuleStatus::Fail);
    assert_eq!(result.result.failing_items, Some(vec![json!(300)]));
    assert_eq!(result.result.frame_row_number, Some(3));
}

#[tokio::test]
async fn test_empty_table_passes() {
    let schema = one_to_five().schema();
    let empty = RecordBatch::new_empty(schema);
    let mut session = ValidationSession::new(empty).unwrap();
    session
        .add_validation(
            ColumnValuesToBeBetween::new("A", Some(1.0), Some(2.0), RuleOptions::new()).unwrap(),
        )
        .await;

    let result = session.results().get("ColumnValuesToBeBetween_A").unwrap();
    assert_eq!(result.status(), RuleStatus::Success);
    assert_eq!(result.result.frame_row_number, Some(0));
    assert_eq!(result.result.failed_percentage, Some(0.0));
}
