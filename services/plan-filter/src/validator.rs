//! Final checks on a cleaned and completed plan document. Problems are
//! reported, never rejected.

use serde_json::{json, Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::warn;

use shared::dto::{PlanKind, ValidationReport, ValidationStatus};
use shared::error::Warning;

/// Build the report for `doc` and attach `validation_errors` and
/// `filter_metadata` to it.
///
/// `warnings` are findings of earlier stages; they come first in the error
/// list, followed by missing sections and month/year mismatches.
pub fn validate(
    doc: &mut Map<String, Value>,
    kind: PlanKind,
    month: u32,
    year: i32,
    warnings: Vec<Warning>,
    filter_version: &str,
    now: OffsetDateTime,
) -> ValidationReport {
    let mut found = warnings;

    for &field in kind.required_sections() {
        if !doc.contains_key(field) {
            found.push(Warning::Structural(format!("Missing required field: {field}")));
        }
    }

    if let Some(overview) = doc.get("monthly_overview") {
        found.extend(echo_mismatch(overview, "month", "Month", i64::from(month)));
        found.extend(echo_mismatch(overview, "year", "Year", i64::from(year)));
    }

    let errors: Vec<String> = found.iter().map(ToString::to_string).collect();
    let validation_status = if errors.is_empty() {
        ValidationStatus::Passed
    } else {
        warn!(%kind, count = errors.len(), errors = ?errors, "validation errors found");
        ValidationStatus::Warnings
    };
    let filtered_at = now
        .format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string());

    if !errors.is_empty() {
        doc.insert("validation_errors".into(), json!(errors));
    }
    doc.insert(
        "filter_metadata".into(),
        json!({
            "filtered_at": filtered_at,
            "filter_version": filter_version,
            "validation_status": validation_status,
        }),
    );

    ValidationReport {
        errors,
        filtered_at,
        filter_version: filter_version.to_string(),
        validation_status,
    }
}

fn echo_mismatch(overview: &Value, key: &str, field: &'static str, expected: i64) -> Option<Warning> {
    let got = overview.get(key);
    let matches = got
        .and_then(Value::as_f64)
        .is_some_and(|n| n == expected as f64);
    if matches {
        return None;
    }
    let got = match got {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    Some(Warning::SchemaMismatch { field, expected, got })
}
