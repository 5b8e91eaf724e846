//! Unwrapping of the plan document from the envelopes the generation service
//! puts around it.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use shared::dto::PlanKind;

/// Shape of a parsed model response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    /// `{"success": <truthy>, "<kind>_plan": {...}}`
    Wrapped,
    /// The plan itself, recognised by its daily map.
    Direct,
    /// A failed call carrying the raw model output, already decoded.
    RawResult(Value),
    /// `{"success": <falsy>, "<kind>_plan": {...}}`
    UnsuccessfulWrapped,
    Unknown,
}

/// Loose truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are falsy.
fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

pub fn classify(value: &Value, kind: PlanKind) -> ResponseShape {
    let Some(obj) = value.as_object() else {
        return ResponseShape::Unknown;
    };
    let success = obj.get("success");
    let has_plan = obj.contains_key(kind.plan_key());

    if success.is_some_and(truthy) && has_plan {
        return ResponseShape::Wrapped;
    }
    if obj.contains_key(kind.daily_key()) {
        return ResponseShape::Direct;
    }

    let failed = success.is_some_and(|s| !truthy(s));
    if failed {
        if let Some(raw) = obj.get("raw_result") {
            match raw {
                Value::String(s) => match serde_json::from_str::<Value>(s) {
                    Ok(parsed) => return ResponseShape::RawResult(parsed),
                    Err(e) => debug!(error = %e, "raw_result is not valid JSON"),
                },
                other => return ResponseShape::RawResult(other.clone()),
            }
        }
        if has_plan {
            return ResponseShape::UnsuccessfulWrapped;
        }
    }
    ResponseShape::Unknown
}

/// Return the plan document inside `value`, or `value` itself when no known
/// envelope matches. Never fails.
pub fn extract_plan(value: Value, kind: PlanKind) -> Value {
    let shape = classify(&value, kind);
    debug!(?shape, %kind, "classified response");
    match shape {
        ResponseShape::Wrapped => take_key(value, kind.plan_key()),
        ResponseShape::UnsuccessfulWrapped => {
            warn!(%kind, "using plan from a response marked unsuccessful");
            take_key(value, kind.plan_key())
        }
        ResponseShape::RawResult(inner) => inner,
        ResponseShape::Direct | ResponseShape::Unknown => value,
    }
}

fn take_key(value: Value, key: &str) -> Value {
    match value {
        Value::Object(mut map) => map.remove(key).unwrap_or(Value::Object(Map::new())),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wrapped_plan_takes_precedence_over_top_level_daily_map() {
        let v = json!({
            "success": true,
            "workout_plan": {"daily_workouts": {}},
            "daily_workouts": {"1": {"workout_type": "Run"}}
        });
        assert_eq!(classify(&v, PlanKind::Workout), ResponseShape::Wrapped);
        assert_eq!(
            extract_plan(v, PlanKind::Workout),
            json!({"daily_workouts": {}})
        );
    }

    #[test]
    fn direct_plan() {
        let v = json!({"daily_meals": {"1": {}}});
        assert_eq!(classify(&v, PlanKind::Meal), ResponseShape::Direct);
        assert_eq!(extract_plan(v.clone(), PlanKind::Meal), v);
    }

    #[test]
    fn kind_decides_the_keys() {
        let v = json!({"success": true, "meal_plan": {"daily_meals": {}}});
        assert_eq!(classify(&v, PlanKind::Workout), ResponseShape::Unknown);
        assert_eq!(classify(&v, PlanKind::Meal), ResponseShape::Wrapped);
    }

    #[test]
    fn raw_result_string_is_decoded() {
        let v = json!({"success": false, "raw_result": "{\"daily_meals\": {\"2\": {}}}"});
        assert_eq!(
            extract_plan(v, PlanKind::Meal),
            json!({"daily_meals": {"2": {}}})
        );
    }

    #[test]
    fn raw_result_non_string_is_returned_as_is() {
        let v = json!({"success": 0, "raw_result": {"monthly_overview": {}}});
        assert_eq!(
            extract_plan(v, PlanKind::Workout),
            json!({"monthly_overview": {}})
        );
    }

    #[test]
    fn undecodable_raw_result_falls_through() {
        let v = json!({
            "success": false,
            "raw_result": "not json",
            "workout_plan": {"monthly_overview": {"month": 3}}
        });
        assert_eq!(classify(&v, PlanKind::Workout), ResponseShape::UnsuccessfulWrapped);
        assert_eq!(
            extract_plan(v, PlanKind::Workout),
            json!({"monthly_overview": {"month": 3}})
        );

        let v = json!({"success": "", "raw_result": "nope"});
        assert_eq!(classify(&v, PlanKind::Workout), ResponseShape::Unknown);
    }

    #[test]
    fn success_must_be_present_for_the_failure_cases() {
        let v = json!({"raw_result": "{}", "workout_plan": {}});
        assert_eq!(classify(&v, PlanKind::Workout), ResponseShape::Unknown);
        assert_eq!(extract_plan(v.clone(), PlanKind::Workout), v);
    }

    #[test]
    fn non_objects_are_unknown() {
        assert_eq!(classify(&json!([1, 2]), PlanKind::Meal), ResponseShape::Unknown);
        assert_eq!(extract_plan(json!("text"), PlanKind::Meal), json!("text"));
    }
}
