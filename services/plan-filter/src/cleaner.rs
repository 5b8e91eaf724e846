//! Structural filter: keeps the sections a plan document is made of, rebuilds
//! every day entry field by field with defaults and bounds, and sanitizes all
//! remaining text.

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use shared::dto::PlanKind;
use shared::error::Warning;

use crate::sanitize::{
    number_field, sanitize_tree, text_field, text_list, AVERAGE_DAILY_CALORIES, DAILY_CALORIES,
    DAILY_CARBS, DAILY_FAT, DAILY_FIBER, DAILY_PROTEIN, DURATION, MEAL_CALORIES, REST_DAYS, SETS,
    SNACK_CALORIES, WORKOUT_DAYS,
};

const MEALS: [&str; 3] = ["breakfast", "lunch", "dinner"];

/// Cleaned plan document and the problems found while building it.
#[derive(Debug, Clone)]
pub struct Cleaned {
    pub document: Map<String, Value>,
    pub warnings: Vec<Warning>,
}

pub fn clean_plan(plan: Value, kind: PlanKind) -> Cleaned {
    let mut warnings = Vec::new();
    let mut source = match plan {
        Value::Object(map) => map,
        other => {
            warn!(%kind, found = type_name(&other), "extracted payload is not an object");
            Map::new()
        }
    };

    let mut doc = Map::new();
    for &field in kind.required_sections() {
        match source.remove(field) {
            Some(v) => {
                doc.insert(field.to_string(), v);
            }
            None => {
                warn!(%kind, field, "Missing required field");
                warnings.push(Warning::Structural(format!("Missing required field: {field}")));
                doc.insert(field.to_string(), Value::Object(Map::new()));
            }
        }
    }
    for &field in kind.optional_sections() {
        if let Some(v) = source.remove(field) {
            doc.insert(field.to_string(), v);
        }
    }
    if !source.is_empty() {
        debug!(%kind, dropped = ?source.keys().collect::<Vec<_>>(), "dropping unknown top-level keys");
    }

    let daily_key = kind.daily_key();
    let days = match doc.remove(daily_key) {
        Some(Value::Object(days)) => clean_days(days, kind),
        Some(other) => {
            warn!(%kind, found = type_name(&other), "daily map is not an object");
            warnings.push(Warning::Structural(format!(
                "Invalid {daily_key}: expected an object, got {}",
                type_name(&other)
            )));
            Map::new()
        }
        None => Map::new(),
    };
    doc.insert(daily_key.to_string(), Value::Object(days));

    let mut document = match sanitize_tree(Value::Object(doc)) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Some(Value::Object(overview)) = document.get_mut("monthly_overview") {
        clamp_overview(overview, kind);
    }

    Cleaned { document, warnings }
}

fn clean_days(days: Map<String, Value>, kind: PlanKind) -> Map<String, Value> {
    days.into_iter()
        .filter_map(|(day, entry)| match entry {
            Value::Object(entry) => {
                let cleaned = match kind {
                    PlanKind::Workout => clean_workout_day(&entry),
                    PlanKind::Meal => clean_meal_day(&entry),
                };
                Some((day, cleaned))
            }
            other => {
                debug!(%day, found = type_name(&other), "dropping non-object day entry");
                None
            }
        })
        .collect()
}

fn clean_workout_day(day: &Map<String, Value>) -> Value {
    let exercises: Vec<Value> = objects(day, "exercises").map(clean_exercise).collect();
    json!({
        "day_of_week": text_field(day, "day_of_week", ""),
        "workout_type": text_field(day, "workout_type", "Rest"),
        "duration": number_field(day, "duration", 0, DURATION),
        "intensity": text_field(day, "intensity", "Moderate"),
        "exercises": exercises,
        "warm_up": text_list(day, "warm_up"),
        "cool_down": text_list(day, "cool_down"),
    })
}

fn clean_exercise(ex: &Map<String, Value>) -> Value {
    json!({
        "name": text_field(ex, "name", ""),
        "type": text_field(ex, "type", "strength"),
        "sets": number_field(ex, "sets", 1, SETS),
        "reps": text_field(ex, "reps", "10"),
        "rest_time": text_field(ex, "rest_time", "60"),
        "notes": text_field(ex, "notes", ""),
        "progression": text_field(ex, "progression", ""),
    })
}

fn clean_meal_day(day: &Map<String, Value>) -> Value {
    let mut out = Map::new();
    out.insert("day_of_week".into(), text_field(day, "day_of_week", ""));

    for meal in MEALS {
        match day.get(meal) {
            None => {
                out.insert(meal.into(), clean_meal(&Map::new()));
            }
            Some(Value::Object(m)) => {
                out.insert(meal.into(), clean_meal(m));
            }
            Some(other) => debug!(meal, found = type_name(other), "dropping non-object meal"),
        }
    }

    let snacks: Vec<Value> = objects(day, "snacks").map(clean_snack).collect();
    out.insert("snacks".into(), Value::Array(snacks));

    match day.get("daily_totals") {
        None => {
            out.insert("daily_totals".into(), clean_totals(&Map::new()));
        }
        Some(Value::Object(t)) => {
            out.insert("daily_totals".into(), clean_totals(t));
        }
        Some(other) => debug!(found = type_name(other), "dropping non-object daily_totals"),
    }
    Value::Object(out)
}

fn clean_meal(meal: &Map<String, Value>) -> Value {
    json!({
        "name": text_field(meal, "name", ""),
        "calories": number_field(meal, "calories", 0, MEAL_CALORIES),
        "protein": text_field(meal, "protein", "0g"),
        "carbs": text_field(meal, "carbs", "0g"),
        "fat": text_field(meal, "fat", "0g"),
        "prep_time": text_field(meal, "prep_time", "10"),
        "ingredients": text_list(meal, "ingredients"),
        "instructions": text_list(meal, "instructions"),
        "meal_prep_notes": text_field(meal, "meal_prep_notes", ""),
    })
}

fn clean_snack(snack: &Map<String, Value>) -> Value {
    json!({
        "name": text_field(snack, "name", ""),
        "calories": number_field(snack, "calories", 0, SNACK_CALORIES),
        "ingredients": text_list(snack, "ingredients"),
    })
}

fn clean_totals(totals: &Map<String, Value>) -> Value {
    json!({
        "calories": number_field(totals, "calories", 0, DAILY_CALORIES),
        "protein": number_field(totals, "protein", 0, DAILY_PROTEIN),
        "carbs": number_field(totals, "carbs", 0, DAILY_CARBS),
        "fat": number_field(totals, "fat", 0, DAILY_FAT),
        "fiber": number_field(totals, "fiber", 0, DAILY_FIBER),
    })
}

fn clamp_overview(overview: &mut Map<String, Value>, kind: PlanKind) {
    match kind {
        PlanKind::Workout => {
            let workout_days = number_field(overview, "workout_days", 20, WORKOUT_DAYS);
            let rest_days = number_field(overview, "rest_days", 11, REST_DAYS);
            overview.insert("workout_days".into(), workout_days);
            overview.insert("rest_days".into(), rest_days);
        }
        PlanKind::Meal => {
            let calories = number_field(overview, "average_daily_calories", 2000, AVERAGE_DAILY_CALORIES);
            overview.insert("average_daily_calories".into(), calories);
        }
    }
}

/// Object items of a list field; anything else is skipped.
fn objects<'a>(obj: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Map<String, Value>> {
    obj.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
